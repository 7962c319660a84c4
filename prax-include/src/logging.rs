//! Logging setup.
//!
//! The crate logs through `tracing`: member resolutions and include plans at
//! `debug`, pipeline synchronisation at `trace`, client creation at `info`.
//! Nothing is printed unless a subscriber is installed, either by the host
//! application or by [`init`] when the `tracing-subscriber` feature is on.
//!
//! # Environment Variables
//!
//! - `PRAX_INCLUDE_DEBUG=true|1|yes` - Enable debug logging
//! - `PRAX_INCLUDE_LOG_LEVEL=trace|debug|info|warn|error` - Set the level
//! - `PRAX_INCLUDE_LOG_FORMAT=json|pretty|compact` - Output format (default: json)
//!
//! ```rust,no_run
//! prax_include::logging::init();
//! ```

use std::env;
use std::sync::Once;

/// Enables debug logging when truthy.
pub const DEBUG_ENV: &str = "PRAX_INCLUDE_DEBUG";

/// Overrides the log level.
pub const LOG_LEVEL_ENV: &str = "PRAX_INCLUDE_LOG_LEVEL";

/// Selects the output format.
pub const LOG_FORMAT_ENV: &str = "PRAX_INCLUDE_LOG_FORMAT";

static INIT: Once = Once::new();

fn is_truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

fn parse_level(level: Option<&str>, debug: bool) -> &'static str {
    match level.map(str::to_lowercase).as_deref() {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("info") => "info",
        Some("warn") => "warn",
        Some("error") => "error",
        _ if debug => "debug",
        _ => "warn",
    }
}

fn parse_format(format: Option<&str>) -> &'static str {
    match format.map(str::to_lowercase).as_deref() {
        Some("pretty") => "pretty",
        Some("compact") => "compact",
        _ => "json",
    }
}

/// Check if `PRAX_INCLUDE_DEBUG` enables debug logging.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var(DEBUG_ENV).map(|v| is_truthy(&v)).unwrap_or(false)
}

/// The configured log level; `debug` when debugging is enabled, `warn` otherwise.
pub fn get_log_level() -> &'static str {
    parse_level(env::var(LOG_LEVEL_ENV).ok().as_deref(), is_debug_enabled())
}

/// The configured log format.
pub fn get_log_format() -> &'static str {
    parse_format(env::var(LOG_FORMAT_ENV).ok().as_deref())
}

/// Install a subscriber for this crate's spans and events.
///
/// Only the first call has an effect, and only when debugging or a level was
/// requested through the environment.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var(LOG_LEVEL_ENV).is_err() {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = get_log_level();
            let filter = EnvFilter::try_new(format!("prax_include={}", level))
                .unwrap_or_else(|_| EnvFilter::new("warn"));

            let installed = match get_log_format() {
                "json" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().json())
                    .try_init(),
                "compact" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().compact())
                    .try_init(),
                _ => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().pretty())
                    .try_init(),
            };

            if installed.is_ok() {
                tracing::info!(
                    level = level,
                    format = get_log_format(),
                    "prax-include logging initialized"
                );
            }
        }
    });
}
