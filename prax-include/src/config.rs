//! Include and connection configuration.

use mongodb::options::ClientOptions;

use crate::conventions::{CollectionNaming, ForeignKeyNaming};
use crate::error::{IncludeError, IncludeResult};

/// Environment variable selecting the default collection name convention.
pub const COLLECTION_CONVENTION_ENV: &str = "PRAX_INCLUDE_COLLECTION_CONVENTION";

/// Environment variable selecting the default foreign key convention.
pub const FOREIGN_KEY_CONVENTION_ENV: &str = "PRAX_INCLUDE_FOREIGN_KEY_CONVENTION";

/// Which stage extractor a context uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractorKind {
    /// Render the driver-facing plan text and parse its stages back.
    #[default]
    Command,
    /// Translate the query expression directly.
    Structured,
}

/// Configuration of an include context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeConfig {
    /// Collection naming used when a type has no explicit table name.
    pub collection_naming: CollectionNaming,
    /// Foreign key naming used when a navigation carries no annotation.
    pub foreign_key_naming: ForeignKeyNaming,
    /// Stage extractor.
    pub extractor: ExtractorKind,
}

impl IncludeConfig {
    /// Create a builder for configuration.
    pub fn builder() -> IncludeConfigBuilder {
        IncludeConfigBuilder::new()
    }

    /// Read the conventions from the environment, falling back to defaults.
    pub fn from_env() -> IncludeResult<Self> {
        let mut config = Self::default();

        if let Ok(value) = std::env::var(COLLECTION_CONVENTION_ENV) {
            config.collection_naming = value.parse()?;
        }

        if let Ok(value) = std::env::var(FOREIGN_KEY_CONVENTION_ENV) {
            config.foreign_key_naming = value.parse()?;
        }

        Ok(config)
    }
}

/// Builder for [`IncludeConfig`].
#[derive(Debug, Default)]
pub struct IncludeConfigBuilder {
    collection_naming: Option<CollectionNaming>,
    foreign_key_naming: Option<ForeignKeyNaming>,
    extractor: Option<ExtractorKind>,
}

impl IncludeConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the collection naming convention.
    pub fn collection_naming(mut self, naming: CollectionNaming) -> Self {
        self.collection_naming = Some(naming);
        self
    }

    /// Set the foreign key naming convention.
    pub fn foreign_key_naming(mut self, naming: ForeignKeyNaming) -> Self {
        self.foreign_key_naming = Some(naming);
        self
    }

    /// Set the stage extractor.
    pub fn extractor(mut self, extractor: ExtractorKind) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> IncludeConfig {
        IncludeConfig {
            collection_naming: self.collection_naming.unwrap_or_default(),
            foreign_key_naming: self.foreign_key_naming.unwrap_or_default(),
            extractor: self.extractor.unwrap_or_default(),
        }
    }
}

/// Connection settings read by [`MongoClient`](crate::MongoClient).
///
/// Anything else the driver supports can still be passed in the URI query
/// string; these fields override what the URI says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MongoConfig {
    /// Connection URI.
    pub uri: String,
    /// Database holding the entity collections.
    pub database: String,
    /// Name reported to the server.
    pub app_name: Option<String>,
    /// Upper bound of the driver's connection pool.
    pub max_pool_size: Option<u32>,
    /// Talk to the given host only, skipping topology discovery.
    pub direct_connection: Option<bool>,
}

impl MongoConfig {
    /// Settings for `database` on the server at `uri`.
    pub fn from_uri(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            app_name: Some(DEFAULT_APP_NAME.to_string()),
            max_pool_size: None,
            direct_connection: None,
        }
    }

    /// Create a builder for connection settings.
    pub fn builder() -> MongoConfigBuilder {
        MongoConfigBuilder::default()
    }

    /// Parse the URI and apply the explicit overrides.
    pub async fn to_client_options(&self) -> IncludeResult<ClientOptions> {
        let mut options = ClientOptions::parse(&self.uri)
            .await
            .map_err(|e| IncludeError::config(format!("invalid uri '{}': {}", self.uri, e)))?;

        if self.app_name.is_some() {
            options.app_name.clone_from(&self.app_name);
        }
        if self.max_pool_size.is_some() {
            options.max_pool_size = self.max_pool_size;
        }
        if self.direct_connection.is_some() {
            options.direct_connection = self.direct_connection;
        }

        Ok(options)
    }
}

const DEFAULT_URI: &str = "mongodb://localhost:27017";
const DEFAULT_APP_NAME: &str = "prax-include";

/// Builder for [`MongoConfig`].
#[derive(Debug, Default)]
pub struct MongoConfigBuilder {
    uri: Option<String>,
    database: Option<String>,
    app_name: Option<String>,
    max_pool_size: Option<u32>,
    direct_connection: Option<bool>,
}

impl MongoConfigBuilder {
    /// Server URI; defaults to a local server.
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Database name. Required.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Name reported to the server.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Upper bound of the connection pool.
    pub fn max_pool_size(mut self, size: u32) -> Self {
        self.max_pool_size = Some(size);
        self
    }

    /// Skip topology discovery.
    pub fn direct_connection(mut self, enabled: bool) -> Self {
        self.direct_connection = Some(enabled);
        self
    }

    /// Build the settings, failing when no database was named.
    pub fn build(self) -> IncludeResult<MongoConfig> {
        let database = self
            .database
            .filter(|name| !name.is_empty())
            .ok_or_else(|| IncludeError::config("database name is required"))?;

        let uri = self.uri.unwrap_or_else(|| DEFAULT_URI.to_string());
        let mut config = MongoConfig::from_uri(uri, database);
        if self.app_name.is_some() {
            config.app_name = self.app_name;
        }
        config.max_pool_size = self.max_pool_size;
        config.direct_connection = self.direct_connection;
        Ok(config)
    }
}
