//! Shared resolution state.
//!
//! An [`IncludeContext`] owns the conventions in effect, the resolution
//! caches and the stage extractor. Queryables hold an `Arc` to the context
//! they were created with. The process-wide default is
//! [`IncludeContext::global`], initialized from the environment on first use;
//! tests and multi-tenant applications create their own.

use std::fmt;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::cache::ResolutionCaches;
use crate::config::{ExtractorKind, IncludeConfig};
use crate::conventions::{CollectionNameConvention, Conventions, ForeignKeyNameConvention};
use crate::extractor::{CommandExtractor, StageExtractor, StructuredExtractor};

static GLOBAL: LazyLock<Arc<IncludeContext>> = LazyLock::new(|| {
    let config = IncludeConfig::from_env().unwrap_or_else(|e| {
        warn!(error = %e, "ignoring invalid include configuration from environment");
        IncludeConfig::default()
    });
    Arc::new(IncludeContext::new(config))
});

/// Conventions, caches and extractor shared by queryables.
pub struct IncludeContext {
    conventions: RwLock<Conventions>,
    caches: ResolutionCaches,
    extractor: Arc<dyn StageExtractor>,
}

impl IncludeContext {
    /// Create a context from configuration.
    pub fn new(config: IncludeConfig) -> Self {
        let extractor: Arc<dyn StageExtractor> = match config.extractor {
            ExtractorKind::Command => Arc::new(CommandExtractor),
            ExtractorKind::Structured => Arc::new(StructuredExtractor),
        };
        Self::with_extractor(
            Conventions::new(config.collection_naming, config.foreign_key_naming),
            extractor,
        )
    }

    /// Create a context with explicit conventions and extractor.
    pub fn with_extractor(conventions: Conventions, extractor: Arc<dyn StageExtractor>) -> Self {
        debug!(
            collection_naming = conventions.collection_name.name(),
            foreign_key_naming = conventions.foreign_key.name(),
            extractor = extractor.name(),
            "include context created"
        );
        Self {
            conventions: RwLock::new(conventions),
            caches: ResolutionCaches::default(),
            extractor,
        }
    }

    /// The process-wide context.
    pub fn global() -> Arc<IncludeContext> {
        Arc::clone(&GLOBAL)
    }

    /// Snapshot of the conventions in effect.
    pub fn conventions(&self) -> Conventions {
        self.conventions.read().clone()
    }

    /// The collection name convention in effect.
    pub fn collection_name_convention(&self) -> Arc<dyn CollectionNameConvention> {
        Arc::clone(&self.conventions.read().collection_name)
    }

    /// The foreign key convention in effect.
    pub fn foreign_key_convention(&self) -> Arc<dyn ForeignKeyNameConvention> {
        Arc::clone(&self.conventions.read().foreign_key)
    }

    /// Replace the collection name convention.
    ///
    /// Names already resolved through this context keep their old value.
    pub fn set_collection_name_convention<C>(&self, convention: C)
    where
        C: CollectionNameConvention + 'static,
    {
        debug!(convention = convention.name(), "collection name convention changed");
        self.conventions.write().collection_name = Arc::new(convention);
    }

    /// Replace the foreign key convention.
    ///
    /// Navigations already resolved through this context keep their old result.
    pub fn set_foreign_key_convention<C>(&self, convention: C)
    where
        C: ForeignKeyNameConvention + 'static,
    {
        debug!(convention = convention.name(), "foreign key convention changed");
        self.conventions.write().foreign_key = Arc::new(convention);
    }

    /// The resolution caches.
    pub fn caches(&self) -> &ResolutionCaches {
        &self.caches
    }

    /// The stage extractor.
    pub fn extractor(&self) -> &Arc<dyn StageExtractor> {
        &self.extractor
    }
}

impl Default for IncludeContext {
    fn default() -> Self {
        Self::new(IncludeConfig::default())
    }
}

impl fmt::Debug for IncludeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncludeContext")
            .field("conventions", &*self.conventions.read())
            .field("extractor", &self.extractor.name())
            .finish()
    }
}

/// Replace the process-wide collection name convention.
pub fn set_default_collection_name_convention<C>(convention: C)
where
    C: CollectionNameConvention + 'static,
{
    IncludeContext::global().set_collection_name_convention(convention);
}

/// The process-wide collection name convention.
pub fn default_collection_name_convention() -> Arc<dyn CollectionNameConvention> {
    IncludeContext::global().collection_name_convention()
}

/// Replace the process-wide foreign key convention.
pub fn set_default_foreign_key_convention<C>(convention: C)
where
    C: ForeignKeyNameConvention + 'static,
{
    IncludeContext::global().set_foreign_key_convention(convention);
}

/// The process-wide foreign key convention.
pub fn default_foreign_key_convention() -> Arc<dyn ForeignKeyNameConvention> {
    IncludeContext::global().foreign_key_convention()
}
