//! Naming conventions used when nothing is annotated.
//!
//! Two families are pluggable:
//!
//! - [`CollectionNameConvention`] maps an entity type to the name of the
//!   collection its documents live in.
//! - [`ForeignKeyNameConvention`] maps a navigation member to the name of the
//!   sibling member expected to hold its foreign key.
//!
//! Both ship with a closed set of built-in variants ([`CollectionNaming`],
//! [`ForeignKeyNaming`]) that parse from strings for configuration.

mod collection_name;
mod foreign_key;

use std::fmt;
use std::sync::Arc;

pub use collection_name::{CollectionNameConvention, CollectionNaming};
pub use foreign_key::{ForeignKeyNameConvention, ForeignKeyNaming};

/// The conventions currently in effect for a context.
#[derive(Clone)]
pub struct Conventions {
    /// Collection naming.
    pub collection_name: Arc<dyn CollectionNameConvention>,
    /// Foreign key naming.
    pub foreign_key: Arc<dyn ForeignKeyNameConvention>,
}

impl Conventions {
    /// Build from the built-in variants.
    pub fn new(collection_name: CollectionNaming, foreign_key: ForeignKeyNaming) -> Self {
        Self {
            collection_name: Arc::new(collection_name),
            foreign_key: Arc::new(foreign_key),
        }
    }
}

impl Default for Conventions {
    fn default() -> Self {
        Self::new(CollectionNaming::default(), ForeignKeyNaming::default())
    }
}

impl fmt::Debug for Conventions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conventions")
            .field("collection_name", &self.collection_name.name())
            .field("foreign_key", &self.foreign_key.name())
            .finish()
    }
}
