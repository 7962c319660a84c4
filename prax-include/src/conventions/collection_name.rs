use std::fmt;
use std::str::FromStr;

use convert_case::{Case, Casing};

use crate::entity::EntitySchema;
use crate::error::IncludeError;
use crate::inflection;

/// Maps an entity type to its collection name.
pub trait CollectionNameConvention: Send + Sync {
    /// Collection name for `schema`.
    fn collection_name(&self, schema: &EntitySchema) -> String;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "custom"
    }
}

/// Built-in collection naming conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectionNaming {
    /// `CategoryPerson` -> `categoryPeople`.
    #[default]
    PluralCamelCase,
    /// `CategoryPerson` -> `categorypeople`.
    PluralLowerCase,
    /// `CategoryPerson` -> `categoryPerson`.
    SingularCamelCase,
    /// `CategoryPerson` -> `categoryperson`.
    SingularLowerCase,
}

impl CollectionNaming {
    /// All built-in variants.
    pub const ALL: [CollectionNaming; 4] = [
        Self::PluralCamelCase,
        Self::PluralLowerCase,
        Self::SingularCamelCase,
        Self::SingularLowerCase,
    ];

    /// Configuration name of this variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PluralCamelCase => "plural_camel_case",
            Self::PluralLowerCase => "plural_lower_case",
            Self::SingularCamelCase => "singular_camel_case",
            Self::SingularLowerCase => "singular_lower_case",
        }
    }
}

impl CollectionNameConvention for CollectionNaming {
    fn collection_name(&self, schema: &EntitySchema) -> String {
        let name = schema.name();
        match self {
            Self::PluralCamelCase => inflection::pluralize(name).to_case(Case::Camel),
            Self::PluralLowerCase => inflection::pluralize(name).to_lowercase(),
            Self::SingularCamelCase => name.to_case(Case::Camel),
            Self::SingularLowerCase => name.to_lowercase(),
        }
    }

    fn name(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for CollectionNaming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionNaming {
    type Err = IncludeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "plural_camel_case" | "pluralcamelcase" => Ok(Self::PluralCamelCase),
            "plural_lower_case" | "plurallowercase" => Ok(Self::PluralLowerCase),
            "singular_camel_case" | "singularcamelcase" => Ok(Self::SingularCamelCase),
            "singular_lower_case" | "singularlowercase" => Ok(Self::SingularLowerCase),
            _ => Err(IncludeError::config(format!(
                "unknown collection name convention '{}'",
                s
            ))),
        }
    }
}
