use std::fmt;
use std::str::FromStr;

use crate::entity::Member;
use crate::error::{IncludeError, IncludeResult};
use crate::inflection;
use crate::mapping;

/// Maps a navigation member to the expected name of its foreign key member.
pub trait ForeignKeyNameConvention: Send + Sync {
    /// Foreign key member name for `navigation`.
    fn foreign_key_name(&self, navigation: &Member) -> IncludeResult<String>;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "custom"
    }
}

/// Built-in foreign key naming conventions.
///
/// Shown for a navigation `Writer: Author` where `Author` is identified by
/// `AuthorId`. Collection navigations singularize the navigation part and
/// pluralize the identifier part, so `Writers: Vec<Author>` yields
/// `WriterAuthorIds` under [`ForeignKeyNaming::NavigationNameIdName`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForeignKeyNaming {
    /// `WriterAuthorId`.
    NavigationNameIdName,
    /// `Writer_AuthorId`.
    #[default]
    NavigationNameUnderscoreIdName,
    /// `AuthorAuthorId`.
    NavigationTypeIdName,
    /// `Author_AuthorId`.
    NavigationTypeUnderscoreIdName,
}

impl ForeignKeyNaming {
    /// All built-in variants.
    pub const ALL: [ForeignKeyNaming; 4] = [
        Self::NavigationNameIdName,
        Self::NavigationNameUnderscoreIdName,
        Self::NavigationTypeIdName,
        Self::NavigationTypeUnderscoreIdName,
    ];

    /// Configuration name of this variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NavigationNameIdName => "navigation_name_id_name",
            Self::NavigationNameUnderscoreIdName => "navigation_name_underscore_id_name",
            Self::NavigationTypeIdName => "navigation_type_id_name",
            Self::NavigationTypeUnderscoreIdName => "navigation_type_underscore_id_name",
        }
    }

    fn uses_type_name(&self) -> bool {
        matches!(
            self,
            Self::NavigationTypeIdName | Self::NavigationTypeUnderscoreIdName
        )
    }

    fn separator(&self) -> &'static str {
        match self {
            Self::NavigationNameUnderscoreIdName | Self::NavigationTypeUnderscoreIdName => "_",
            Self::NavigationNameIdName | Self::NavigationTypeIdName => "",
        }
    }
}

impl ForeignKeyNameConvention for ForeignKeyNaming {
    fn foreign_key_name(&self, navigation: &Member) -> IncludeResult<String> {
        let related = navigation.related_schema()?;
        let id_name = mapping::id_member_name(related)?;
        let token = if self.uses_type_name() {
            related.name()
        } else {
            navigation.name()
        };

        if navigation.value_type().is_collection() {
            Ok(format!(
                "{}{}{}",
                inflection::singularize(token),
                self.separator(),
                inflection::pluralize(id_name)
            ))
        } else {
            Ok(format!("{}{}{}", token, self.separator(), id_name))
        }
    }

    fn name(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ForeignKeyNaming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ForeignKeyNaming {
    type Err = IncludeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "navigation_name_id_name" | "navigationnameidname" => Ok(Self::NavigationNameIdName),
            "navigation_name_underscore_id_name" | "navigationnameunderscoreidname" => {
                Ok(Self::NavigationNameUnderscoreIdName)
            }
            "navigation_type_id_name" | "navigationtypeidname" => Ok(Self::NavigationTypeIdName),
            "navigation_type_underscore_id_name" | "navigationtypeunderscoreidname" => {
                Ok(Self::NavigationTypeUnderscoreIdName)
            }
            _ => Err(IncludeError::config(format!(
                "unknown foreign key convention '{}'",
                s
            ))),
        }
    }
}
