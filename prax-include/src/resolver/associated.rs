use tracing::debug;

use crate::context::IncludeContext;
use crate::entity::Member;
use crate::error::{IncludeError, IncludeResult};

use super::{properties_and_fields, property_or_field};

impl IncludeContext {
    /// The member that stores the key of a navigation.
    ///
    /// The associated member lives either on the navigation's declaring type
    /// (the declaring side holds the key) or on the related type (the related
    /// side holds a key pointing back). Candidates are tried in order:
    ///
    /// 1. a navigation annotated with both `foreign_key` and
    ///    `inverse_property` is rejected;
    /// 2. the member named by its `foreign_key` annotation, on the declaring type;
    /// 3. the member named by its `inverse_property` annotation, on the related type;
    /// 4. the single declaring-type member whose `foreign_key` annotation names the navigation;
    /// 5. the single related-type member whose `inverse_property` annotation names the navigation;
    /// 6. the declaring-type member named by the foreign key convention.
    ///
    /// Successful resolutions are cached; failures are recomputed on every call.
    pub fn associated_member(&self, navigation: &Member) -> IncludeResult<Member> {
        navigation.ensure_field_or_property()?;
        navigation.ensure_custom_type()?;

        self.caches()
            .associated_members
            .get_or_try_insert_with(navigation.key(), || {
                let member = self.resolve_associated_member(navigation)?;
                debug!(navigation = %navigation, associated = %member, "resolved associated member");
                Ok(member)
            })
    }

    fn resolve_associated_member(&self, navigation: &Member) -> IncludeResult<Member> {
        if let Some(member) = find_by_annotation(navigation)? {
            return Ok(member);
        }
        if let Some(member) = find_foreign_key_member(navigation)? {
            return Ok(member);
        }
        if let Some(member) = find_inverse_property_member(navigation)? {
            return Ok(member);
        }
        if let Some(member) = self.foreign_key(navigation)? {
            return Ok(member);
        }

        Err(IncludeError::foreign_key_mismatch(format!(
            "No property or field refers to '{}' as their foreign key.",
            navigation
        )))
    }
}

fn find_by_annotation(navigation: &Member) -> IncludeResult<Option<Member>> {
    let info = navigation.info();
    let declaring = navigation.declaring_type();

    match (info.foreign_key_target(), info.inverse_property_target()) {
        (Some(_), Some(_)) => Err(IncludeError::foreign_key_mismatch(format!(
            "'{}' has both [ForeignKey] and [InverseProperty].",
            navigation
        ))),
        (Some(foreign_key), None) => property_or_field(declaring, foreign_key)
            .map(Some)
            .ok_or_else(|| {
                IncludeError::foreign_key_mismatch(format!(
                    "Foreign key '{}.{}' does not exist.",
                    declaring.name(),
                    foreign_key
                ))
            }),
        (None, Some(inverse)) => {
            let related = navigation.related_schema()?;
            property_or_field(related, inverse).map(Some).ok_or_else(|| {
                IncludeError::foreign_key_mismatch(format!(
                    "Inverse property '{}.{}' does not exist.",
                    related.name(),
                    inverse
                ))
            })
        }
        (None, None) => Ok(None),
    }
}

fn find_foreign_key_member(navigation: &Member) -> IncludeResult<Option<Member>> {
    let mut candidates = properties_and_fields(navigation.declaring_type())
        .filter(|member| member.info().foreign_key_target() == Some(navigation.name()));

    match (candidates.next(), candidates.next()) {
        (Some(_), Some(_)) => Err(IncludeError::foreign_key_mismatch(format!(
            "More than one property or field refers to '{}' as their foreign key.",
            navigation
        ))),
        (first, _) => Ok(first),
    }
}

fn find_inverse_property_member(navigation: &Member) -> IncludeResult<Option<Member>> {
    let related = navigation.related_schema()?;
    let mut candidates = properties_and_fields(related)
        .filter(|member| member.info().inverse_property_target() == Some(navigation.name()));

    match (candidates.next(), candidates.next()) {
        (Some(_), Some(_)) => Err(IncludeError::foreign_key_mismatch(format!(
            "More than one property or field of type '{}' refers to '{}' as their inverse property.",
            related.name(),
            navigation
        ))),
        (first, _) => Ok(first),
    }
}
