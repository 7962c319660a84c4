//! Wire-level names for members and identifiers.

use crate::entity::{EntitySchema, Member};
use crate::error::{IncludeError, IncludeResult};

/// Wire-level field name of a member.
pub fn element_name(member: &Member) -> &'static str {
    member.info().element_name()
}

/// The identifier member of a type.
pub fn id_member(schema: &'static EntitySchema) -> IncludeResult<Member> {
    schema.id_member().ok_or_else(|| {
        IncludeError::invalid_member(format!("'{}' has no identifier member.", schema.name()))
    })
}

/// Logical name of a type's identifier member.
pub fn id_member_name(schema: &'static EntitySchema) -> IncludeResult<&'static str> {
    id_member(schema).map(|member| member.name())
}

/// Wire-level field name of a type's identifier member.
pub fn id_element_name(schema: &'static EntitySchema) -> IncludeResult<&'static str> {
    id_member(schema).map(|member| member.info().element_name())
}
