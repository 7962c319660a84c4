//! Name and relationship resolution.
//!
//! All three resolvers hang off [`IncludeContext`](crate::IncludeContext) and
//! memoize successful results in its caches:
//!
//! - [`IncludeContext::collection_name`](crate::IncludeContext::collection_name)
//! - [`IncludeContext::foreign_key`](crate::IncludeContext::foreign_key)
//! - [`IncludeContext::associated_member`](crate::IncludeContext::associated_member)

mod associated;
mod collection_name;
mod foreign_key;

use crate::entity::{EntitySchema, Member};

/// Find a field or property (never a method) by name, including inherited members.
pub(crate) fn property_or_field(schema: &'static EntitySchema, name: &str) -> Option<Member> {
    schema
        .members()
        .find(|member| member.info().kind().is_field_or_property() && member.name() == name)
}

/// Every field and property of a type, including inherited members.
pub(crate) fn properties_and_fields(
    schema: &'static EntitySchema,
) -> impl Iterator<Item = Member> {
    schema
        .members()
        .filter(|member| member.info().kind().is_field_or_property())
}
