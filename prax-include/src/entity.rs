//! Static entity metadata.
//!
//! Every type that can take part in an include implements [`Entity`] and
//! describes itself with an [`EntitySchema`]: its members, which member is the
//! identifier, the wire name of each member, and the relationship annotations
//! (`foreign_key` / `inverse_property`) attached to navigation members.
//!
//! ```rust,ignore
//! use prax_include::{entity, EntitySchema, MemberInfo, ValueType};
//!
//! entity!(Post, EntitySchema::builder::<Post>("Post")
//!     .table("posts")
//!     .id(MemberInfo::property("id", ValueType::scalar("ObjectId")).element("_id"))
//!     .member(MemberInfo::property("blog_id", ValueType::scalar("ObjectId")))
//!     .member(MemberInfo::property("blog", ValueType::entity::<Blog>()).foreign_key("blog_id"))
//!     .build());
//! ```

use std::any::TypeId;
use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use smol_str::SmolStr;

use crate::error::{IncludeError, IncludeResult};

/// Accessor returning the schema of a related entity.
///
/// Stored as a function pointer so that schemas can refer to each other
/// without forcing initialization order.
pub type SchemaFn = fn() -> &'static EntitySchema;

/// A document type with static metadata.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + Unpin + 'static {
    /// The schema describing this entity.
    fn schema() -> &'static EntitySchema;
}

/// Implement [`Entity`] for a type from a schema expression.
///
/// The schema is built lazily on first access and lives for the rest of the
/// process.
#[macro_export]
macro_rules! entity {
    ($ty:ty, $schema:expr) => {
        impl $crate::Entity for $ty {
            fn schema() -> &'static $crate::EntitySchema {
                static SCHEMA: ::std::sync::LazyLock<$crate::EntitySchema> =
                    ::std::sync::LazyLock::new(|| $schema);
                &SCHEMA
            }
        }
    };
}

/// What kind of member a [`MemberInfo`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// A plain struct field.
    Field,
    /// An accessor-backed property.
    Property,
    /// A method. Never valid as a navigation.
    Method,
}

impl MemberKind {
    /// Check if this is a field or a property.
    pub fn is_field_or_property(&self) -> bool {
        matches!(self, Self::Field | Self::Property)
    }
}

#[derive(Debug, Clone, Copy)]
enum ValueKind {
    Scalar(&'static str),
    Entity(SchemaFn),
}

/// The declared type of a member's value.
#[derive(Debug, Clone, Copy)]
pub struct ValueType {
    kind: ValueKind,
    collection: bool,
}

impl ValueType {
    /// A primitive or library type, such as `i32`, `String` or `ObjectId`.
    pub const fn scalar(name: &'static str) -> Self {
        Self {
            kind: ValueKind::Scalar(name),
            collection: false,
        }
    }

    /// A collection of a primitive or library type.
    pub const fn scalar_collection(name: &'static str) -> Self {
        Self {
            kind: ValueKind::Scalar(name),
            collection: true,
        }
    }

    /// A reference to another entity.
    pub fn entity<T: Entity>() -> Self {
        Self {
            kind: ValueKind::Entity(T::schema),
            collection: false,
        }
    }

    /// A collection of another entity.
    pub fn collection_of<T: Entity>() -> Self {
        Self {
            kind: ValueKind::Entity(T::schema),
            collection: true,
        }
    }

    /// Check if the value is a collection of some element type.
    pub fn is_collection(&self) -> bool {
        self.collection
    }

    /// The element type: the value type itself, or the collection's element.
    pub fn element(&self) -> ValueType {
        Self {
            kind: self.kind,
            collection: false,
        }
    }

    /// Check if the element type is a user-defined entity.
    pub fn is_custom(&self) -> bool {
        matches!(self.kind, ValueKind::Entity(_))
    }

    /// Schema of the element type when it is an entity.
    pub fn element_schema(&self) -> Option<&'static EntitySchema> {
        match self.kind {
            ValueKind::Entity(schema) => Some(schema()),
            ValueKind::Scalar(_) => None,
        }
    }

    /// Name of the element type.
    pub fn element_name(&self) -> &str {
        match self.kind {
            ValueKind::Scalar(name) => name,
            ValueKind::Entity(schema) => schema().name(),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.collection {
            write!(f, "Vec<{}>", self.element_name())
        } else {
            f.write_str(self.element_name())
        }
    }
}

/// Metadata for a single member of an entity.
#[derive(Debug, Clone)]
pub struct MemberInfo {
    name: SmolStr,
    element_name: SmolStr,
    kind: MemberKind,
    value_type: ValueType,
    is_id: bool,
    foreign_key: Option<SmolStr>,
    inverse_property: Option<SmolStr>,
}

impl MemberInfo {
    fn new(name: impl Into<SmolStr>, kind: MemberKind, value_type: ValueType) -> Self {
        let name = name.into();
        Self {
            element_name: name.clone(),
            name,
            kind,
            value_type,
            is_id: false,
            foreign_key: None,
            inverse_property: None,
        }
    }

    /// Describe a struct field.
    pub fn field(name: impl Into<SmolStr>, value_type: ValueType) -> Self {
        Self::new(name, MemberKind::Field, value_type)
    }

    /// Describe a property.
    pub fn property(name: impl Into<SmolStr>, value_type: ValueType) -> Self {
        Self::new(name, MemberKind::Property, value_type)
    }

    /// Describe a method with the given return type.
    pub fn method(name: impl Into<SmolStr>, return_type: ValueType) -> Self {
        Self::new(name, MemberKind::Method, return_type)
    }

    /// Set the on-the-wire element name (defaults to the member name).
    pub fn element(mut self, element_name: impl Into<SmolStr>) -> Self {
        self.element_name = element_name.into();
        self
    }

    /// Annotate this navigation with the name of the sibling member holding its key.
    pub fn foreign_key(mut self, member: impl Into<SmolStr>) -> Self {
        self.foreign_key = Some(member.into());
        self
    }

    /// Annotate this navigation with the name of its counterpart on the related type.
    pub fn inverse_property(mut self, member: impl Into<SmolStr>) -> Self {
        self.inverse_property = Some(member.into());
        self
    }

    /// Logical member name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wire-level field name.
    pub fn element_name(&self) -> &str {
        &self.element_name
    }

    /// Member kind.
    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    /// Declared value type.
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Whether this member is the identifier.
    pub fn is_id(&self) -> bool {
        self.is_id
    }

    /// Target of the foreign key annotation, if any.
    pub fn foreign_key_target(&self) -> Option<&str> {
        self.foreign_key.as_deref()
    }

    /// Target of the inverse property annotation, if any.
    pub fn inverse_property_target(&self) -> Option<&str> {
        self.inverse_property.as_deref()
    }
}

/// Metadata describing an entity type.
#[derive(Debug)]
pub struct EntitySchema {
    name: SmolStr,
    type_id: TypeId,
    rust_type: &'static str,
    table: Option<SmolStr>,
    base: Option<SchemaFn>,
    members: Vec<MemberInfo>,
}

impl EntitySchema {
    /// Start describing the entity type `T`.
    pub fn builder<T: 'static>(name: impl Into<SmolStr>) -> EntitySchemaBuilder {
        EntitySchemaBuilder::new(name.into(), TypeId::of::<T>(), std::any::type_name::<T>())
    }

    /// Logical type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity of the Rust type this schema describes.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Fully qualified Rust type name.
    pub fn rust_type(&self) -> &'static str {
        self.rust_type
    }

    /// Explicit collection name annotation.
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Base entity this one extends.
    pub fn base(&self) -> Option<&'static EntitySchema> {
        self.base.map(|schema| schema())
    }

    /// Members declared directly on this type.
    pub fn declared_members(&self) -> &[MemberInfo] {
        &self.members
    }

    /// All members, own members first, then those of each base in turn.
    pub fn members(&'static self) -> impl Iterator<Item = Member> {
        let mut current = Some(self);
        std::iter::from_fn(move || {
            let schema = current?;
            current = schema.base();
            Some(schema)
        })
        .flat_map(|schema| {
            schema
                .members
                .iter()
                .map(move |info| Member::new(schema, info))
        })
    }

    /// Look up a field or property (or method) by logical name.
    pub fn member(&'static self, name: &str) -> Option<Member> {
        self.members().find(|member| member.name() == name)
    }

    /// The identifier member.
    pub fn id_member(&'static self) -> Option<Member> {
        self.members().find(|member| member.info().is_id())
    }

    /// Check if this type derives (directly or transitively) from `other`.
    pub fn inherits_from(&self, other: &EntitySchema) -> bool {
        let mut current = self.base();
        while let Some(schema) = current {
            if schema == other {
                return true;
            }
            current = schema.base();
        }
        false
    }

    /// Check if this type is `other` or derives from it.
    pub fn is_assignable_to(&self, other: &EntitySchema) -> bool {
        self == other || self.inherits_from(other)
    }
}

impl PartialEq for EntitySchema {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for EntitySchema {}

impl fmt::Display for EntitySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Builder for [`EntitySchema`].
#[derive(Debug)]
pub struct EntitySchemaBuilder {
    name: SmolStr,
    type_id: TypeId,
    rust_type: &'static str,
    table: Option<SmolStr>,
    base: Option<SchemaFn>,
    members: Vec<MemberInfo>,
}

impl EntitySchemaBuilder {
    fn new(name: SmolStr, type_id: TypeId, rust_type: &'static str) -> Self {
        Self {
            name,
            type_id,
            rust_type,
            table: None,
            base: None,
            members: Vec::new(),
        }
    }

    /// Pin the collection name, bypassing the naming convention.
    pub fn table(mut self, name: impl Into<SmolStr>) -> Self {
        self.table = Some(name.into());
        self
    }

    /// Declare that this entity extends `B`.
    pub fn extends<B: Entity>(mut self) -> Self {
        self.base = Some(B::schema);
        self
    }

    /// Add the identifier member. A later call replaces the earlier identifier.
    pub fn id(mut self, member: MemberInfo) -> Self {
        for existing in &mut self.members {
            existing.is_id = false;
        }
        self.members.push(MemberInfo {
            is_id: true,
            ..member
        });
        self
    }

    /// Add a member.
    pub fn member(mut self, member: MemberInfo) -> Self {
        self.members.push(member);
        self
    }

    /// Build the schema.
    pub fn build(self) -> EntitySchema {
        EntitySchema {
            name: self.name,
            type_id: self.type_id,
            rust_type: self.rust_type,
            table: self.table,
            base: self.base,
            members: self.members,
        }
    }
}

/// Stable cache key for a member: declaring type plus member name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberKey {
    /// Declaring type.
    pub type_id: TypeId,
    /// Member name.
    pub member: SmolStr,
}

/// A member together with the schema that declares it.
#[derive(Clone, Copy)]
pub struct Member {
    declaring: &'static EntitySchema,
    info: &'static MemberInfo,
}

impl Member {
    pub(crate) fn new(declaring: &'static EntitySchema, info: &'static MemberInfo) -> Self {
        Self { declaring, info }
    }

    /// The schema declaring this member.
    pub fn declaring_type(&self) -> &'static EntitySchema {
        self.declaring
    }

    /// The member metadata.
    pub fn info(&self) -> &'static MemberInfo {
        self.info
    }

    /// Logical member name.
    pub fn name(&self) -> &'static str {
        self.info.name()
    }

    /// Declared value type.
    pub fn value_type(&self) -> ValueType {
        self.info.value_type()
    }

    /// Cache key for this member.
    pub fn key(&self) -> MemberKey {
        MemberKey {
            type_id: self.declaring.type_id(),
            member: self.info.name.clone(),
        }
    }

    /// Fail unless this member is a field or property.
    pub fn ensure_field_or_property(&self) -> IncludeResult<()> {
        if self.info.kind().is_field_or_property() {
            Ok(())
        } else {
            Err(IncludeError::invalid_member(format!(
                "'{}' does not refer to a property or field.",
                self
            )))
        }
    }

    /// Fail unless this member's value (or element) type is an entity.
    pub fn ensure_custom_type(&self) -> IncludeResult<()> {
        if self.value_type().is_custom() {
            Ok(())
        } else {
            Err(IncludeError::invalid_member(format!(
                "Member '{}' is not a custom type ({}).",
                self,
                self.value_type()
            )))
        }
    }

    /// Schema of the related entity, for navigation members.
    pub fn related_schema(&self) -> IncludeResult<&'static EntitySchema> {
        self.value_type().element_schema().ok_or_else(|| {
            IncludeError::invalid_member(format!("Member '{}' is not a custom type.", self))
        })
    }
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        self.declaring == other.declaring && self.info.name == other.info.name
    }
}

impl Eq for Member {}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Member({}.{})", self.declaring.name(), self.info.name())
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaring.name(), self.info.name())
    }
}
