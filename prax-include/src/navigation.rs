//! Typed navigation paths for `include` / `then_include`.

use std::fmt;
use std::marker::PhantomData;

use bson::Document;
use smol_str::SmolStr;

use crate::entity::{Entity, Member};
use crate::error::{IncludeError, IncludeResult};

/// The Rust type of a navigation member's value.
///
/// `Option<T>` is a reference navigation and `Vec<T>` a collection
/// navigation, where `T` is the related entity.
pub trait Navigable: 'static {
    /// The related entity.
    type Element: Entity;
    /// Whether the navigation holds many related entities.
    const IS_COLLECTION: bool;
}

impl<T: Entity> Navigable for Option<T> {
    type Element = T;
    const IS_COLLECTION: bool = false;
}

impl<T: Entity> Navigable for Vec<T> {
    type Element = T;
    const IS_COLLECTION: bool = true;
}

/// Shape of a navigation path.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationPath {
    /// A plain member access, `post.blog`.
    Member(SmolStr),
    /// A member access filtered by a predicate, `blog.posts.where(...)`.
    Filtered {
        /// Navigation member.
        member: SmolStr,
        /// Element predicate.
        predicate: Document,
    },
}

/// A navigation from entity `E` to a value of type `P`.
///
/// ```rust,ignore
/// let blog: Navigation<Post, Option<Blog>> = Navigation::member("Blog");
/// let posts: Navigation<Blog, Vec<Post>> = Navigation::member("Posts");
/// ```
pub struct Navigation<E, P> {
    path: NavigationPath,
    _marker: PhantomData<fn(&E) -> P>,
}

impl<E, P> Clone for Navigation<E, P> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            _marker: PhantomData,
        }
    }
}

impl<E, P> fmt::Debug for Navigation<E, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Navigation").field(&self.path).finish()
    }
}

impl<E: Entity, P: Navigable> Navigation<E, P> {
    /// Navigate through the member `name`.
    pub fn member(name: impl Into<SmolStr>) -> Self {
        Self {
            path: NavigationPath::Member(name.into()),
            _marker: PhantomData,
        }
    }

    /// Navigate through the member `name`, keeping only elements matching `predicate`.
    ///
    /// Filtered includes are not supported; including such a path fails.
    pub fn filtered(name: impl Into<SmolStr>, predicate: Document) -> Self {
        Self {
            path: NavigationPath::Filtered {
                member: name.into(),
                predicate,
            },
            _marker: PhantomData,
        }
    }

    /// The path shape.
    pub fn path(&self) -> &NavigationPath {
        &self.path
    }

    /// Resolve the navigation member and its element predicate.
    pub(crate) fn resolve(&self) -> IncludeResult<(Member, Option<Document>)> {
        let name = match &self.path {
            NavigationPath::Filtered { .. } => {
                return Err(IncludeError::unsupported("Include filter is not supported yet."));
            }
            NavigationPath::Member(name) => name,
        };

        if name.is_empty() {
            return Err(IncludeError::argument("navigation_path", "member name is empty"));
        }

        let schema = E::schema();
        let member = schema.member(name).ok_or_else(|| {
            IncludeError::invalid_member(format!(
                "'{}' has no property or field named '{}'.",
                schema.name(),
                name
            ))
        })?;
        member.ensure_field_or_property()?;
        member.ensure_custom_type()?;

        let value_type = member.value_type();
        let element_matches = value_type
            .element_schema()
            .is_some_and(|related| related.type_id() == P::Element::schema().type_id());
        if value_type.is_collection() != P::IS_COLLECTION || !element_matches {
            return Err(IncludeError::invalid_member(format!(
                "'{}' is declared as {} and cannot be navigated as {}.",
                member,
                value_type,
                std::any::type_name::<P>()
            )));
        }

        Ok((member, None))
    }
}
