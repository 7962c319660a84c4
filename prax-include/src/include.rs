//! Eager loading of related documents.
//!
//! `include` joins the related collection of a navigation member with a
//! `$lookup` and writes the result into the navigation field;
//! `then_include` does the same for a navigation of the previously included
//! type, nested under the previous navigation's field.
//!
//! For a reference navigation the lookup lands in a temporary `__Name__`
//! array whose first element is copied into `Name`, after which the
//! temporary field is projected away. A collection navigation is written
//! directly. Every field involved is prefixed with the path of the
//! enclosing include (`Blog.__Posts__` under `Blog`), so independent
//! include chains never share a temporary field.
//!
//! Which side holds the key is decided by the navigation's associated
//! member (see [`IncludeContext::associated_member`]):
//!
//! | key held by | `localField` | `foreignField` |
//! |---|---|---|
//! | current type | associated member | related identifier |
//! | related type | current identifier | associated member |
//!
//! [`IncludeContext::associated_member`]: crate::IncludeContext::associated_member

use std::fmt;
use std::marker::PhantomData;

use bson::Document;
use tracing::debug;

use crate::entity::{Entity, EntitySchema, Member};
use crate::error::IncludeResult;
use crate::mapping;
use crate::navigation::{Navigable, Navigation};
use crate::queryable::{AggregateQuery, AggregateQueryable};
use crate::stages;

/// An aggregate queryable whose last operator was an include of a `P` navigation.
pub struct IncludedQueryable<T, P> {
    inner: AggregateQueryable<T>,
    navigation_element_name: String,
    _marker: PhantomData<fn() -> P>,
}

impl<T, P> IncludedQueryable<T, P> {
    /// Dotted path of the included navigation field, such as `Blog.Posts`.
    pub fn navigation_element_name(&self) -> &str {
        &self.navigation_element_name
    }

    /// The pipeline stages assembled so far.
    pub fn stages(&self) -> &[Document] {
        self.inner.stages()
    }

    /// The underlying queryable.
    pub fn into_inner(self) -> AggregateQueryable<T> {
        self.inner
    }
}

impl<T, P: Navigable> IncludedQueryable<T, P> {
    /// Include a navigation of the previously included entity.
    pub fn then_include<Q: Navigable>(
        self,
        navigation_path: Navigation<P::Element, Q>,
    ) -> IncludeResult<IncludedQueryable<T, Q>> {
        let (member, predicate) = navigation_path.resolve()?;
        apply_include::<T, Q>(
            self.inner,
            P::Element::schema(),
            member,
            predicate,
            Some(&self.navigation_element_name),
        )
    }
}

impl<T, P> fmt::Debug for IncludedQueryable<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncludedQueryable")
            .field("navigation_element_name", &self.navigation_element_name)
            .field("inner", &self.inner)
            .finish()
    }
}

impl<T, P> AggregateQuery<T> for IncludedQueryable<T, P> {
    fn into_queryable(self) -> IncludeResult<AggregateQueryable<T>> {
        Ok(self.inner)
    }
}

/// `include` over any aggregate query of an entity.
pub trait IncludeExt<T: Entity>: AggregateQuery<T> {
    /// Include the related documents of a navigation member.
    fn include<P: Navigable>(
        self,
        navigation_path: Navigation<T, P>,
    ) -> IncludeResult<IncludedQueryable<T, P>> {
        let queryable = self.into_queryable()?;
        let (member, predicate) = navigation_path.resolve()?;
        apply_include::<T, P>(queryable, T::schema(), member, predicate, None)
    }
}

impl<T: Entity, Q: AggregateQuery<T>> IncludeExt<T> for Q {}

/// Field names computed for one include.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LookupPlan {
    pub from: String,
    pub local_field: String,
    pub foreign_field: String,
    pub as_field: String,
    pub navigation_element_name: String,
    pub is_collection: bool,
}

fn apply_include<T, P: Navigable>(
    mut queryable: AggregateQueryable<T>,
    declaring: &'static EntitySchema,
    navigation: Member,
    predicate: Option<Document>,
    parent: Option<&str>,
) -> IncludeResult<IncludedQueryable<T, P>> {
    let plan = plan_lookup(&queryable, declaring, &navigation, parent)?;
    debug!(
        navigation = %navigation,
        from = %plan.from,
        local_field = %plan.local_field,
        foreign_field = %plan.foreign_field,
        as_field = %plan.as_field,
        "including navigation"
    );

    queryable.append_stage(stages::lookup_stage(
        &plan.from,
        &plan.local_field,
        &plan.foreign_field,
        &plan.as_field,
    ));
    if let Some(predicate) = predicate {
        queryable.append_stage(stages::elem_match_stage(&plan.as_field, predicate));
    }
    if !plan.is_collection {
        queryable.append_stage(stages::first_element_stage(
            &plan.navigation_element_name,
            &plan.as_field,
        ));
        queryable.append_stage(stages::exclude_stage(&plan.as_field));
    }

    Ok(IncludedQueryable {
        inner: queryable,
        navigation_element_name: plan.navigation_element_name,
        _marker: PhantomData,
    })
}

/// Resolve everything an include needs before touching the pipeline.
pub(crate) fn plan_lookup<T>(
    queryable: &AggregateQueryable<T>,
    declaring: &'static EntitySchema,
    navigation: &Member,
    parent: Option<&str>,
) -> IncludeResult<LookupPlan> {
    let context = queryable.context();
    let related = navigation.related_schema()?;
    let is_collection = navigation.value_type().is_collection();

    let associated = context.associated_member(navigation)?;
    let associated_element = mapping::element_name(&associated);

    let prefix = |field: &str| stages::dotted(parent.unwrap_or_default(), field);

    let element_name = mapping::element_name(navigation);
    let navigation_element_name = prefix(element_name);
    let as_field = if is_collection {
        prefix(element_name)
    } else {
        prefix(&format!("__{}__", element_name))
    };

    let key_on_current_side = declaring.is_assignable_to(associated.declaring_type());
    let (local_field, foreign_field) = if key_on_current_side {
        (
            prefix(associated_element),
            mapping::id_element_name(related)?.to_string(),
        )
    } else {
        (
            prefix(mapping::id_element_name(declaring)?),
            associated_element.to_string(),
        )
    };

    Ok(LookupPlan {
        from: context.collection_name(related).to_string(),
        local_field,
        foreign_field,
        as_field,
        navigation_element_name,
        is_collection,
    })
}
