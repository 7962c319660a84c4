//! Aggregate queryables and the standard query operators.
//!
//! An [`AggregateQueryable`] pairs a [`QueryExpr`] with the provider that
//! owns the fluent pipeline. Standard operators (from [`QueryableExt`])
//! extend the expression and the provider mirrors the resulting stages onto
//! the pipeline; includes append their stages to the pipeline directly.
//! Execution always runs the pipeline.
//!
//! ```rust,ignore
//! use prax_include::prelude::*;
//! use bson::doc;
//!
//! let posts = collection
//!     .as_aggregate_queryable()?
//!     .include(Navigation::<Post, Option<Blog>>::member("Blog"))?
//!     .r#where(doc! { "Rating": { "$gte": 4 } })?
//!     .order_by("Title")?
//!     .take(10)?
//!     .to_list()
//!     .await?;
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use bson::{Bson, Document};
use mongodb::Collection;
use mongodb::options::AggregateOptions;
use tokio_util::sync::CancellationToken;

use crate::context::IncludeContext;
use crate::entity::Entity;
use crate::error::{IncludeError, IncludeResult};
use crate::pipeline::AggregatePipeline;
use crate::provider::AggregateQueryProvider;
use crate::query::{QueryExpr, QueryOp, SortDirection};

/// A query that can be turned into an [`AggregateQueryable`].
///
/// Every extension operator starts by converting its receiver. Only the
/// queryables of this crate override the conversion; any other implementor
/// is rejected as unsupported.
pub trait AggregateQuery<T>: Sized {
    /// Convert into the aggregate queryable carrying the pipeline.
    fn into_queryable(self) -> IncludeResult<AggregateQueryable<T>> {
        Err(IncludeError::unsupported(format!(
            "This AggregateQuery<{}> is not supported.",
            std::any::type_name::<T>()
        )))
    }
}

/// A standard query whose stages are mirrored onto an aggregation pipeline.
pub struct AggregateQueryable<T> {
    expression: QueryExpr,
    provider: AggregateQueryProvider,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for AggregateQueryable<T> {
    fn clone(&self) -> Self {
        Self {
            expression: self.expression.clone(),
            provider: self.provider.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for AggregateQueryable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregateQueryable")
            .field("expression", &self.expression)
            .field("stages", &self.provider.stages())
            .finish()
    }
}

impl<T> AggregateQueryable<T> {
    /// Create from an existing pipeline and a query expression over the same collection.
    ///
    /// The stages of `expression` are appended after the pipeline's own stages.
    pub fn create(
        pipeline: AggregatePipeline<T>,
        expression: QueryExpr,
        context: Arc<IncludeContext>,
    ) -> IncludeResult<Self> {
        if expression.namespace() != pipeline.source().namespace() {
            return Err(IncludeError::argument(
                "expression",
                format!(
                    "query over '{}' cannot extend a pipeline over '{}'",
                    expression.namespace(),
                    pipeline.source().namespace()
                ),
            ));
        }

        let mut provider = AggregateQueryProvider::new(context, pipeline);
        provider.sync(&expression)?;
        Ok(Self {
            expression,
            provider,
            _marker: PhantomData,
        })
    }

    /// Create from a driver collection.
    pub fn from_collection<C>(
        collection: &Collection<C>,
        options: Option<AggregateOptions>,
        context: Arc<IncludeContext>,
    ) -> IncludeResult<Self>
    where
        C: Send + Sync + 'static,
    {
        let mut pipeline = AggregatePipeline::from_collection(collection);
        if let Some(options) = options {
            pipeline = pipeline.with_options(options);
        }
        let expression = QueryExpr::source(collection.name());
        Self::create(pipeline, expression, context)
    }

    /// The composed standard query.
    pub fn expression(&self) -> &QueryExpr {
        &self.expression
    }

    /// The pipeline stages assembled so far.
    pub fn stages(&self) -> &[Document] {
        self.provider.stages()
    }

    /// A copy of the pipeline assembled so far.
    pub fn pipeline(&self) -> AggregatePipeline<T> {
        self.provider.pipeline()
    }

    /// The provider owning the pipeline.
    pub fn provider(&self) -> &AggregateQueryProvider {
        &self.provider
    }

    /// The context used for resolution.
    pub fn context(&self) -> &Arc<IncludeContext> {
        self.provider.context()
    }

    /// Abort execution when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.provider.set_cancellation(token);
        self
    }

    /// Apply a standard operator and mirror its stages onto the pipeline.
    ///
    /// `ThenBy` is only accepted directly after an ordering whose `$sort` is
    /// still the last stage of the pipeline.
    pub fn apply<U>(self, op: QueryOp) -> IncludeResult<AggregateQueryable<U>> {
        if matches!(op, QueryOp::ThenBy { .. }) {
            self.ensure_refinable()?;
        }
        let expression = self.expression.then(op);
        let mut provider = self.provider;
        provider.sync(&expression)?;
        Ok(AggregateQueryable {
            expression,
            provider,
            _marker: PhantomData,
        })
    }

    fn ensure_refinable(&self) -> IncludeResult<()> {
        let ordered = matches!(
            self.expression.ops().last(),
            Some(QueryOp::OrderBy { .. } | QueryOp::ThenBy { .. })
        );
        if !ordered {
            return Err(IncludeError::unsupported(
                "ThenBy must directly follow OrderBy or ThenBy.",
            ));
        }
        if self.provider.has_detached_stages() {
            return Err(IncludeError::unsupported(
                "ThenBy cannot refine an ordering that is followed by an include.",
            ));
        }
        Ok(())
    }

    pub(crate) fn append_stage(&mut self, stage: Document) {
        self.provider.append_stage(stage);
    }
}

impl<T> AggregateQuery<T> for AggregateQueryable<T> {
    fn into_queryable(self) -> IncludeResult<AggregateQueryable<T>> {
        Ok(self)
    }
}

/// An aggregate queryable whose last operator was an ordering.
pub struct OrderedAggregateQueryable<T>(AggregateQueryable<T>);

impl<T> OrderedAggregateQueryable<T> {
    /// Refine the ordering by `field`, ascending.
    pub fn then_by(self, field: &str) -> IncludeResult<OrderedAggregateQueryable<T>> {
        self.refine(field, SortDirection::Ascending)
    }

    /// Refine the ordering by `field`, descending.
    pub fn then_by_descending(self, field: &str) -> IncludeResult<OrderedAggregateQueryable<T>> {
        self.refine(field, SortDirection::Descending)
    }

    fn refine(self, field: &str, direction: SortDirection) -> IncludeResult<Self> {
        require("key", field)?;
        self.0
            .apply(QueryOp::ThenBy {
                field: field.to_string(),
                direction,
            })
            .map(OrderedAggregateQueryable)
    }

    /// The underlying queryable.
    pub fn into_inner(self) -> AggregateQueryable<T> {
        self.0
    }

    /// The pipeline stages assembled so far.
    pub fn stages(&self) -> &[Document] {
        self.0.stages()
    }
}

impl<T> fmt::Debug for OrderedAggregateQueryable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OrderedAggregateQueryable").field(&self.0).finish()
    }
}

impl<T> AggregateQuery<T> for OrderedAggregateQueryable<T> {
    fn into_queryable(self) -> IncludeResult<AggregateQueryable<T>> {
        Ok(self.0)
    }
}

fn require(param: &'static str, value: &str) -> IncludeResult<()> {
    if value.is_empty() {
        Err(IncludeError::argument(param, "value is empty"))
    } else {
        Ok(())
    }
}

/// Standard query operators over any aggregate query.
pub trait QueryableExt<T>: AggregateQuery<T> {
    /// Keep documents matching `predicate`.
    fn r#where(self, predicate: Document) -> IncludeResult<AggregateQueryable<T>> {
        self.into_queryable()?.apply(QueryOp::Filter(predicate))
    }

    /// Order by `field`, ascending.
    fn order_by(self, field: &str) -> IncludeResult<OrderedAggregateQueryable<T>> {
        order(self, field, SortDirection::Ascending)
    }

    /// Order by `field`, descending.
    fn order_by_descending(self, field: &str) -> IncludeResult<OrderedAggregateQueryable<T>> {
        order(self, field, SortDirection::Descending)
    }

    /// Reshape each document with `projection`.
    fn select<U>(self, projection: Document) -> IncludeResult<AggregateQueryable<U>> {
        if projection.is_empty() {
            return Err(IncludeError::argument("selector", "projection is empty"));
        }
        self.into_queryable()?.apply(QueryOp::Select(projection))
    }

    /// Flatten the array at `path` into one document per element.
    fn select_many<U>(self, path: &str) -> IncludeResult<AggregateQueryable<U>> {
        require("selector", path)?;
        self.into_queryable()?.apply(QueryOp::SelectMany(path.to_string()))
    }

    /// Group by the `key` expression, computing `accumulators` per group.
    fn group_by<U>(
        self,
        key: impl Into<Bson>,
        accumulators: Document,
    ) -> IncludeResult<AggregateQueryable<U>> {
        self.into_queryable()?.apply(QueryOp::GroupBy {
            key: key.into(),
            accumulators,
        })
    }

    /// Inner join against collection `from`, one output document per match.
    fn join<U>(
        self,
        from: &str,
        local_field: &str,
        foreign_field: &str,
        as_field: &str,
    ) -> IncludeResult<AggregateQueryable<U>> {
        require("inner", from)?;
        require("outer_key", local_field)?;
        require("inner_key", foreign_field)?;
        require("result", as_field)?;
        self.into_queryable()?.apply(QueryOp::Join {
            from: from.to_string(),
            local_field: local_field.to_string(),
            foreign_field: foreign_field.to_string(),
            as_field: as_field.to_string(),
        })
    }

    /// Group join against collection `from`, matches collected into `as_field`.
    fn group_join<U>(
        self,
        from: &str,
        local_field: &str,
        foreign_field: &str,
        as_field: &str,
    ) -> IncludeResult<AggregateQueryable<U>> {
        require("inner", from)?;
        require("outer_key", local_field)?;
        require("inner_key", foreign_field)?;
        require("result", as_field)?;
        self.into_queryable()?.apply(QueryOp::GroupJoin {
            from: from.to_string(),
            local_field: local_field.to_string(),
            foreign_field: foreign_field.to_string(),
            as_field: as_field.to_string(),
        })
    }

    /// Skip `count` documents.
    fn skip(self, count: u64) -> IncludeResult<AggregateQueryable<T>> {
        self.into_queryable()?.apply(QueryOp::Skip(count))
    }

    /// Keep at most `count` documents.
    fn take(self, count: u64) -> IncludeResult<AggregateQueryable<T>> {
        self.into_queryable()?.apply(QueryOp::Take(count))
    }

    /// Remove duplicate documents.
    fn distinct(self) -> IncludeResult<AggregateQueryable<T>> {
        self.into_queryable()?.apply(QueryOp::Distinct)
    }

    /// Keep documents whose discriminator `field` equals `value`, typed as `U`.
    fn of_type<U: Entity>(
        self,
        field: &str,
        value: impl Into<Bson>,
    ) -> IncludeResult<AggregateQueryable<U>> {
        require("discriminator", field)?;
        self.into_queryable()?.apply(QueryOp::OfType {
            field: field.to_string(),
            value: value.into(),
        })
    }
}

impl<T, Q: AggregateQuery<T>> QueryableExt<T> for Q {}

fn order<T, Q: AggregateQuery<T>>(
    query: Q,
    field: &str,
    direction: SortDirection,
) -> IncludeResult<OrderedAggregateQueryable<T>> {
    require("key", field)?;
    query
        .into_queryable()?
        .apply(QueryOp::OrderBy {
            field: field.to_string(),
            direction,
        })
        .map(OrderedAggregateQueryable)
}
