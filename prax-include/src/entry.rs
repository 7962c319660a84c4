//! Conversions into aggregate queryables.

use std::sync::Arc;

use mongodb::Collection;

use crate::context::IncludeContext;
use crate::error::IncludeResult;
use crate::pipeline::AggregatePipeline;
use crate::query::QueryExpr;
use crate::queryable::AggregateQueryable;
use crate::standard::MongoQueryable;

/// Start an aggregate queryable from a collection, a pipeline or a standard query.
pub trait AsAggregateQueryable<T> {
    /// Convert using the process-wide context.
    fn as_aggregate_queryable(self) -> IncludeResult<AggregateQueryable<T>>
    where
        Self: Sized,
    {
        self.as_aggregate_queryable_with(IncludeContext::global())
    }

    /// Convert using `context` for resolution and extraction.
    fn as_aggregate_queryable_with(
        self,
        context: Arc<IncludeContext>,
    ) -> IncludeResult<AggregateQueryable<T>>;
}

/// An empty pipeline paired with an unfiltered query.
impl<T> AsAggregateQueryable<T> for &Collection<T>
where
    T: Send + Sync + 'static,
{
    fn as_aggregate_queryable_with(
        self,
        context: Arc<IncludeContext>,
    ) -> IncludeResult<AggregateQueryable<T>> {
        AggregateQueryable::from_collection(self, None, context)
    }
}

/// The pipeline's stages stay in front of everything composed afterwards.
impl<T> AsAggregateQueryable<T> for AggregatePipeline<T> {
    fn as_aggregate_queryable_with(
        self,
        context: Arc<IncludeContext>,
    ) -> IncludeResult<AggregateQueryable<T>> {
        let expression = QueryExpr::source(self.source().namespace());
        AggregateQueryable::create(self, expression, context)
    }
}

/// The query's stages are replayed onto an empty pipeline over its source.
impl<T> AsAggregateQueryable<T> for MongoQueryable<T> {
    fn as_aggregate_queryable_with(
        self,
        context: Arc<IncludeContext>,
    ) -> IncludeResult<AggregateQueryable<T>> {
        let pipeline = AggregatePipeline::new(
            Arc::clone(self.source()),
            self.options().cloned(),
        );
        AggregateQueryable::create(pipeline, self.expression().clone(), context)
    }
}
