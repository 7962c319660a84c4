//! Plain standard queries.
//!
//! A [`MongoQueryable`] is a query expression over a collection without a
//! fluent pipeline behind it. It can be executed on its own, or converted
//! with [`AsAggregateQueryable`](crate::AsAggregateQueryable) into an
//! aggregate queryable that supports includes.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use bson::Document;
use futures::future;
use futures::stream::TryStreamExt;
use mongodb::Collection;
use mongodb::options::AggregateOptions;
use serde::de::DeserializeOwned;

use crate::error::{IncludeError, IncludeResult};
use crate::query::{QueryExpr, QueryOp, SortDirection};
use crate::source::AggregateSource;

/// A standard query over a collection.
pub struct MongoQueryable<T> {
    source: Arc<dyn AggregateSource>,
    options: Option<AggregateOptions>,
    expression: QueryExpr,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for MongoQueryable<T> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            options: self.options.clone(),
            expression: self.expression.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for MongoQueryable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MongoQueryable")
            .field("expression", &self.expression)
            .finish()
    }
}

impl<T> MongoQueryable<T> {
    /// A query reading every document of `source`.
    pub fn new(source: Arc<dyn AggregateSource>, options: Option<AggregateOptions>) -> Self {
        let expression = QueryExpr::source(source.namespace());
        Self {
            source,
            options,
            expression,
            _marker: PhantomData,
        }
    }

    /// A query reading every document of a driver collection.
    pub fn from_collection<C>(collection: &Collection<C>, options: Option<AggregateOptions>) -> Self
    where
        C: Send + Sync + 'static,
    {
        Self::new(Arc::new(collection.clone()), options)
    }

    /// The collection the query reads from.
    pub fn source(&self) -> &Arc<dyn AggregateSource> {
        &self.source
    }

    /// The aggregate options used on execution.
    pub fn options(&self) -> Option<&AggregateOptions> {
        self.options.as_ref()
    }

    /// The composed expression.
    pub fn expression(&self) -> &QueryExpr {
        &self.expression
    }

    /// Apply any standard operator.
    pub fn apply<U>(self, op: QueryOp) -> MongoQueryable<U> {
        MongoQueryable {
            expression: self.expression.then(op),
            source: self.source,
            options: self.options,
            _marker: PhantomData,
        }
    }

    /// Keep documents matching `predicate`.
    pub fn r#where(self, predicate: Document) -> Self {
        self.apply(QueryOp::Filter(predicate))
    }

    /// Order by `field`, ascending.
    pub fn order_by(self, field: &str) -> Self {
        self.apply(QueryOp::OrderBy {
            field: field.to_string(),
            direction: SortDirection::Ascending,
        })
    }

    /// Order by `field`, descending.
    pub fn order_by_descending(self, field: &str) -> Self {
        self.apply(QueryOp::OrderBy {
            field: field.to_string(),
            direction: SortDirection::Descending,
        })
    }

    /// Refine the current ordering by `field`, ascending.
    pub fn then_by(self, field: &str) -> Self {
        self.apply(QueryOp::ThenBy {
            field: field.to_string(),
            direction: SortDirection::Ascending,
        })
    }

    /// Refine the current ordering by `field`, descending.
    pub fn then_by_descending(self, field: &str) -> Self {
        self.apply(QueryOp::ThenBy {
            field: field.to_string(),
            direction: SortDirection::Descending,
        })
    }

    /// Skip `count` documents.
    pub fn skip(self, count: u64) -> Self {
        self.apply(QueryOp::Skip(count))
    }

    /// Keep at most `count` documents.
    pub fn take(self, count: u64) -> Self {
        self.apply(QueryOp::Take(count))
    }
}

impl<T> MongoQueryable<T>
where
    T: DeserializeOwned + Send + 'static,
{
    /// Run the query and collect every result.
    pub async fn to_list(&self) -> IncludeResult<Vec<T>> {
        self.source
            .aggregate(self.expression.stages(), self.options.clone())
            .await?
            .and_then(|document| {
                future::ready(bson::from_document::<T>(document).map_err(IncludeError::from))
            })
            .try_collect()
            .await
    }
}
