//! Terminal operators.
//!
//! Every terminal consumes the query, appends its own stages and runs the
//! pipeline. The returned futures are `'static` and honor the cancellation
//! token set with [`AggregateQueryable::with_cancellation`].

use bson::{Bson, Document};
use futures::future::BoxFuture;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;

use crate::error::{IncludeError, IncludeResult};
use crate::query::{QueryOp, RESULT_FIELD};
use crate::queryable::{AggregateQuery, AggregateQueryable};

impl<T> AggregateQueryable<T> {
    /// Apply `ops` in order and collect the raw result documents.
    pub(crate) async fn run(self, ops: Vec<QueryOp>) -> IncludeResult<Vec<Document>> {
        let mut queryable = self;
        for op in ops {
            queryable = queryable.apply(op)?;
        }
        queryable.provider().documents().await
    }

    /// Apply `ops` in order and unwrap the single scalar result field.
    ///
    /// `None` when the pipeline produced no document, which is the case for
    /// an empty input.
    pub(crate) async fn scalar(self, ops: Vec<QueryOp>) -> IncludeResult<Option<Bson>> {
        let documents = self.run(ops).await?;
        match documents.into_iter().next() {
            Some(mut document) => Ok(Some(document.remove(RESULT_FIELD).unwrap_or(Bson::Null))),
            None => Ok(None),
        }
    }
}

fn decode<T: DeserializeOwned>(document: Document) -> IncludeResult<T> {
    Ok(bson::from_document(document)?)
}

fn with_filter(predicate: Option<Document>, terminal: QueryOp) -> Vec<QueryOp> {
    match predicate {
        Some(predicate) => vec![QueryOp::Filter(predicate), terminal],
        None => vec![terminal],
    }
}

async fn first_of<T: DeserializeOwned>(
    query: IncludeResult<AggregateQueryable<T>>,
    predicate: Option<Document>,
) -> IncludeResult<Option<T>> {
    let documents = query?.run(with_filter(predicate, QueryOp::First)).await?;
    documents.into_iter().next().map(decode).transpose()
}

async fn single_of<T: DeserializeOwned>(
    query: IncludeResult<AggregateQueryable<T>>,
    predicate: Option<Document>,
) -> IncludeResult<Option<T>> {
    let documents = query?.run(with_filter(predicate, QueryOp::Single)).await?;
    let mut documents = documents.into_iter();
    match (documents.next(), documents.next()) {
        (Some(_), Some(_)) => Err(IncludeError::MoreThanOneElement),
        (first, _) => first.map(decode).transpose(),
    }
}

async fn count_of<T>(
    query: IncludeResult<AggregateQueryable<T>>,
    predicate: Option<Document>,
) -> IncludeResult<i64> {
    match query?.scalar(with_filter(predicate, QueryOp::Count)).await? {
        None => Ok(0),
        Some(Bson::Int32(n)) => Ok(i64::from(n)),
        Some(Bson::Int64(n)) => Ok(n),
        Some(other) => Err(IncludeError::internal(format!(
            "count produced a non-integer result: {}",
            other
        ))),
    }
}

async fn extreme_of<T, V: DeserializeOwned>(
    query: IncludeResult<AggregateQueryable<T>>,
    terminal: QueryOp,
) -> IncludeResult<Option<V>> {
    match query?.scalar(vec![terminal]).await? {
        None | Some(Bson::Null) => Ok(None),
        Some(value) => Ok(Some(bson::from_bson(value)?)),
    }
}

/// Terminal operators over any aggregate query.
pub trait AggregateQueryableExt<T>: AggregateQuery<T>
where
    T: DeserializeOwned + Send + 'static,
{
    /// Run the query and collect every result.
    fn to_list(self) -> BoxFuture<'static, IncludeResult<Vec<T>>> {
        let query = self.into_queryable();
        Box::pin(async move {
            let documents = query?.run(Vec::new()).await?;
            documents.into_iter().map(decode).collect()
        })
    }

    /// Run the query and stream the results.
    ///
    /// Cancellation is honored while the cursor is being opened.
    fn to_cursor(self) -> BoxFuture<'static, IncludeResult<BoxStream<'static, IncludeResult<T>>>> {
        let query = self.into_queryable();
        Box::pin(async move {
            let documents = query?.provider().open().await?;
            Ok(documents
                .and_then(|document| async move { decode::<T>(document) })
                .boxed())
        })
    }

    /// Whether the query produces any document.
    fn any(self) -> BoxFuture<'static, IncludeResult<bool>> {
        let query = self.into_queryable();
        Box::pin(async move { Ok(!query?.run(vec![QueryOp::Any]).await?.is_empty()) })
    }

    /// Whether any document matches `predicate`.
    fn any_where(self, predicate: Document) -> BoxFuture<'static, IncludeResult<bool>> {
        let query = self.into_queryable();
        Box::pin(async move {
            let ops = with_filter(Some(predicate), QueryOp::Any);
            Ok(!query?.run(ops).await?.is_empty())
        })
    }

    /// The first result; fails when there is none.
    fn first(self) -> BoxFuture<'static, IncludeResult<T>> {
        let query = self.into_queryable();
        Box::pin(async move { first_of(query, None).await?.ok_or(IncludeError::NoElements) })
    }

    /// The first result matching `predicate`; fails when there is none.
    fn first_where(self, predicate: Document) -> BoxFuture<'static, IncludeResult<T>> {
        let query = self.into_queryable();
        Box::pin(async move {
            first_of(query, Some(predicate))
                .await?
                .ok_or(IncludeError::NoElements)
        })
    }

    /// The first result, if any.
    fn first_or_default(self) -> BoxFuture<'static, IncludeResult<Option<T>>> {
        let query = self.into_queryable();
        Box::pin(first_of(query, None))
    }

    /// The first result matching `predicate`, if any.
    fn first_or_default_where(
        self,
        predicate: Document,
    ) -> BoxFuture<'static, IncludeResult<Option<T>>> {
        let query = self.into_queryable();
        Box::pin(first_of(query, Some(predicate)))
    }

    /// The only result; fails when there is none or more than one.
    fn single(self) -> BoxFuture<'static, IncludeResult<T>> {
        let query = self.into_queryable();
        Box::pin(async move { single_of(query, None).await?.ok_or(IncludeError::NoElements) })
    }

    /// The only result matching `predicate`; fails when there is none or more than one.
    fn single_where(self, predicate: Document) -> BoxFuture<'static, IncludeResult<T>> {
        let query = self.into_queryable();
        Box::pin(async move {
            single_of(query, Some(predicate))
                .await?
                .ok_or(IncludeError::NoElements)
        })
    }

    /// The only result, if any; fails when there is more than one.
    fn single_or_default(self) -> BoxFuture<'static, IncludeResult<Option<T>>> {
        let query = self.into_queryable();
        Box::pin(single_of(query, None))
    }

    /// The only result matching `predicate`, if any; fails when there is more than one.
    fn single_or_default_where(
        self,
        predicate: Document,
    ) -> BoxFuture<'static, IncludeResult<Option<T>>> {
        let query = self.into_queryable();
        Box::pin(single_of(query, Some(predicate)))
    }

    /// Number of results.
    fn count(self) -> BoxFuture<'static, IncludeResult<i32>> {
        let query = self.into_queryable();
        Box::pin(async move { narrow(count_of(query, None).await?) })
    }

    /// Number of results matching `predicate`.
    fn count_where(self, predicate: Document) -> BoxFuture<'static, IncludeResult<i32>> {
        let query = self.into_queryable();
        Box::pin(async move { narrow(count_of(query, Some(predicate)).await?) })
    }

    /// Number of results, as a 64-bit integer.
    fn long_count(self) -> BoxFuture<'static, IncludeResult<i64>> {
        let query = self.into_queryable();
        Box::pin(count_of(query, None))
    }

    /// Number of results matching `predicate`, as a 64-bit integer.
    fn long_count_where(self, predicate: Document) -> BoxFuture<'static, IncludeResult<i64>> {
        let query = self.into_queryable();
        Box::pin(count_of(query, Some(predicate)))
    }

    /// Smallest value of `field`; `None` for an empty input.
    fn min<V>(self, field: &str) -> BoxFuture<'static, IncludeResult<Option<V>>>
    where
        V: DeserializeOwned + Send + 'static,
    {
        let query = self.into_queryable();
        Box::pin(extreme_of(query, QueryOp::Min(field.to_string())))
    }

    /// Largest value of `field`; `None` for an empty input.
    fn max<V>(self, field: &str) -> BoxFuture<'static, IncludeResult<Option<V>>>
    where
        V: DeserializeOwned + Send + 'static,
    {
        let query = self.into_queryable();
        Box::pin(extreme_of(query, QueryOp::Max(field.to_string())))
    }
}

impl<T, Q> AggregateQueryableExt<T> for Q
where
    T: DeserializeOwned + Send + 'static,
    Q: AggregateQuery<T>,
{
}

fn narrow(count: i64) -> IncludeResult<i32> {
    i32::try_from(count).map_err(|_| IncludeError::internal(format!("count {} overflows i32", count)))
}
