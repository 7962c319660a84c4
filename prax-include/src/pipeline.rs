//! Fluent aggregation pipelines.
//!
//! An [`AggregatePipeline`] is an ordered list of stages bound to a source
//! collection and an output type. Building is consuming and cheap; nothing
//! runs until [`AggregatePipeline::to_cursor`] or
//! [`AggregatePipeline::to_list`].
//!
//! ```rust,ignore
//! use prax_include::AggregatePipeline;
//! use bson::doc;
//!
//! let top = AggregatePipeline::<Post>::from_collection(&posts)
//!     .match_stage(doc! { "Rating": { "$gte": 4 } })
//!     .sort_stage(doc! { "Rating": -1 })
//!     .limit_stage(10)
//!     .to_list()
//!     .await?;
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use bson::{Bson, Document};
use futures::future;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use mongodb::Collection;
use mongodb::options::AggregateOptions;
use serde::de::DeserializeOwned;

use crate::error::{IncludeError, IncludeResult};
use crate::source::{AggregateSource, DocumentStream};
use crate::stages;

/// A typed aggregation pipeline over a source collection.
pub struct AggregatePipeline<T> {
    source: Arc<dyn AggregateSource>,
    options: Option<AggregateOptions>,
    stages: Vec<Document>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for AggregatePipeline<T> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            options: self.options.clone(),
            stages: self.stages.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for AggregatePipeline<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregatePipeline")
            .field("namespace", &self.source.namespace())
            .field("stages", &self.stages)
            .finish()
    }
}

impl<T> AggregatePipeline<T> {
    /// An empty pipeline over `source`.
    pub fn new(source: Arc<dyn AggregateSource>, options: Option<AggregateOptions>) -> Self {
        Self::from_parts(source, options, Vec::new())
    }

    pub(crate) fn from_parts(
        source: Arc<dyn AggregateSource>,
        options: Option<AggregateOptions>,
        stages: Vec<Document>,
    ) -> Self {
        Self {
            source,
            options,
            stages,
            _marker: PhantomData,
        }
    }

    /// An empty pipeline over a driver collection.
    pub fn from_collection<C>(collection: &Collection<C>) -> Self
    where
        C: Send + Sync + 'static,
    {
        Self::new(Arc::new(collection.clone()), None)
    }

    /// Replace the aggregate options.
    pub fn with_options(mut self, options: AggregateOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// The source collection.
    pub fn source(&self) -> &Arc<dyn AggregateSource> {
        &self.source
    }

    /// The aggregate options.
    pub fn options(&self) -> Option<&AggregateOptions> {
        self.options.as_ref()
    }

    /// Stages in execution order.
    pub fn stages(&self) -> &[Document] {
        &self.stages
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Check if the pipeline has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Reinterpret the output documents as `U`.
    pub fn as_type<U>(self) -> AggregatePipeline<U> {
        AggregatePipeline::from_parts(self.source, self.options, self.stages)
    }

    pub(crate) fn push_stage(&mut self, stage: Document) {
        self.stages.push(stage);
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.stages.truncate(len);
    }

    /// Add a raw stage.
    pub fn add_stage(mut self, stage: Document) -> Self {
        self.push_stage(stage);
        self
    }

    /// Add a $match stage.
    pub fn match_stage(self, filter: Document) -> Self {
        self.add_stage(stages::match_stage(filter))
    }

    /// Add a $project stage.
    pub fn project_stage(self, projection: Document) -> Self {
        self.add_stage(stages::project_stage(projection))
    }

    /// Add a $group stage.
    pub fn group_stage(self, id: impl Into<Bson>, accumulators: Document) -> Self {
        self.add_stage(stages::group_stage(id.into(), accumulators))
    }

    /// Add a $sort stage.
    pub fn sort_stage(self, sort: Document) -> Self {
        self.add_stage(stages::sort_stage(sort))
    }

    /// Add a $limit stage.
    pub fn limit_stage(self, limit: i64) -> Self {
        self.add_stage(stages::limit_stage(limit))
    }

    /// Add a $skip stage.
    pub fn skip_stage(self, skip: i64) -> Self {
        self.add_stage(stages::skip_stage(skip))
    }

    /// Add a $lookup stage.
    pub fn lookup_stage(
        self,
        from: &str,
        local_field: &str,
        foreign_field: &str,
        as_field: &str,
    ) -> Self {
        self.add_stage(stages::lookup_stage(from, local_field, foreign_field, as_field))
    }

    /// Add a $unwind stage.
    pub fn unwind_stage(self, path: &str, preserve_null_and_empty: bool) -> Self {
        self.add_stage(stages::unwind_stage(path, preserve_null_and_empty))
    }

    /// Add a $addFields stage.
    pub fn add_fields_stage(self, fields: Document) -> Self {
        self.add_stage(stages::add_fields_stage(fields))
    }

    /// Add a $replaceRoot stage.
    pub fn replace_root_stage(self, new_root: impl Into<Bson>) -> Self {
        self.add_stage(stages::replace_root_stage(new_root))
    }

    /// Run the pipeline and stream raw documents.
    pub async fn documents(&self) -> IncludeResult<DocumentStream> {
        self.source
            .aggregate(self.stages.clone(), self.options.clone())
            .await
    }
}

impl<T> AggregatePipeline<T>
where
    T: DeserializeOwned + Send + 'static,
{
    /// Run the pipeline and stream typed results.
    pub async fn to_cursor(&self) -> IncludeResult<BoxStream<'static, IncludeResult<T>>> {
        let documents = self.documents().await?;
        Ok(documents
            .and_then(|document| {
                future::ready(bson::from_document::<T>(document).map_err(IncludeError::from))
            })
            .boxed())
    }

    /// Run the pipeline and collect every typed result.
    pub async fn to_list(&self) -> IncludeResult<Vec<T>> {
        self.to_cursor().await?.try_collect().await
    }
}
