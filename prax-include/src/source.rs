//! The driver seam: anything that can run an aggregation pipeline.

use async_trait::async_trait;
use bson::Document;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use mongodb::Collection;
use mongodb::options::AggregateOptions;
use tracing::debug;

use crate::error::{IncludeError, IncludeResult};

/// Stream of raw result documents.
pub type DocumentStream = BoxStream<'static, IncludeResult<Document>>;

/// A collection-like target that executes aggregation pipelines.
#[async_trait]
pub trait AggregateSource: Send + Sync {
    /// Name of the collection pipelines run against.
    fn namespace(&self) -> &str;

    /// Run `pipeline` and stream the resulting documents.
    async fn aggregate(
        &self,
        pipeline: Vec<Document>,
        options: Option<AggregateOptions>,
    ) -> IncludeResult<DocumentStream>;
}

#[async_trait]
impl<T> AggregateSource for Collection<T>
where
    T: Send + Sync,
{
    fn namespace(&self) -> &str {
        self.name()
    }

    async fn aggregate(
        &self,
        pipeline: Vec<Document>,
        options: Option<AggregateOptions>,
    ) -> IncludeResult<DocumentStream> {
        debug!(
            collection = %self.name(),
            stages = pipeline.len(),
            "running aggregation pipeline"
        );
        let cursor = Collection::aggregate(self, pipeline, options).await?;
        Ok(cursor.map_err(IncludeError::from).boxed())
    }
}
