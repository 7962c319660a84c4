//! Keeps the fluent pipeline in step with the composed query expression.
//!
//! Every standard operator produces a new [`QueryExpr`]. The provider asks
//! its context's extractor for the stages of the whole expression, compares
//! them with the stages it mirrored last time and applies the difference to
//! the pipeline: stages that changed (for example a `$sort` that a `then_by`
//! extended) are popped off the tail, and the new ones are pushed. Stages
//! appended directly, such as the `$lookup`s of an include, are never part
//! of the expression and stay where they were inserted.

use std::future::Future;
use std::sync::Arc;

use bson::Document;
use futures::TryStreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::context::IncludeContext;
use crate::error::{IncludeError, IncludeResult};
use crate::pipeline::AggregatePipeline;
use crate::query::QueryExpr;
use crate::source::DocumentStream;
use crate::stages;

/// Owns the fluent pipeline behind an aggregate queryable.
#[derive(Debug, Clone)]
pub struct AggregateQueryProvider {
    context: Arc<IncludeContext>,
    pipeline: AggregatePipeline<Document>,
    synced: Vec<Document>,
    detached: bool,
    cancellation: Option<CancellationToken>,
}

impl AggregateQueryProvider {
    pub(crate) fn new<T>(context: Arc<IncludeContext>, pipeline: AggregatePipeline<T>) -> Self {
        Self {
            context,
            pipeline: pipeline.as_type(),
            synced: Vec::new(),
            detached: false,
            cancellation: None,
        }
    }

    /// The context used for resolution and stage extraction.
    pub fn context(&self) -> &Arc<IncludeContext> {
        &self.context
    }

    /// The pipeline assembled so far.
    pub fn stages(&self) -> &[Document] {
        self.pipeline.stages()
    }

    /// A copy of the pipeline assembled so far.
    pub fn pipeline<T>(&self) -> AggregatePipeline<T> {
        self.pipeline.clone().as_type()
    }

    /// Mirror the stages of `expression` onto the pipeline.
    pub(crate) fn sync(&mut self, expression: &QueryExpr) -> IncludeResult<()> {
        let current = self.context.extractor().extract(expression)?;
        let common = self
            .synced
            .iter()
            .zip(&current)
            .take_while(|(old, new)| old == new)
            .count();

        let stale = &self.synced[common..];
        if !stale.is_empty() {
            let appended = self.pipeline.stages();
            if !appended.ends_with(stale) {
                return Err(IncludeError::internal(
                    "pipeline no longer ends with the stages of the previous query",
                ));
            }
            let keep = appended.len() - stale.len();
            self.pipeline.truncate(keep);
        }

        for stage in &current[common..] {
            trace!(stage = ?stages::stage_name(stage), "appending query stage");
            self.pipeline.push_stage(stage.clone());
        }
        self.synced = current;
        self.detached = false;
        Ok(())
    }

    /// Whether stages were appended directly since the last sync.
    pub(crate) fn has_detached_stages(&self) -> bool {
        self.detached
    }

    /// Append a stage that has no counterpart in the query expression.
    pub(crate) fn append_stage(&mut self, stage: Document) {
        trace!(stage = ?stages::stage_name(&stage), "appending pipeline stage");
        self.pipeline.push_stage(stage);
        self.detached = true;
    }

    pub(crate) fn set_cancellation(&mut self, token: CancellationToken) {
        self.cancellation = Some(token);
    }

    /// Open a cursor over the pipeline.
    pub(crate) async fn open(&self) -> IncludeResult<DocumentStream> {
        debug!(
            namespace = %self.pipeline.source().namespace(),
            stages = self.pipeline.len(),
            "executing aggregate query"
        );
        cancellable(self.cancellation.clone(), self.pipeline.documents()).await
    }

    /// Run the pipeline and collect every result document.
    pub(crate) async fn documents(&self) -> IncludeResult<Vec<Document>> {
        cancellable(self.cancellation.clone(), async {
            self.open().await?.try_collect().await
        })
        .await
    }
}

/// Run `future` unless `token` is cancelled first.
pub(crate) async fn cancellable<F, R>(token: Option<CancellationToken>, future: F) -> IncludeResult<R>
where
    F: Future<Output = IncludeResult<R>>,
{
    let Some(token) = token else {
        return future.await;
    };
    if token.is_cancelled() {
        return Err(IncludeError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = token.cancelled() => {
            debug!("aggregate query cancelled");
            Err(IncludeError::Cancelled)
        }
        result = future => result,
    }
}
