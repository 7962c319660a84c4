//! Recovering pipeline stages from a composed query.
//!
//! The aggregate provider mirrors every standard operator onto its fluent
//! pipeline. To do so it needs the stages an expression translates to, which
//! a [`StageExtractor`] supplies.
//!
//! [`CommandExtractor`] goes through the driver-facing plan text: it renders
//! `aggregate([...])`, captures the bracketed stage list and parses each
//! stage back from extended JSON. [`StructuredExtractor`] skips the text and
//! translates the expression directly.

use std::sync::LazyLock;

use bson::{Bson, Document};
use regex_lite::Regex;
use tracing::trace;

use crate::error::{IncludeError, IncludeResult};
use crate::query::QueryExpr;

/// Produces the aggregation stages a query expression translates to.
pub trait StageExtractor: Send + Sync {
    /// Extract the stages of `query`, in order.
    fn extract(&self, query: &QueryExpr) -> IncludeResult<Vec<Document>>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

static PLAN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^aggregate\((?P<commands>.+)\)$").expect("plan pattern is valid")
});

/// Extracts stages by parsing the rendered plan text.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandExtractor;

impl CommandExtractor {
    /// Parse the stages out of plan text of the form `aggregate([...])`.
    pub fn extract_from_plan(plan: &str) -> IncludeResult<Vec<Document>> {
        let captures = PLAN_PATTERN.captures(plan.trim()).ok_or_else(|| {
            IncludeError::extraction(format!("unrecognized query plan: {}", plan))
        })?;
        let commands = captures
            .name("commands")
            .map(|m| m.as_str())
            .unwrap_or_default();

        let values: Vec<serde_json::Value> = serde_json::from_str(commands)
            .map_err(|e| IncludeError::extraction(format!("malformed stage list: {}", e)))?;

        values
            .into_iter()
            .map(|value| match Bson::try_from(value) {
                Ok(Bson::Document(stage)) => Ok(stage),
                Ok(other) => Err(IncludeError::extraction(format!(
                    "stage is not a document: {}",
                    other
                ))),
                Err(e) => Err(IncludeError::extraction(format!("invalid extended JSON: {}", e))),
            })
            .collect()
    }
}

impl StageExtractor for CommandExtractor {
    fn extract(&self, query: &QueryExpr) -> IncludeResult<Vec<Document>> {
        let plan = query.to_plan();
        trace!(plan = %plan, "extracting stages from query plan");
        Self::extract_from_plan(&plan)
    }

    fn name(&self) -> &'static str {
        "command"
    }
}

/// Extracts stages by translating the expression directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredExtractor;

impl StageExtractor for StructuredExtractor {
    fn extract(&self, query: &QueryExpr) -> IncludeResult<Vec<Document>> {
        Ok(query.stages())
    }

    fn name(&self) -> &'static str {
        "structured"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{QueryOp, SortDirection};
    use bson::{doc, oid::ObjectId};
    use pretty_assertions::assert_eq;

    fn sample() -> QueryExpr {
        QueryExpr::source("posts")
            .then(QueryOp::Filter(doc! {
                "BlogId": ObjectId::parse_str("65a1b2c3d4e5f60718293a4b").unwrap(),
                "Rating": { "$gte": 2.5 },
            }))
            .then(QueryOp::OrderBy {
                field: "Title".into(),
                direction: SortDirection::Ascending,
            })
            .then(QueryOp::ThenBy {
                field: "Rating".into(),
                direction: SortDirection::Descending,
            })
            .then(QueryOp::Skip(1))
            .then(QueryOp::Take(10))
    }

    #[test]
    fn test_command_matches_structured() {
        let query = sample();
        let command = CommandExtractor.extract(&query).unwrap();
        let structured = StructuredExtractor.extract(&query).unwrap();
        assert_eq!(command, structured);
    }

    #[test]
    fn test_sort_key_order_preserved() {
        let stages = CommandExtractor.extract(&sample()).unwrap();
        let sort = stages[1].get_document("$sort").unwrap();
        let keys: Vec<&str> = sort.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Title", "Rating"]);
    }

    #[test]
    fn test_empty_pipeline() {
        assert!(CommandExtractor::extract_from_plan("aggregate([])").unwrap().is_empty());
    }

    #[test]
    fn test_unrecognized_plan() {
        let err = CommandExtractor::extract_from_plan("find({})").unwrap_err();
        assert!(matches!(err, IncludeError::Extraction(_)));

        let err = CommandExtractor::extract_from_plan("aggregate([1, 2])").unwrap_err();
        assert!(matches!(err, IncludeError::Extraction(_)));

        let err = CommandExtractor::extract_from_plan("aggregate([{)").unwrap_err();
        assert!(matches!(err, IncludeError::Extraction(_)));
    }
}
