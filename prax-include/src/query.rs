//! Query expressions.
//!
//! A [`QueryExpr`] is the composed, immutable form of a standard query: the
//! collection it reads from plus an ordered list of [`QueryOp`]s. It renders
//! to aggregation stages and to the driver-facing plan text
//! (`aggregate([...])`) that the command extractor parses back.

use std::fmt;

use bson::{Bson, Document, doc};
use smol_str::SmolStr;

use crate::stages;

/// Name of the single field carrying a scalar aggregate result.
pub const RESULT_FIELD: &str = "_v";

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order.
    Ascending,
    /// Descending order.
    Descending,
}

impl SortDirection {
    fn value(self) -> i32 {
        match self {
            Self::Ascending => 1,
            Self::Descending => -1,
        }
    }
}

/// A single query operator.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOp {
    /// Keep documents matching a filter.
    Filter(Document),
    /// Start a new ordering.
    OrderBy {
        /// Sort field.
        field: String,
        /// Direction.
        direction: SortDirection,
    },
    /// Refine the current ordering.
    ThenBy {
        /// Sort field.
        field: String,
        /// Direction.
        direction: SortDirection,
    },
    /// Reshape each document with a projection.
    Select(Document),
    /// Flatten an array field and promote its elements to documents.
    SelectMany(String),
    /// Group documents by a key expression.
    GroupBy {
        /// Group key expression.
        key: Bson,
        /// Accumulator fields.
        accumulators: Document,
    },
    /// Inner join: one output document per matching pair.
    Join {
        /// Joined collection.
        from: String,
        /// Field on the source documents.
        local_field: String,
        /// Field on the joined documents.
        foreign_field: String,
        /// Output field.
        as_field: String,
    },
    /// Group join: matches collected into an array field.
    GroupJoin {
        /// Joined collection.
        from: String,
        /// Field on the source documents.
        local_field: String,
        /// Field on the joined documents.
        foreign_field: String,
        /// Output field.
        as_field: String,
    },
    /// Skip a number of documents.
    Skip(u64),
    /// Keep at most a number of documents.
    Take(u64),
    /// Remove duplicate documents.
    Distinct,
    /// Keep documents whose discriminator field has the given value.
    OfType {
        /// Discriminator field.
        field: String,
        /// Expected value.
        value: Bson,
    },
    /// First document.
    First,
    /// Only document; two are fetched so a second one can be detected.
    Single,
    /// Whether any document exists.
    Any,
    /// Number of documents.
    Count,
    /// Sum of a field.
    Sum(String),
    /// Average of a field.
    Average(String),
    /// Minimum of a field.
    Min(String),
    /// Maximum of a field.
    Max(String),
}

impl QueryOp {
    fn push_stages(&self, out: &mut Vec<Document>) {
        match self {
            Self::Filter(filter) => out.push(stages::match_stage(filter.clone())),
            Self::OrderBy { field, direction } | Self::ThenBy { field, direction } => {
                let mut sort = Document::new();
                sort.insert(field.as_str(), direction.value());
                out.push(stages::sort_stage(sort));
            }
            Self::Select(projection) => out.push(stages::project_stage(projection.clone())),
            Self::SelectMany(path) => {
                out.push(stages::unwind_stage(path, false));
                out.push(stages::replace_root_stage(stages::field_path(path)));
            }
            Self::GroupBy { key, accumulators } => {
                out.push(stages::group_stage(key.clone(), accumulators.clone()))
            }
            Self::Join {
                from,
                local_field,
                foreign_field,
                as_field,
            } => {
                out.push(stages::lookup_stage(from, local_field, foreign_field, as_field));
                out.push(stages::unwind_stage(as_field, false));
            }
            Self::GroupJoin {
                from,
                local_field,
                foreign_field,
                as_field,
            } => out.push(stages::lookup_stage(from, local_field, foreign_field, as_field)),
            Self::Skip(n) => out.push(stages::skip_stage(clamp(*n))),
            Self::Take(n) => out.push(stages::limit_stage(clamp(*n))),
            Self::Distinct => {
                out.push(stages::group_stage(Bson::String("$$ROOT".into()), Document::new()));
                out.push(stages::replace_root_stage("$_id"));
            }
            Self::OfType { field, value } => {
                let mut filter = Document::new();
                filter.insert(field.as_str(), value.clone());
                out.push(stages::match_stage(filter));
            }
            Self::First | Self::Any => out.push(stages::limit_stage(1)),
            Self::Single => out.push(stages::limit_stage(2)),
            Self::Count => scalar_result(out, stages::sum(1)),
            Self::Sum(field) => scalar_result(out, stages::sum(stages::field_path(field))),
            Self::Average(field) => scalar_result(out, stages::avg(stages::field_path(field))),
            Self::Min(field) => scalar_result(out, stages::min(stages::field_path(field))),
            Self::Max(field) => scalar_result(out, stages::max(stages::field_path(field))),
        }
    }
}

fn clamp(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn scalar_result(out: &mut Vec<Document>, accumulator: Document) {
    let mut fields = Document::new();
    fields.insert(RESULT_FIELD, accumulator);
    out.push(stages::group_stage(Bson::Null, fields));
    out.push(stages::project_stage(doc! { "_id": 0 }));
}

/// A composed standard query over one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryExpr {
    namespace: SmolStr,
    ops: Vec<QueryOp>,
}

impl QueryExpr {
    /// An expression reading every document of `namespace`.
    pub fn source(namespace: impl Into<SmolStr>) -> Self {
        Self {
            namespace: namespace.into(),
            ops: Vec::new(),
        }
    }

    /// A new expression with `op` appended.
    pub fn then(&self, op: QueryOp) -> Self {
        let mut next = self.clone();
        next.ops.push(op);
        next
    }

    /// The collection this expression reads from.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Operators in application order.
    pub fn ops(&self) -> &[QueryOp] {
        &self.ops
    }

    /// Check if no operator has been applied.
    pub fn is_source(&self) -> bool {
        self.ops.is_empty()
    }

    /// Translate to aggregation stages.
    ///
    /// An `OrderBy` followed by `ThenBy`s renders as a single `$sort`.
    pub fn stages(&self) -> Vec<Document> {
        let mut out = Vec::new();
        let mut sort: Option<Document> = None;

        for op in &self.ops {
            match op {
                QueryOp::ThenBy { field, direction } if sort.is_some() => {
                    if let Some(keys) = sort.as_mut() {
                        keys.insert(field.as_str(), direction.value());
                    }
                }
                QueryOp::OrderBy { field, direction } | QueryOp::ThenBy { field, direction } => {
                    flush_sort(&mut out, &mut sort);
                    let mut keys = Document::new();
                    keys.insert(field.as_str(), direction.value());
                    sort = Some(keys);
                }
                other => {
                    flush_sort(&mut out, &mut sort);
                    other.push_stages(&mut out);
                }
            }
        }
        flush_sort(&mut out, &mut sort);

        out
    }

    /// Render the driver-facing plan text, `aggregate([...])`, with every
    /// stage in canonical extended JSON.
    pub fn to_plan(&self) -> String {
        let stages: Vec<String> = self
            .stages()
            .into_iter()
            .map(|stage| Bson::Document(stage).into_canonical_extjson().to_string())
            .collect();
        format!("aggregate([{}])", stages.join(", "))
    }
}

fn flush_sort(out: &mut Vec<Document>, sort: &mut Option<Document>) {
    if let Some(keys) = sort.take() {
        out.push(stages::sort_stage(keys));
    }
}

impl fmt::Display for QueryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.to_plan())
    }
}
