//! Shared fixtures for the integration tests.
//!
//! [`MemoryDatabase`] holds named collections of documents and hands out
//! [`MemoryCollection`]s that evaluate the aggregation stages this crate
//! emits, so include chains can be checked end to end without a server.

#![allow(dead_code)]

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bson::{Bson, Document, doc};
use futures::StreamExt;
use mongodb::options::AggregateOptions;
use parking_lot::{Mutex, RwLock};
use prax_include::numeric::decimal_from_bson;
use prax_include::{AggregateSource, DocumentStream, IncludeError, IncludeResult};
use rust_decimal::Decimal;

pub mod model;

/// In-memory collections keyed by name.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    collections: Arc<RwLock<HashMap<String, Vec<Document>>>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append documents to a collection, creating it if needed.
    pub fn insert(&self, collection: &str, documents: impl IntoIterator<Item = Document>) {
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .extend(documents);
    }

    /// All documents of a collection.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .read()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// A handle that runs pipelines against `name`.
    pub fn collection(&self, name: &str) -> Arc<MemoryCollection> {
        Arc::new(MemoryCollection {
            name: name.to_string(),
            database: self.clone(),
            executed: Mutex::new(Vec::new()),
            hang: false,
        })
    }

    /// A handle whose pipelines never complete.
    pub fn hanging_collection(&self, name: &str) -> Arc<MemoryCollection> {
        Arc::new(MemoryCollection {
            name: name.to_string(),
            database: self.clone(),
            executed: Mutex::new(Vec::new()),
            hang: true,
        })
    }
}

/// A collection that evaluates pipelines in memory.
#[derive(Debug)]
pub struct MemoryCollection {
    name: String,
    database: MemoryDatabase,
    executed: Mutex<Vec<Vec<Document>>>,
    hang: bool,
}

impl MemoryCollection {
    /// Every pipeline run so far.
    pub fn executed(&self) -> Vec<Vec<Document>> {
        self.executed.lock().clone()
    }
}

#[async_trait]
impl AggregateSource for MemoryCollection {
    fn namespace(&self) -> &str {
        &self.name
    }

    async fn aggregate(
        &self,
        pipeline: Vec<Document>,
        _options: Option<AggregateOptions>,
    ) -> IncludeResult<DocumentStream> {
        self.executed.lock().push(pipeline.clone());
        if self.hang {
            futures::future::pending::<()>().await;
        }
        let input = self.database.documents(&self.name);
        let output = run_pipeline(&self.database, input, &pipeline)?;
        Ok(futures::stream::iter(output.into_iter().map(Ok)).boxed())
    }
}

fn unsupported(what: impl std::fmt::Display) -> IncludeError {
    IncludeError::internal(format!("memory source does not support {}", what))
}

/// Evaluate `pipeline` over `input`.
pub fn run_pipeline(
    database: &MemoryDatabase,
    mut documents: Vec<Document>,
    pipeline: &[Document],
) -> IncludeResult<Vec<Document>> {
    for stage in pipeline {
        let (name, spec) = stage
            .iter()
            .next()
            .ok_or_else(|| unsupported("an empty stage"))?;
        documents = match (name.as_str(), spec) {
            ("$match", Bson::Document(filter)) => documents
                .into_iter()
                .filter(|document| matches(document, filter))
                .collect(),
            ("$sort", Bson::Document(keys)) => sort(documents, keys),
            ("$skip", n) => documents.into_iter().skip(as_count(n)?).collect(),
            ("$limit", n) => documents.into_iter().take(as_count(n)?).collect(),
            ("$lookup", Bson::Document(spec)) => lookup(database, documents, spec)?,
            ("$addFields", Bson::Document(fields)) => documents
                .into_iter()
                .map(|document| add_fields(document, fields))
                .collect(),
            ("$project", Bson::Document(projection)) => documents
                .into_iter()
                .map(|document| project(document, projection))
                .collect(),
            ("$group", Bson::Document(spec)) => group(documents, spec)?,
            ("$unwind", spec) => unwind(documents, spec)?,
            ("$replaceRoot", Bson::Document(spec)) => {
                let root = spec.get("newRoot").ok_or_else(|| unsupported("$replaceRoot"))?;
                documents
                    .iter()
                    .map(|document| match evaluate(document, root) {
                        Some(Bson::Document(new_root)) => Ok(new_root),
                        other => Err(unsupported(format!("newRoot {:?}", other))),
                    })
                    .collect::<IncludeResult<_>>()?
            }
            (other, _) => return Err(unsupported(other)),
        };
    }
    Ok(documents)
}

fn as_count(value: &Bson) -> IncludeResult<usize> {
    match value {
        Bson::Int32(n) => Ok(*n as usize),
        Bson::Int64(n) => Ok(*n as usize),
        other => Err(unsupported(format!("count {:?}", other))),
    }
}

// Paths

/// Values found at a dotted path; arrays along the way are traversed.
fn values_at(value: &Bson, path: &[&str]) -> Vec<Bson> {
    match (value, path.split_first()) {
        (value, None) => vec![value.clone()],
        (Bson::Document(document), Some((head, rest))) => match document.get(*head) {
            Some(inner) => values_at(inner, rest),
            None => Vec::new(),
        },
        (Bson::Array(items), Some(_)) => items
            .iter()
            .flat_map(|item| values_at(item, path))
            .collect(),
        _ => Vec::new(),
    }
}

/// The single value at a dotted path, if any.
pub fn get_path(document: &Document, path: &str) -> Option<Bson> {
    let parts: Vec<&str> = path.split('.').collect();
    let mut current = document;
    for (index, part) in parts.iter().enumerate() {
        let value = current.get(*part)?;
        if index == parts.len() - 1 {
            return Some(value.clone());
        }
        current = value.as_document()?;
    }
    None
}

fn set_path(document: &mut Document, path: &str, value: Bson) {
    match path.split_once('.') {
        None => {
            document.insert(path, value);
        }
        Some((head, rest)) => {
            if !matches!(document.get(head), Some(Bson::Document(_))) {
                document.insert(head, Document::new());
            }
            if let Some(Bson::Document(inner)) = document.get_mut(head) {
                set_path(inner, rest, value);
            }
        }
    }
}

fn remove_path(document: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            document.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Bson::Document(inner)) = document.get_mut(head) {
                remove_path(inner, rest);
            }
        }
    }
}

/// Candidate values for matching: the value itself, plus array elements.
fn match_candidates(document: &Document, path: &str) -> Vec<Bson> {
    let parts: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    for value in values_at(&Bson::Document(document.clone()), &parts) {
        if let Bson::Array(items) = &value {
            out.extend(items.iter().cloned());
        }
        out.push(value);
    }
    out
}

// Expressions

fn evaluate(document: &Document, expression: &Bson) -> Option<Bson> {
    match expression {
        Bson::String(s) if s == "$$ROOT" => Some(Bson::Document(document.clone())),
        Bson::String(s) if s.starts_with('$') => get_path(document, &s[1..]),
        Bson::Document(operator) if operator.keys().next().is_some_and(|k| k.starts_with('$')) => {
            let (name, args) = operator.iter().next()?;
            match (name.as_str(), args) {
                ("$arrayElemAt", Bson::Array(args)) if args.len() == 2 => {
                    let array = evaluate(document, &args[0])?;
                    let index = match &args[1] {
                        Bson::Int32(n) => *n as usize,
                        Bson::Int64(n) => *n as usize,
                        _ => return None,
                    };
                    match array {
                        Bson::Array(items) => items.get(index).cloned(),
                        _ => None,
                    }
                }
                _ => None,
            }
        }
        Bson::Document(fields) => {
            let mut out = Document::new();
            for (key, value) in fields {
                if let Some(value) = evaluate(document, value) {
                    out.insert(key.clone(), value);
                }
            }
            Some(Bson::Document(out))
        }
        literal => Some(literal.clone()),
    }
}

// Comparison

fn number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        Bson::Decimal128(_) => decimal_from_bson(value)
            .ok()
            .and_then(|d| d.to_string().parse().ok()),
        _ => None,
    }
}

fn type_rank(value: &Bson) -> u8 {
    match value {
        Bson::Null | Bson::Undefined => 1,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 2,
        Bson::String(_) => 3,
        Bson::Document(_) => 4,
        Bson::Array(_) => 5,
        Bson::ObjectId(_) => 7,
        Bson::Boolean(_) => 8,
        Bson::DateTime(_) => 9,
        _ => 10,
    }
}

/// Total order loosely following the server's cross-type ordering.
pub fn compare(a: &Bson, b: &Bson) -> Ordering {
    if let (Some(x), Some(y)) = (number(a), number(b)) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn equals(a: &Bson, b: &Bson) -> bool {
    match (number(a), number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

// $match

fn matches(document: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, condition)| match key.as_str() {
        "$and" => clauses(condition).iter().all(|c| matches(document, c)),
        "$or" => clauses(condition).iter().any(|c| matches(document, c)),
        path => field_matches(document, path, condition),
    })
}

fn clauses(condition: &Bson) -> Vec<Document> {
    match condition {
        Bson::Array(items) => items
            .iter()
            .filter_map(|item| item.as_document().cloned())
            .collect(),
        _ => Vec::new(),
    }
}

fn field_matches(document: &Document, path: &str, condition: &Bson) -> bool {
    let candidates = match_candidates(document, path);
    let missing = candidates.is_empty();
    match condition {
        Bson::Document(ops) if ops.keys().next().is_some_and(|k| k.starts_with('$')) => {
            ops.iter().all(|(op, operand)| match op.as_str() {
                "$eq" => eq_matches(&candidates, operand),
                "$ne" => !eq_matches(&candidates, operand),
                "$gt" => candidates.iter().any(|c| same_kind(c, operand) && compare(c, operand).is_gt()),
                "$gte" => candidates.iter().any(|c| same_kind(c, operand) && compare(c, operand).is_ge()),
                "$lt" => candidates.iter().any(|c| same_kind(c, operand) && compare(c, operand).is_lt()),
                "$lte" => candidates.iter().any(|c| same_kind(c, operand) && compare(c, operand).is_le()),
                "$in" => clauses_values(operand).iter().any(|v| eq_matches(&candidates, v)),
                "$nin" => !clauses_values(operand).iter().any(|v| eq_matches(&candidates, v)),
                "$exists" => operand.as_bool().unwrap_or(true) != missing,
                "$elemMatch" => candidates.iter().any(|c| match (c, operand) {
                    (Bson::Document(element), Bson::Document(filter)) => matches(element, filter),
                    _ => false,
                }),
                _ => false,
            })
        }
        value => eq_matches(&candidates, value),
    }
}

fn eq_matches(candidates: &[Bson], value: &Bson) -> bool {
    if matches!(value, Bson::Null) && candidates.is_empty() {
        return true;
    }
    candidates.iter().any(|candidate| equals(candidate, value))
}

fn same_kind(a: &Bson, b: &Bson) -> bool {
    type_rank(a) == type_rank(b)
}

fn clauses_values(operand: &Bson) -> Vec<Bson> {
    match operand {
        Bson::Array(items) => items.clone(),
        _ => Vec::new(),
    }
}

// $sort

fn sort(mut documents: Vec<Document>, keys: &Document) -> Vec<Document> {
    documents.sort_by(|a, b| {
        for (field, direction) in keys {
            let descending = matches!(direction, Bson::Int32(-1) | Bson::Int64(-1))
                || matches!(direction, Bson::Double(d) if *d < 0.0);
            let x = get_path(a, field).unwrap_or(Bson::Null);
            let y = get_path(b, field).unwrap_or(Bson::Null);
            let ordering = compare(&x, &y);
            let ordering = if descending { ordering.reverse() } else { ordering };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
    documents
}

// $lookup

fn lookup(
    database: &MemoryDatabase,
    documents: Vec<Document>,
    spec: &Document,
) -> IncludeResult<Vec<Document>> {
    let text = |key: &str| {
        spec.get_str(key)
            .map(str::to_string)
            .map_err(|_| unsupported(format!("$lookup without {}", key)))
    };
    let from = text("from")?;
    let local_field = text("localField")?;
    let foreign_field = text("foreignField")?;
    let as_field = text("as")?;

    let foreign = database.documents(&from);
    Ok(documents
        .into_iter()
        .map(|mut document| {
            let mut locals = match_candidates(&document, &local_field);
            if locals.is_empty() {
                locals.push(Bson::Null);
            }
            let joined: Vec<Bson> = foreign
                .iter()
                .filter(|candidate| locals.iter().any(|local| eq_matches(&match_candidates(candidate, &foreign_field), local)))
                .cloned()
                .map(Bson::Document)
                .collect();
            set_path(&mut document, &as_field, Bson::Array(joined));
            document
        })
        .collect())
}

// $addFields / $project

fn add_fields(mut document: Document, fields: &Document) -> Document {
    let source = document.clone();
    for (path, expression) in fields {
        match evaluate(&source, expression) {
            Some(value) => set_path(&mut document, path, value),
            None => remove_path(&mut document, path),
        }
    }
    document
}

fn is_exclusion(projection: &Document) -> bool {
    projection.iter().all(|(_, value)| {
        matches!(value, Bson::Int32(0) | Bson::Int64(0) | Bson::Boolean(false))
    })
}

fn project(document: Document, projection: &Document) -> Document {
    if is_exclusion(projection) {
        let mut document = document;
        for (path, _) in projection {
            remove_path(&mut document, path);
        }
        return document;
    }

    let mut out = Document::new();
    let keep_id = !matches!(
        projection.get("_id"),
        Some(Bson::Int32(0) | Bson::Int64(0) | Bson::Boolean(false))
    );
    if keep_id {
        if let Some(id) = document.get("_id") {
            out.insert("_id", id.clone());
        }
    }
    for (path, value) in projection {
        if path == "_id" && !matches!(value, Bson::String(_) | Bson::Document(_)) {
            continue;
        }
        match value {
            Bson::Int32(0) | Bson::Int64(0) | Bson::Boolean(false) => {}
            Bson::Int32(_) | Bson::Int64(_) | Bson::Boolean(true) => {
                if let Some(found) = get_path(&document, path) {
                    set_path(&mut out, path, found);
                }
            }
            expression => {
                if let Some(found) = evaluate(&document, expression) {
                    set_path(&mut out, path, found);
                }
            }
        }
    }
    out
}

// $group

enum Accumulator {
    Sum(Vec<Bson>),
    Avg(Vec<Bson>),
    Min(Option<Bson>),
    Max(Option<Bson>),
    Push(Vec<Bson>),
}

impl Accumulator {
    fn new(name: &str) -> IncludeResult<Self> {
        Ok(match name {
            "$sum" => Self::Sum(Vec::new()),
            "$avg" => Self::Avg(Vec::new()),
            "$min" => Self::Min(None),
            "$max" => Self::Max(None),
            "$push" => Self::Push(Vec::new()),
            other => return Err(unsupported(other)),
        })
    }

    fn add(&mut self, value: Option<Bson>) {
        let value = value.filter(|v| !matches!(v, Bson::Null));
        match (self, value) {
            (Self::Sum(values) | Self::Avg(values), Some(v)) if number(&v).is_some() => values.push(v),
            (Self::Min(current), Some(v)) => {
                if current.as_ref().is_none_or(|c| compare(&v, c).is_lt()) {
                    *current = Some(v);
                }
            }
            (Self::Max(current), Some(v)) => {
                if current.as_ref().is_none_or(|c| compare(&v, c).is_gt()) {
                    *current = Some(v);
                }
            }
            (Self::Push(values), Some(v)) => values.push(v),
            _ => {}
        }
    }

    fn finish(self) -> Bson {
        match self {
            Self::Sum(values) => sum_values(&values),
            Self::Avg(values) if values.is_empty() => Bson::Null,
            Self::Avg(values) => {
                if values.iter().any(|v| matches!(v, Bson::Decimal128(_))) {
                    let total: Decimal = values.iter().filter_map(|v| decimal_from_bson(v).ok()).sum();
                    decimal_bson(total / Decimal::from(values.len()))
                } else {
                    let total: f64 = values.iter().filter_map(number).sum();
                    Bson::Double(total / values.len() as f64)
                }
            }
            Self::Min(value) | Self::Max(value) => value.unwrap_or(Bson::Null),
            Self::Push(values) => Bson::Array(values),
        }
    }
}

fn decimal_bson(value: Decimal) -> Bson {
    Bson::try_from(serde_json::json!({ "$numberDecimal": value.normalize().to_string() }))
        .unwrap_or(Bson::Null)
}

fn sum_values(values: &[Bson]) -> Bson {
    if values.iter().any(|v| matches!(v, Bson::Decimal128(_))) {
        let total: Decimal = values.iter().filter_map(|v| decimal_from_bson(v).ok()).sum();
        return decimal_bson(total);
    }
    if values.iter().any(|v| matches!(v, Bson::Double(_))) {
        return Bson::Double(values.iter().filter_map(number).sum());
    }
    let total: i64 = values
        .iter()
        .map(|v| match v {
            Bson::Int32(n) => i64::from(*n),
            Bson::Int64(n) => *n,
            _ => 0,
        })
        .sum();
    let all_int32 = values.iter().all(|v| matches!(v, Bson::Int32(_)));
    match i32::try_from(total) {
        Ok(small) if all_int32 => Bson::Int32(small),
        _ => Bson::Int64(total),
    }
}

fn group(documents: Vec<Document>, spec: &Document) -> IncludeResult<Vec<Document>> {
    let key_expression = spec.get("_id").cloned().unwrap_or(Bson::Null);
    let mut groups: Vec<(Bson, Vec<(String, Accumulator, Bson)>)> = Vec::new();

    for document in &documents {
        let key = evaluate(document, &key_expression).unwrap_or(Bson::Null);
        let index = match groups.iter().position(|(existing, _)| *existing == key) {
            Some(index) => index,
            None => {
                let mut accumulators = Vec::new();
                for (field, definition) in spec.iter().filter(|(k, _)| k.as_str() != "_id") {
                    let (name, argument) = definition
                        .as_document()
                        .and_then(|d| d.iter().next())
                        .ok_or_else(|| unsupported(format!("accumulator {}", field)))?;
                    accumulators.push((field.clone(), Accumulator::new(name)?, argument.clone()));
                }
                groups.push((key, accumulators));
                groups.len() - 1
            }
        };
        for (_, accumulator, argument) in groups[index].1.iter_mut() {
            accumulator.add(evaluate(document, argument));
        }
    }

    Ok(groups
        .into_iter()
        .map(|(key, accumulators)| {
            let mut out = doc! { "_id": key };
            for (field, accumulator, _) in accumulators {
                out.insert(field, accumulator.finish());
            }
            out
        })
        .collect())
}

// $unwind

fn unwind(documents: Vec<Document>, spec: &Bson) -> IncludeResult<Vec<Document>> {
    let (path, preserve) = match spec {
        Bson::String(path) => (path.clone(), false),
        Bson::Document(spec) => (
            spec.get_str("path")
                .map_err(|_| unsupported("$unwind without path"))?
                .to_string(),
            spec.get_bool("preserveNullAndEmptyArrays").unwrap_or(false),
        ),
        other => return Err(unsupported(format!("$unwind {:?}", other))),
    };
    let path = path.trim_start_matches('$').to_string();

    let mut out = Vec::new();
    for document in documents {
        match get_path(&document, &path) {
            Some(Bson::Array(items)) if !items.is_empty() => {
                for item in items {
                    let mut copy = document.clone();
                    set_path(&mut copy, &path, item);
                    out.push(copy);
                }
            }
            Some(Bson::Array(_)) | Some(Bson::Null) | None => {
                if preserve {
                    out.push(document);
                }
            }
            Some(_) => out.push(document),
        }
    }
    Ok(out)
}
