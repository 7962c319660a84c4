//! Aggregation stage builders.

use bson::{Bson, Document, doc};

/// Prefix a field name with `$` to make a field path expression.
pub fn field_path(field: &str) -> String {
    format!("${}", field)
}

/// Join a parent path and a field name with a dot. An empty parent yields the field.
pub fn dotted(parent: &str, field: &str) -> String {
    if parent.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", parent, field)
    }
}

/// Create a $match stage.
pub fn match_stage(filter: Document) -> Document {
    doc! { "$match": filter }
}

/// Create a $project stage.
pub fn project_stage(projection: Document) -> Document {
    doc! { "$project": projection }
}

/// Create a $project stage removing a single field.
pub fn exclude_stage(field: &str) -> Document {
    let mut projection = Document::new();
    projection.insert(field, 0);
    project_stage(projection)
}

/// Create a $group stage.
pub fn group_stage(id: Bson, accumulators: Document) -> Document {
    let mut stage = doc! { "_id": id };
    stage.extend(accumulators);
    doc! { "$group": stage }
}

/// Create a $sort stage.
pub fn sort_stage(sort: Document) -> Document {
    doc! { "$sort": sort }
}

/// Create a $limit stage.
pub fn limit_stage(limit: i64) -> Document {
    doc! { "$limit": limit }
}

/// Create a $skip stage.
pub fn skip_stage(skip: i64) -> Document {
    doc! { "$skip": skip }
}

/// Create a $lookup stage (left outer join into an array field).
pub fn lookup_stage(from: &str, local_field: &str, foreign_field: &str, as_field: &str) -> Document {
    doc! {
        "$lookup": {
            "from": from,
            "localField": local_field,
            "foreignField": foreign_field,
            "as": as_field
        }
    }
}

/// Create a $unwind stage.
pub fn unwind_stage(path: &str, preserve_null_and_empty: bool) -> Document {
    doc! {
        "$unwind": {
            "path": field_path(path),
            "preserveNullAndEmptyArrays": preserve_null_and_empty
        }
    }
}

/// Create a $addFields stage.
pub fn add_fields_stage(fields: Document) -> Document {
    doc! { "$addFields": fields }
}

/// Create a $addFields stage setting `field` to the first element of the array at `array_field`.
pub fn first_element_stage(field: &str, array_field: &str) -> Document {
    let mut fields = Document::new();
    fields.insert(field, doc! { "$arrayElemAt": [field_path(array_field), 0] });
    add_fields_stage(fields)
}

/// Create a $match stage keeping documents whose array `field` has an element matching `predicate`.
pub fn elem_match_stage(field: &str, predicate: Document) -> Document {
    let mut filter = Document::new();
    filter.insert(field, doc! { "$elemMatch": predicate });
    match_stage(filter)
}

/// Create a $replaceRoot stage.
pub fn replace_root_stage(new_root: impl Into<Bson>) -> Document {
    doc! { "$replaceRoot": { "newRoot": new_root.into() } }
}

/// Accumulator: $sum
pub fn sum(expression: impl Into<Bson>) -> Document {
    doc! { "$sum": expression.into() }
}

/// Accumulator: $avg
pub fn avg(expression: impl Into<Bson>) -> Document {
    doc! { "$avg": expression.into() }
}

/// Accumulator: $min
pub fn min(expression: impl Into<Bson>) -> Document {
    doc! { "$min": expression.into() }
}

/// Accumulator: $max
pub fn max(expression: impl Into<Bson>) -> Document {
    doc! { "$max": expression.into() }
}

/// Name of the first operator key of a stage, such as `$lookup`.
pub fn stage_name(stage: &Document) -> Option<&str> {
    stage.keys().next().map(String::as_str)
}
