//! Documents and single-document field updates
//!
//! A document is a schema-flexible map of JSON fields plus metadata the
//! store assigns (timestamps and a version used for optimistic concurrency).

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Field map of a document
pub type Fields = serde_json::Map<String, Value>;

/// A stored document with server-assigned metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    /// Document ID within its collection
    pub id: String,
    /// Field values
    pub fields: Fields,
    /// Server-assigned creation time (strictly increasing per store)
    pub create_time: DateTime<Utc>,
    /// Server-assigned time of the last write
    pub update_time: DateTime<Utc>,
    /// Write version; changes on every write to this document
    pub version: u64,
}

impl Document {
    /// Get a raw field value
    #[inline]
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Check whether an array field contains `value`
    #[must_use]
    pub fn array_contains(&self, field: &str, value: &Value) -> bool {
        self.fields
            .get(field)
            .and_then(Value::as_array)
            .is_some_and(|items| items.contains(value))
    }
}

/// An atomic modification of one field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    /// Overwrite the field
    Set(String, Value),
    /// Add each value not already present (set semantics)
    ArrayUnion(String, Vec<Value>),
    /// Remove every element equal to one of the values
    ArrayRemove(String, Vec<Value>),
    /// Add a signed delta to a numeric field (missing counts as 0)
    Increment(String, i64),
    /// Remove the field
    Delete(String),
}

impl FieldUpdate {
    /// Overwrite `field` with `value`
    #[inline]
    pub fn set(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Set(field.into(), value.into())
    }

    /// Union `values` into the array at `field`
    pub fn array_union<V: Into<Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::ArrayUnion(field.into(), values.into_iter().map(Into::into).collect())
    }

    /// Remove `values` from the array at `field`
    pub fn array_remove<V: Into<Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::ArrayRemove(field.into(), values.into_iter().map(Into::into).collect())
    }

    /// Increment the number at `field`
    #[inline]
    pub fn increment(field: impl Into<String>, delta: i64) -> Self {
        Self::Increment(field.into(), delta)
    }

    /// Delete `field`
    #[inline]
    pub fn delete(field: impl Into<String>) -> Self {
        Self::Delete(field.into())
    }

    /// Name of the field this update touches
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Set(f, _)
            | Self::ArrayUnion(f, _)
            | Self::ArrayRemove(f, _)
            | Self::Increment(f, _)
            | Self::Delete(f) => f,
        }
    }

    /// Apply this update to a field map
    pub fn apply(&self, fields: &mut Fields) {
        match self {
            Self::Set(field, value) => {
                fields.insert(field.clone(), value.clone());
            }
            Self::ArrayUnion(field, values) => with_array(fields, field, |items| {
                for value in values {
                    if !items.contains(value) {
                        items.push(value.clone());
                    }
                }
            }),
            Self::ArrayRemove(field, values) => with_array(fields, field, |items| {
                items.retain(|item| !values.contains(item));
            }),
            Self::Increment(field, delta) => {
                let next = match fields.get(field) {
                    Some(Value::Number(n)) => match n.as_i64() {
                        Some(current) => Value::from(current.saturating_add(*delta)),
                        #[allow(clippy::cast_precision_loss)]
                        None => Value::from(n.as_f64().unwrap_or(0.0) + *delta as f64),
                    },
                    _ => Value::from(*delta),
                };
                fields.insert(field.clone(), next);
            }
            Self::Delete(field) => {
                fields.remove(field);
            }
        }
    }
}

/// Edit the array at `field`; a missing or non-array value starts as `[]`
fn with_array(fields: &mut Fields, field: &str, edit: impl FnOnce(&mut Vec<Value>)) {
    let mut items = match fields.remove(field) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };
    edit(&mut items);
    fields.insert(field.to_string(), Value::Array(items));
}

/// Shallow merge of `source` into `target` (top-level keys overwrite)
pub fn merge_fields(target: &mut Fields, source: Fields) {
    for (key, value) in source {
        target.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn array_union_is_idempotent() {
        let mut f = fields(json!({ "following": ["bob"] }));
        let update = FieldUpdate::array_union("following", ["bob", "carol"]);
        update.apply(&mut f);
        update.apply(&mut f);
        assert_eq!(f["following"], json!(["bob", "carol"]));
    }

    #[test]
    fn array_remove_missing_value_is_noop() {
        let mut f = fields(json!({ "following": ["bob"] }));
        FieldUpdate::array_remove("following", ["zed"]).apply(&mut f);
        assert_eq!(f["following"], json!(["bob"]));
    }

    #[test]
    fn array_ops_on_missing_field_create_empty_array() {
        let mut f = Fields::new();
        FieldUpdate::array_remove("likedReviews", ["r1"]).apply(&mut f);
        assert_eq!(f["likedReviews"], json!([]));

        let mut g = fields(json!({ "likedReviews": "garbage" }));
        FieldUpdate::array_union("likedReviews", ["r1"]).apply(&mut g);
        assert_eq!(g["likedReviews"], json!(["r1"]));
    }

    #[test]
    fn increment_treats_missing_as_zero() {
        let mut f = Fields::new();
        FieldUpdate::increment("likeCount", 2).apply(&mut f);
        FieldUpdate::increment("likeCount", -1).apply(&mut f);
        assert_eq!(f["likeCount"], json!(1));
    }

    #[test]
    fn delete_and_merge() {
        let mut f = fields(json!({ "a": 1, "b": 2 }));
        FieldUpdate::delete("a").apply(&mut f);
        merge_fields(&mut f, fields(json!({ "b": 3, "c": 4 })));
        assert_eq!(Value::Object(f), json!({ "b": 3, "c": 4 }));
    }

    #[test]
    fn update_reports_its_field() {
        assert_eq!(FieldUpdate::increment("likeCount", 1).field(), "likeCount");
        assert_eq!(FieldUpdate::delete("bio").field(), "bio");
    }
}
