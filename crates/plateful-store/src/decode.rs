//! Schema-with-defaults document decoding
//!
//! Documents are schema-flexible, so a typed record is extracted field by
//! field. A field that is missing or has the wrong type falls back to a
//! default, and its name is recorded in [`Decoded::defaulted`] so callers
//! and tests can see exactly how partial a document was.

use crate::document::Document;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeSet;

/// A decoded record plus the fields that fell back to defaults
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    /// The typed record
    pub value: T,
    /// Names of fields that were missing or mistyped
    pub defaulted: Vec<String>,
}

impl<T> Decoded<T> {
    /// True when no field fell back to a default
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.defaulted.is_empty()
    }

    /// Check whether a specific field fell back to its default
    #[must_use]
    pub fn defaulted(&self, field: &str) -> bool {
        self.defaulted.iter().any(|f| f == field)
    }

    /// Discard the report
    #[inline]
    pub fn into_value(self) -> T {
        self.value
    }
}

/// Types that can be decoded from a stored document
pub trait FromDocument: Sized {
    /// Decode, tolerating missing or mistyped fields
    fn from_document(doc: &Document) -> Decoded<Self>;
}

/// Field-by-field reader that records every fallback
///
/// Required accessors (`string`, `u32_or`, ...) record a field when it is
/// missing or mistyped. Optional accessors (`opt_*`) treat a missing or
/// `null` field as a legitimate `None` and only record mistyped values.
#[derive(Debug)]
pub struct FieldReader<'a> {
    doc: &'a Document,
    defaulted: Vec<String>,
}

impl<'a> FieldReader<'a> {
    /// Start reading a document
    #[inline]
    #[must_use]
    pub fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            defaulted: Vec::new(),
        }
    }

    fn fallback<T>(&mut self, field: &str, default: T) -> T {
        self.defaulted.push(field.to_string());
        default
    }

    fn present(&self, field: &str) -> Option<&'a Value> {
        self.doc.get(field).filter(|v| !v.is_null())
    }

    /// Required string; defaults to empty
    pub fn string(&mut self, field: &str) -> String {
        match self.present(field) {
            Some(Value::String(s)) => s.clone(),
            _ => self.fallback(field, String::new()),
        }
    }

    /// Optional string
    pub fn opt_string(&mut self, field: &str) -> Option<String> {
        match self.present(field) {
            None => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => self.fallback(field, None),
        }
    }

    fn integer(&self, field: &str) -> Option<Option<i64>> {
        self.present(field).map(|v| match v {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0)
                    .map(|f| f as i64)
            }),
            _ => None,
        })
    }

    /// Required non-negative integer that fits in `u32`
    pub fn u32_or(&mut self, field: &str, default: u32) -> u32 {
        match self.integer(field).flatten().map(u32::try_from) {
            Some(Ok(n)) => n,
            _ => self.fallback(field, default),
        }
    }

    /// Required non-negative integer that fits in `u8`
    pub fn u8_or(&mut self, field: &str, default: u8) -> u8 {
        match self.integer(field).flatten().map(u8::try_from) {
            Some(Ok(n)) => n,
            _ => self.fallback(field, default),
        }
    }

    /// Required non-negative counter
    pub fn u64_or(&mut self, field: &str, default: u64) -> u64 {
        match self.integer(field).flatten().map(u64::try_from) {
            Some(Ok(n)) => n,
            _ => self.fallback(field, default),
        }
    }

    /// Optional float
    pub fn opt_f64(&mut self, field: &str) -> Option<f64> {
        match self.present(field) {
            None => None,
            Some(Value::Number(n)) => n.as_f64(),
            Some(_) => self.fallback(field, None),
        }
    }

    /// Array of strings as an ordered list; non-string elements are skipped
    pub fn string_vec(&mut self, field: &str) -> Vec<String> {
        match self.present(field) {
            Some(Value::Array(items)) => {
                let out: Vec<String> = items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect();
                if out.len() != items.len() {
                    self.defaulted.push(field.to_string());
                }
                out
            }
            _ => self.fallback(field, Vec::new()),
        }
    }

    /// Array of strings as a set
    pub fn string_set(&mut self, field: &str) -> BTreeSet<String> {
        self.string_vec(field).into_iter().collect()
    }

    /// Optional RFC 3339 timestamp
    pub fn opt_timestamp(&mut self, field: &str) -> Option<DateTime<Utc>> {
        match self.present(field) {
            None => None,
            Some(v) => match v.as_str().and_then(parse_timestamp) {
                Some(ts) => Some(ts),
                None => self.fallback(field, None),
            },
        }
    }

    /// Record `field` as defaulted after a semantic check failed
    pub fn reject(&mut self, field: &str) {
        self.defaulted.push(field.to_string());
    }

    /// Finish reading and attach the fallback report
    #[must_use]
    pub fn finish<T>(self, value: T) -> Decoded<T> {
        Decoded {
            value,
            defaulted: self.defaulted,
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(fields: Value) -> Document {
        let now = Utc::now();
        Document {
            id: "d1".into(),
            fields: fields.as_object().cloned().unwrap(),
            create_time: now,
            update_time: now,
            version: 1,
        }
    }

    #[test]
    fn complete_document_has_no_fallbacks() {
        let d = doc(json!({
            "name": "Joe's",
            "level": 3,
            "tags": ["a", "b"],
            "visitedAt": "2024-05-01T12:00:00Z",
        }));
        let mut r = FieldReader::new(&d);
        let name = r.string("name");
        let level = r.u32_or("level", 1);
        let tags = r.string_vec("tags");
        let visited = r.opt_timestamp("visitedAt");
        let decoded = r.finish((name, level, tags, visited));

        assert!(decoded.is_complete());
        assert_eq!(decoded.value.1, 3);
        assert!(decoded.value.3.is_some());
    }

    #[test]
    fn missing_and_mistyped_fields_are_reported() {
        let d = doc(json!({ "level": "high", "likeCount": -2, "bio": 7 }));
        let mut r = FieldReader::new(&d);
        let name = r.string("name");
        let level = r.u32_or("level", 1);
        let likes = r.u64_or("likeCount", 0);
        let bio = r.opt_string("bio");
        let missing_optional = r.opt_string("postalCode");
        let decoded = r.finish(());

        assert_eq!(name, "");
        assert_eq!(level, 1);
        assert_eq!(likes, 0);
        assert_eq!(bio, None);
        assert_eq!(missing_optional, None);
        assert_eq!(decoded.defaulted, vec!["name", "level", "likeCount", "bio"]);
        assert!(!decoded.defaulted("postalCode"));
    }

    #[test]
    fn whole_floats_are_accepted_as_integers() {
        let d = doc(json!({ "price": 2.0, "bad": 2.5 }));
        let mut r = FieldReader::new(&d);
        assert_eq!(r.u8_or("price", 1), 2);
        assert_eq!(r.u8_or("bad", 1), 1);
        assert_eq!(r.finish(()).defaulted, vec!["bad"]);
    }

    #[test]
    fn string_arrays_skip_foreign_elements() {
        let d = doc(json!({ "followers": ["a", 1, "b", "a"] }));
        let mut r = FieldReader::new(&d);
        let set = r.string_set("followers");
        assert_eq!(set.len(), 2);
        assert!(r.finish(()).defaulted("followers"));
    }

    #[test]
    fn null_counts_as_absent_for_optionals() {
        let d = doc(json!({ "bio": null }));
        let mut r = FieldReader::new(&d);
        assert_eq!(r.opt_string("bio"), None);
        assert!(r.finish(()).is_complete());
    }
}
