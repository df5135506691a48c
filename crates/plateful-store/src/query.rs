//! Collection queries: filters, ordering and limits
//!
//! Only single-value predicates are supported. There is deliberately no
//! "field is any of N values" operator; callers that need it fan out one
//! query per value.

use crate::document::Document;
use serde_json::Value;
use std::cmp::Ordering;

/// Comparison operator of a [`Filter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// Field equals value
    Eq,
    /// Field is less than value
    Lt,
    /// Field is less than or equal to value
    Lte,
    /// Field is greater than value
    Gt,
    /// Field is greater than or equal to value
    Gte,
    /// Array field contains value
    ArrayContains,
}

/// A single predicate on one field
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Field name
    pub field: String,
    /// Operator
    pub op: FilterOp,
    /// Operand
    pub value: Value,
}

impl Filter {
    /// Create a filter
    #[inline]
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// `field == value`
    #[inline]
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }

    /// `field < value`
    #[inline]
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Lt, value)
    }

    /// `field <= value`
    #[inline]
    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Lte, value)
    }

    /// `field > value`
    #[inline]
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Gt, value)
    }

    /// `field >= value`
    #[inline]
    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Gte, value)
    }

    /// `value in field` for array fields
    #[inline]
    pub fn array_contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::ArrayContains, value)
    }

    /// Evaluate against a document. Missing fields never match.
    #[must_use]
    pub fn matches(&self, doc: &Document) -> bool {
        let Some(actual) = doc.get(&self.field) else {
            return false;
        };
        match self.op {
            FilterOp::ArrayContains => doc.array_contains(&self.field, &self.value),
            FilterOp::Eq => {
                compare_values(actual, &self.value) == Some(Ordering::Equal)
                    || actual == &self.value
            }
            FilterOp::Lt => compare_values(actual, &self.value) == Some(Ordering::Less),
            FilterOp::Lte => matches!(
                compare_values(actual, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FilterOp::Gt => compare_values(actual, &self.value) == Some(Ordering::Greater),
            FilterOp::Gte => matches!(
                compare_values(actual, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Smallest first
    #[default]
    Ascending,
    /// Largest first
    Descending,
}

/// Result ordering
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderBy {
    /// Order by a field value; documents without the field are excluded
    Field(String, Direction),
    /// Order by server-assigned creation time
    CreateTime(Direction),
}

/// A query over one collection
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Collection name
    pub collection: String,
    /// Conjunction of filters
    pub filters: Vec<Filter>,
    /// Optional ordering
    pub order_by: Option<OrderBy>,
    /// Optional result cap
    pub limit: Option<usize>,
}

impl Query {
    /// Query every document of `collection`
    #[inline]
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    /// Add a filter
    #[inline]
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Set ordering
    #[inline]
    #[must_use]
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by = Some(order);
        self
    }

    /// Cap the number of results
    #[inline]
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check whether a document satisfies every filter and the ordering field
    #[must_use]
    pub fn matches(&self, doc: &Document) -> bool {
        if let Some(OrderBy::Field(field, _)) = &self.order_by {
            if doc.get(field).is_none() {
                return false;
            }
        }
        self.filters.iter().all(|f| f.matches(doc))
    }

    /// Filter, order and truncate a candidate set
    #[must_use]
    pub fn evaluate(&self, candidates: impl IntoIterator<Item = Document>) -> Vec<Document> {
        let mut docs: Vec<Document> = candidates.into_iter().filter(|d| self.matches(d)).collect();

        match &self.order_by {
            Some(OrderBy::Field(field, direction)) => {
                docs.sort_by(|a, b| {
                    let ord = match (a.get(field), b.get(field)) {
                        (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
                        _ => Ordering::Equal,
                    };
                    apply_direction(ord, *direction).then_with(|| a.id.cmp(&b.id))
                });
            }
            Some(OrderBy::CreateTime(direction)) => {
                docs.sort_by(|a, b| {
                    apply_direction(a.create_time.cmp(&b.create_time), *direction)
                        .then_with(|| a.id.cmp(&b.id))
                });
            }
            None => docs.sort_by(|a, b| a.id.cmp(&b.id)),
        }

        if let Some(limit) = self.limit {
            docs.truncate(limit);
        }
        docs
    }
}

fn apply_direction(ord: Ordering, direction: Direction) -> Ordering {
    match direction {
        Direction::Ascending => ord,
        Direction::Descending => ord.reverse(),
    }
}

/// Compare two scalar JSON values of the same kind
///
/// Numbers compare numerically, strings lexicographically by code point,
/// booleans `false < true`. Mixed kinds are incomparable.
#[must_use]
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn doc(id: &str, fields: Value) -> Document {
        let now = Utc::now();
        Document {
            id: id.to_string(),
            fields: fields.as_object().cloned().unwrap(),
            create_time: now,
            update_time: now,
            version: 1,
        }
    }

    #[test]
    fn equality_is_numeric_across_representations() {
        let d = doc("a", json!({ "price": 2 }));
        assert!(Filter::equals("price", 2.0).matches(&d));
        assert!(!Filter::equals("price", 3).matches(&d));
    }

    #[test]
    fn range_filters_emulate_prefix_search() {
        let q = Query::collection("users")
            .filter(Filter::gte("searchName", "jo"))
            .filter(Filter::lt("searchName", "jo\u{f8ff}"))
            .order_by(OrderBy::Field("searchName".into(), Direction::Ascending));

        let out = q.evaluate(vec![
            doc("1", json!({ "searchName": "john smith" })),
            doc("2", json!({ "searchName": "jane doe" })),
            doc("3", json!({ "searchName": "joan arc" })),
            doc("4", json!({ "other": true })),
        ]);
        let ids: Vec<_> = out.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1"]);
    }

    #[test]
    fn array_contains_and_limit() {
        let q = Query::collection("users")
            .filter(Filter::array_contains("likedRestaurants", "r1"))
            .limit(1);
        let out = q.evaluate(vec![
            doc("a", json!({ "likedRestaurants": ["r1"] })),
            doc("b", json!({ "likedRestaurants": ["r1", "r2"] })),
            doc("c", json!({ "likedRestaurants": [] })),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "a");
    }

    #[test]
    fn mixed_kinds_do_not_compare() {
        assert_eq!(compare_values(&json!(1), &json!("1")), None);
        assert!(!Filter::gt("price", "1").matches(&doc("x", json!({ "price": 2 }))));
    }
}
