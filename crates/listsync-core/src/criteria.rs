//! Filter criteria: predicate, ordering and limit for a list query.
//!
//! Ordering compares wire-form values with a total order so that every
//! gateway implementation and the store agree on record positions.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::entity::Document;
use crate::error::{CoreError, Result};

/// Equality predicate. All entries must match (AND).
pub type Predicate = BTreeMap<String, Value>;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    /// The opposite direction.
    pub fn flip(self) -> Self {
        match self {
            Direction::Ascending => Direction::Descending,
            Direction::Descending => Direction::Ascending,
        }
    }
}

/// A field to order by.
///
/// Parses the backend convention where a leading `-` means descending:
/// `"-created_date"` is newest first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderKey {
    pub field: String,
    pub direction: Direction,
}

impl OrderKey {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Ascending,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Descending,
        }
    }

    /// Parse `"field"` or `"-field"`.
    pub fn parse(s: &str) -> Result<Self> {
        let (field, direction) = match s.strip_prefix('-') {
            Some(rest) => (rest, Direction::Descending),
            None => (s, Direction::Ascending),
        };
        if field.is_empty() || field.starts_with('-') {
            return Err(CoreError::InvalidOrderKey(s.to_string()));
        }
        Ok(Self {
            field: field.to_string(),
            direction,
        })
    }

    /// Compare two documents on this key, honouring the direction.
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let null = Value::Null;
        let va = a.get(&self.field).unwrap_or(&null);
        let vb = b.get(&self.field).unwrap_or(&null);
        self.compare_values(va, vb)
    }

    /// Compare two field values, honouring the direction.
    pub fn compare_values(&self, a: &Value, b: &Value) -> Ordering {
        let ord = compare_values(a, b);
        match self.direction {
            Direction::Ascending => ord,
            Direction::Descending => ord.reverse(),
        }
    }

    /// The same field in the opposite direction.
    pub fn reversed(&self) -> Self {
        Self {
            field: self.field.clone(),
            direction: self.direction.flip(),
        }
    }
}

impl FromStr for OrderKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Direction::Ascending => write!(f, "{}", self.field),
            Direction::Descending => write!(f, "-{}", self.field),
        }
    }
}

/// Total order over JSON values.
///
/// null < bool < number < string < array < object. Numbers compare
/// numerically, strings lexicographically, arrays element-wise.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => {
                let x = x.as_f64().unwrap_or(f64::NAN);
                let y = y.as_f64().unwrap_or(f64::NAN);
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (ex, ey) in x.iter().zip(y.iter()) {
                let ord = compare_values(ex, ey);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(x), Value::Object(y)) => x.len().cmp(&y.len()),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Whether a document satisfies every predicate entry.
pub fn matches_predicate(predicate: &Predicate, document: &Document) -> bool {
    predicate
        .iter()
        .all(|(field, expected)| match document.get(field) {
            Some(actual) => values_equal(actual, expected),
            None => expected.is_null(),
        })
}

/// Equality that treats `1` and `1.0` as the same number.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => compare_values(a, b) == Ordering::Equal,
        _ => a == b,
    }
}

/// What a store asks the gateway for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    /// Equality predicate. Empty means "every record" (gateway `list`).
    pub predicate: Predicate,
    /// Server-side ordering.
    pub order: Option<OrderKey>,
    /// Maximum number of records returned.
    pub limit: Option<usize>,
    /// Reverse the returned page before display.
    ///
    /// Chat feeds fetch the newest N records (`-created_date`, limit N) and
    /// display them oldest first.
    pub reverse: bool,
}

impl Criteria {
    /// Criteria matching every record, unordered.
    pub fn all() -> Self {
        Self::default()
    }

    /// Add an equality match.
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicate.insert(field.into(), value.into());
        self
    }

    /// Set the ordering.
    pub fn order_by(mut self, order: OrderKey) -> Self {
        self.order = Some(order);
        self
    }

    /// Cap the number of records.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Reverse the fetched page for display.
    pub fn reversed(mut self) -> Self {
        self.reverse = true;
        self
    }

    /// Whether the gateway `list` call suffices.
    pub fn is_unfiltered(&self) -> bool {
        self.predicate.is_empty()
    }

    /// The ordering of the records as displayed, after `reverse`.
    pub fn display_order(&self) -> Option<OrderKey> {
        self.order.as_ref().map(|order| {
            if self.reverse {
                order.reversed()
            } else {
                order.clone()
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_parse_order_key() {
        let key = OrderKey::parse("-created_date").unwrap();
        assert_eq!(key.field, "created_date");
        assert_eq!(key.direction, Direction::Descending);
        assert_eq!(key.to_string(), "-created_date");

        let key: OrderKey = "price".parse().unwrap();
        assert_eq!(key, OrderKey::ascending("price"));
    }

    #[test]
    fn test_parse_order_key_rejects_empty() {
        assert!(OrderKey::parse("").is_err());
        assert!(OrderKey::parse("-").is_err());
        assert!(OrderKey::parse("--x").is_err());
    }

    #[test]
    fn test_compare_documents() {
        let a = doc(json!({ "price": 3 }));
        let b = doc(json!({ "price": 10.5 }));
        let missing = doc(json!({}));

        assert_eq!(OrderKey::ascending("price").compare(&a, &b), Ordering::Less);
        assert_eq!(OrderKey::descending("price").compare(&a, &b), Ordering::Greater);
        assert_eq!(
            OrderKey::ascending("price").compare(&missing, &a),
            Ordering::Less
        );
    }

    #[test]
    fn test_cross_type_rank() {
        assert_eq!(compare_values(&json!(null), &json!(false)), Ordering::Less);
        assert_eq!(compare_values(&json!(true), &json!(0)), Ordering::Less);
        assert_eq!(compare_values(&json!(99), &json!("a")), Ordering::Less);
        assert_eq!(compare_values(&json!("z"), &json!([])), Ordering::Less);
    }

    #[test]
    fn test_predicate_matching() {
        let document = doc(json!({ "circle_id": "c1", "qty": 2, "note": null }));

        let criteria = Criteria::all().where_eq("circle_id", "c1").where_eq("qty", 2.0);
        assert!(matches_predicate(&criteria.predicate, &document));

        let criteria = Criteria::all().where_eq("circle_id", "c2");
        assert!(!matches_predicate(&criteria.predicate, &document));

        let criteria = Criteria::all().where_eq("absent", Value::Null);
        assert!(matches_predicate(&criteria.predicate, &document));
    }

    #[test]
    fn test_display_order_follows_reverse() {
        let criteria = Criteria::all()
            .order_by(OrderKey::descending("created_date"))
            .limit(50)
            .reversed();
        assert_eq!(
            criteria.display_order(),
            Some(OrderKey::ascending("created_date"))
        );
        assert!(criteria.is_unfiltered());
    }

    proptest! {
        #[test]
        fn test_integer_order_matches_native(a in any::<i64>(), b in any::<i64>()) {
            prop_assert_eq!(compare_values(&json!(a), &json!(b)), a.cmp(&b));
        }

        #[test]
        fn test_string_order_matches_native(a in ".{0,12}", b in ".{0,12}") {
            prop_assert_eq!(compare_values(&json!(a.clone()), &json!(b.clone())), a.cmp(&b));
        }
    }
}
