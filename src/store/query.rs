//! Query - a filter, ordering and limit over one collection.
//!
//! Mappers hand queries to the store untouched; only a store evaluates them.

use std::cmp::Ordering;

use serde_json::Value;

use crate::record::Record;
use crate::reference::{CollectionRef, DocumentRef};

/// Comparison applied by a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    /// The field is an array containing the value.
    ArrayContains,
    /// The value is an array containing the field.
    In,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// A query built against a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    collection: CollectionRef,
    filters: Vec<Filter>,
    order_by: Vec<OrderBy>,
    limit: Option<usize>,
}

impl Query {
    pub fn new(collection: CollectionRef) -> Self {
        Self {
            collection,
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    /// Keep documents whose `field` (dot-separated for nested maps) satisfies `op value`.
    pub fn where_field(mut self, field: &str, op: FilterOp, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.to_string(),
            op,
            value: value.into(),
        });
        self
    }

    /// Sort by `field`. Documents without the field are left out.
    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by.push(OrderBy {
            field: field.to_string(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn collection(&self) -> &CollectionRef {
        &self.collection
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn orderings(&self) -> &[OrderBy] {
        &self.order_by
    }

    pub fn max_results(&self) -> Option<usize> {
        self.limit
    }

    /// Whether a stored record passes every filter and has every ordered field.
    pub fn matches(&self, record: &Record) -> bool {
        self.filters.iter().all(|f| filter_matches(f, record))
            && self
                .order_by
                .iter()
                .all(|o| field_value(record, &o.field).is_some())
    }

    /// Order two matching documents; ties fall back to document path.
    pub fn compare(&self, a: (&DocumentRef, &Record), b: (&DocumentRef, &Record)) -> Ordering {
        for order in &self.order_by {
            let ordering = match (field_value(a.1, &order.field), field_value(b.1, &order.field)) {
                (Some(x), Some(y)) => compare_values(x, y),
                _ => Ordering::Equal,
            };
            let ordering = match order.direction {
                Direction::Ascending => ordering,
                Direction::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        a.0.cmp(b.0)
    }
}

/// Look up a dot-separated field path.
pub(crate) fn field_value<'a>(record: &'a Record, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = record.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over stored values: by type, then by value within a type.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (xi, yi) in x.iter().zip(y) {
                let ordering = compare_values(xi, yi);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => compare_values(a, b) == Ordering::Equal,
        _ => a == b,
    }
}

/// Range comparisons only hold between values of the same type.
fn same_type_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    if type_rank(a) == type_rank(b) {
        Some(compare_values(a, b))
    } else {
        None
    }
}

fn filter_matches(filter: &Filter, record: &Record) -> bool {
    let value = match field_value(record, &filter.field) {
        Some(value) => value,
        None => return false,
    };
    let target = &filter.value;

    match filter.op {
        FilterOp::Eq => values_equal(value, target),
        FilterOp::NotEq => !value.is_null() && !values_equal(value, target),
        FilterOp::Lt => same_type_cmp(value, target) == Some(Ordering::Less),
        FilterOp::Le => matches!(
            same_type_cmp(value, target),
            Some(Ordering::Less | Ordering::Equal)
        ),
        FilterOp::Gt => same_type_cmp(value, target) == Some(Ordering::Greater),
        FilterOp::Ge => matches!(
            same_type_cmp(value, target),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        FilterOp::ArrayContains => value
            .as_array()
            .is_some_and(|items| items.iter().any(|item| values_equal(item, target))),
        FilterOp::In => target
            .as_array()
            .is_some_and(|options| options.iter().any(|option| values_equal(value, option))),
    }
}
