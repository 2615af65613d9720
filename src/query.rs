//! Query filters understood by the document store
//!
//! A query is a list of [`Filter`]s that are ANDed together. Each filter
//! targets either the store-assigned document id or a top-level field of the
//! stored JSON object.

use std::cmp::Ordering;

use serde_json::Value;

/// Most values a single membership (`In`) filter may carry.
pub const MAX_IN_VALUES: usize = 30;

/// Which part of a document a filter looks at.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldPath {
    /// The store-assigned identity (not part of the stored JSON)
    DocumentId,
    /// A top-level field of the stored JSON object
    Field(String),
}

impl FieldPath {
    pub fn field(name: impl Into<String>) -> Self {
        FieldPath::Field(name.into())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    Eq(Value),
    Lt(Value),
    Le(Value),
    Gt(Value),
    Ge(Value),
    /// Field value is one of the listed values
    In(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: FieldPath,
    pub op: FilterOp,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: FieldPath::field(field),
            op: FilterOp::Eq(value.into()),
        }
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: FieldPath::field(field),
            op: FilterOp::Lt(value.into()),
        }
    }

    pub fn le(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: FieldPath::field(field),
            op: FilterOp::Le(value.into()),
        }
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: FieldPath::field(field),
            op: FilterOp::Gt(value.into()),
        }
    }

    pub fn ge(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: FieldPath::field(field),
            op: FilterOp::Ge(value.into()),
        }
    }

    pub fn is_in(field: FieldPath, values: Vec<Value>) -> Self {
        Self {
            field,
            op: FilterOp::In(values),
        }
    }

    /// Returns true if the document with `id` and JSON `data` passes this filter.
    pub fn matches(&self, id: &str, data: &Value) -> bool {
        let id_value;
        let actual = match &self.field {
            FieldPath::DocumentId => {
                id_value = Value::String(id.to_string());
                Some(&id_value)
            }
            FieldPath::Field(name) => data.get(name),
        };

        let Some(actual) = actual else {
            return false;
        };

        match &self.op {
            FilterOp::Eq(expected) => values_equal(actual, expected),
            FilterOp::Lt(bound) => compare(actual, bound) == Some(Ordering::Less),
            FilterOp::Le(bound) => matches!(
                compare(actual, bound),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FilterOp::Gt(bound) => compare(actual, bound) == Some(Ordering::Greater),
            FilterOp::Ge(bound) => matches!(
                compare(actual, bound),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOp::In(candidates) => candidates.iter().any(|c| values_equal(actual, c)),
        }
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Orders two scalars of the same kind; mixed kinds are incomparable.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Checks backend constraints on a filter list before it is executed.
pub fn validate(filters: &[Filter]) -> Result<(), String> {
    for filter in filters {
        if let FilterOp::In(values) = &filter.op {
            if values.is_empty() {
                return Err("membership filter requires at least one value".to_string());
            }
            if values.len() > MAX_IN_VALUES {
                return Err(format!(
                    "membership filter accepts at most {} values, got {}",
                    MAX_IN_VALUES,
                    values.len()
                ));
            }
        }
    }
    Ok(())
}
