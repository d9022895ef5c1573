use std::{cmp::Ordering, fmt};

use chrono::NaiveDate;
use ordered_float::NotNan;
use serde::{Deserialize, Serialize};

use crate::metadata::ValueType;

/// A bound parameter or a result cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(NotNan<f64>),
    Text(String),
    Date(NaiveDate),
}

impl Value {
    /// NaN has no SQL representation and becomes `Null`.
    pub fn float(f: f64) -> Value {
        NotNan::new(f).map(Value::Float).unwrap_or(Value::Null)
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::Text(_) => ValueType::Text,
            Value::Date(_) => ValueType::Date,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(f.into_inner()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// SQL ordering between two non-null values of comparable types.
    /// `None` when either side is null or the types do not compare.
    pub fn sql_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (a, b) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        }
    }

    /// Storage form. Dates are ISO-8601 strings.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::Number((*i).into()),
            Value::Float(f) => serde_json::Number::from_f64(f.into_inner())
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
        }
    }

    /// Reads a stored cell back using the declared column type.
    /// Cells that do not fit the declared type come back as `None`.
    pub fn from_json(v: &serde_json::Value, ty: ValueType) -> Option<Value> {
        use serde_json::Value as J;
        match (v, ty) {
            (J::Null, _) => Some(Value::Null),
            (J::Bool(b), ValueType::Bool) => Some(Value::Bool(*b)),
            (J::Number(n), ValueType::Int) => n.as_i64().map(Value::Int),
            (J::Number(n), ValueType::Float) => n.as_f64().map(Value::float),
            (J::String(s), ValueType::Text) => Some(Value::Text(s.clone())),
            (J::String(s), ValueType::Date) => NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(Value::Date),
            (J::String(s), ValueType::Int) => s.parse().ok().map(Value::Int),
            (_, ValueType::Null) => Self::infer_json(v),
            _ => None,
        }
    }

    fn infer_json(v: &serde_json::Value) -> Option<Value> {
        match ValueType::of_json(v) {
            ValueType::Null => Some(Value::Null),
            ty => Self::from_json(v, ty),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "'{s}'"),
            Value::Date(d) => write!(f, "date '{d}'"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self { Value::Bool(v) }
}
impl From<i32> for Value {
    fn from(v: i32) -> Self { Value::Int(v as i64) }
}
impl From<i64> for Value {
    fn from(v: i64) -> Self { Value::Int(v) }
}
impl From<f64> for Value {
    fn from(v: f64) -> Self { Value::float(v) }
}
impl From<&str> for Value {
    fn from(v: &str) -> Self { Value::Text(v.to_string()) }
}
impl From<String> for Value {
    fn from(v: String) -> Self { Value::Text(v) }
}
impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self { Value::Date(v) }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
