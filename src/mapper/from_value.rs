use chrono::NaiveDate;

use crate::{error::QueryError, expr::Value, metadata::ValueType};

/// Typed extraction of a single cell.
pub trait FromValue: Sized {
    /// Column types this Rust type can be read from.
    fn accepts(ty: ValueType) -> bool;

    fn from_value(v: &Value) -> Result<Self, QueryError>;
}

fn mismatch<T>(target: &str, v: &Value) -> Result<T, QueryError> {
    QueryError::ProjectionMismatch(format!("cannot read {v} as {target}")).err()
}

impl FromValue for Value {
    fn accepts(_: ValueType) -> bool { true }
    fn from_value(v: &Value) -> Result<Self, QueryError> { Ok(v.clone()) }
}

impl FromValue for String {
    fn accepts(ty: ValueType) -> bool { ty == ValueType::Text }
    fn from_value(v: &Value) -> Result<Self, QueryError> {
        match v {
            Value::Text(s) => Ok(s.clone()),
            other => mismatch("String", other),
        }
    }
}

impl FromValue for i64 {
    fn accepts(ty: ValueType) -> bool { ty == ValueType::Int }
    fn from_value(v: &Value) -> Result<Self, QueryError> {
        match v {
            Value::Int(i) => Ok(*i),
            other => mismatch("i64", other),
        }
    }
}

impl FromValue for i32 {
    fn accepts(ty: ValueType) -> bool { ty == ValueType::Int }
    fn from_value(v: &Value) -> Result<Self, QueryError> {
        match v {
            Value::Int(i) => i32::try_from(*i).or_else(|_| mismatch("i32", v)),
            other => mismatch("i32", other),
        }
    }
}

impl FromValue for f64 {
    fn accepts(ty: ValueType) -> bool { ty.is_numeric() }
    fn from_value(v: &Value) -> Result<Self, QueryError> {
        match v.as_f64() {
            Some(f) => Ok(f),
            None => mismatch("f64", v),
        }
    }
}

impl FromValue for bool {
    fn accepts(ty: ValueType) -> bool { ty == ValueType::Bool }
    fn from_value(v: &Value) -> Result<Self, QueryError> {
        match v {
            Value::Bool(b) => Ok(*b),
            other => mismatch("bool", other),
        }
    }
}

impl FromValue for NaiveDate {
    fn accepts(ty: ValueType) -> bool { ty == ValueType::Date }
    fn from_value(v: &Value) -> Result<Self, QueryError> {
        match v {
            Value::Date(d) => Ok(*d),
            other => mismatch("NaiveDate", other),
        }
    }
}

/// Null reads as `None`.
impl<T: FromValue> FromValue for Option<T> {
    fn accepts(ty: ValueType) -> bool { T::accepts(ty) }
    fn from_value(v: &Value) -> Result<Self, QueryError> {
        match v {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}
