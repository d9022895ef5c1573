use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse type of a column, literal or expression.
///
/// `Int` and `Float` form the numeric family and compare with each other.
/// `Null` is the type of an untyped null literal and is compatible with
/// every other type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Untyped null
    #[default]
    Null,
    /// Boolean
    Bool,
    /// 64-bit integer
    Int,
    /// Double precision float
    Float,
    /// Character data
    Text,
    /// Calendar date
    Date,
}

impl ValueType {
    /// Classify a stored JSON cell. Strings stay `Text`; the column's declared
    /// type decides whether they are read back as dates.
    pub fn of_json(v: &serde_json::Value) -> ValueType {
        use serde_json::Value;
        match v {
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Bool,
            Value::Number(n) => {
                if n.is_i64() || n.is_u64() {
                    ValueType::Int
                } else {
                    ValueType::Float
                }
            }
            Value::String(_) => ValueType::Text,
            Value::Array(_) | Value::Object(_) => ValueType::Null,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ValueType::Int | ValueType::Float)
    }

    /// Types that support `<`, `>`, `min`, `max` and ordering.
    pub fn is_orderable(self) -> bool {
        matches!(self, ValueType::Int | ValueType::Float | ValueType::Text | ValueType::Date | ValueType::Null)
    }

    /// Whether values of both types may meet in a comparison, `IN` list or
    /// case branch.
    pub fn compatible(a: ValueType, b: ValueType) -> bool {
        a == b || a == ValueType::Null || b == ValueType::Null || (a.is_numeric() && b.is_numeric())
    }

    /// Whether a value of type `value` may be stored in a `column` cell
    /// without losing information. Only `Int` widens (to `Float`); nullability
    /// is the column's business.
    pub fn assignable(column: ValueType, value: ValueType) -> bool {
        column == value || value == ValueType::Null || (column == ValueType::Float && value == ValueType::Int)
    }

    /// Common representative of two compatible types.
    ///
    /// `Int` + `Float` -> `Float`; `Null` yields the other side.
    pub fn promote(a: ValueType, b: ValueType) -> ValueType {
        use ValueType::*;
        if a == b { return a; }
        match (a, b) {
            (Int, Float) | (Float, Int) => Float,
            (Null, y) => y,
            (x, _) => x,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Null => "Null",
            ValueType::Bool => "Bool",
            ValueType::Int => "Int",
            ValueType::Float => "Float",
            ValueType::Text => "Text",
            ValueType::Date => "Date",
        };
        f.write_str(name)
    }
}
