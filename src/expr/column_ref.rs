use std::fmt;

use crate::metadata::ValueType;

/// `alias.column` with the column's declared type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub alias: String,
    pub column: String,
    pub ty: ValueType,
}

impl ColumnRef {
    pub fn new(alias: &str, column: &str, ty: ValueType) -> Self {
        Self { alias: alias.to_string(), column: column.to_string(), ty }
    }

    /// Key under which the in-memory store keeps this cell in a joined row.
    pub fn key(&self) -> String {
        format!("{}.{}", self.alias, self.column)
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.alias, self.column)
    }
}
