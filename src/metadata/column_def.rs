use serde::{Deserialize, Serialize};

use crate::metadata::ValueType;

/// Declared type and nullability of one entity column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub ty: ValueType,
    #[serde(default)]
    pub nullable: bool,
}

impl ColumnDef {
    pub fn new(ty: ValueType) -> Self {
        Self { ty, nullable: false }
    }

    pub fn nullable(ty: ValueType) -> Self {
        Self { ty, nullable: true }
    }
}
