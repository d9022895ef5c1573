pub mod dialect;
pub use dialect::*;

pub mod id_type;
pub use id_type::*;

use serde::{Deserialize, Serialize};

/// Settings shared by the compiler and the in-memory store.
///
/// - `dialect` selects placeholder style and dialect-specific rendering.
/// - `id_type` controls how the in-memory store assigns ids on insert.
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// SQL flavour the compiler renders
    pub dialect: Dialect,
    /// Strategy for generated ids in the in-memory store
    pub id_type: IdType,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from(dialect: Dialect, id_type: IdType) -> Self {
        Self { dialect, id_type }
    }

    pub fn ansi() -> Self {
        Self { dialect: Dialect::Ansi, ..Self::default() }
    }

    pub fn postgres() -> Self {
        Self { dialect: Dialect::Postgres, ..Self::default() }
    }

    pub fn mysql() -> Self {
        Self { dialect: Dialect::MySql, ..Self::default() }
    }

    /// Same dialect, different id strategy.
    pub fn with_id_type(mut self, id_type: IdType) -> Self {
        self.id_type = id_type;
        self
    }
}
