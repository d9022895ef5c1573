use serde::{Deserialize, Serialize};

/// SQL flavour targeted by the compiler.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Dialect {
    /// `?` placeholders, `||` concatenation, native `NULLS FIRST/LAST`.
    #[default]
    Ansi,
    /// `$1, $2, ...` placeholders.
    Postgres,
    /// `?` placeholders, `CONCAT(a, b)`, null ordering emulated with `expr IS NULL`.
    MySql,
}

impl Dialect {
    /// Placeholder for the parameter at 1-based `index`.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${}", index),
            Dialect::Ansi | Dialect::MySql => "?".to_string(),
        }
    }

    pub fn supports_null_ordering(&self) -> bool {
        !matches!(self, Dialect::MySql)
    }

    /// MySQL rejects `OFFSET` without a `LIMIT`.
    pub fn offset_needs_limit(&self) -> bool {
        matches!(self, Dialect::MySql)
    }

    pub fn concat_with_function(&self) -> bool {
        matches!(self, Dialect::MySql)
    }

    pub fn text_cast_type(&self) -> &'static str {
        match self {
            Dialect::MySql => "CHAR",
            Dialect::Ansi | Dialect::Postgres => "VARCHAR",
        }
    }
}
