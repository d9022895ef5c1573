use std::fmt::{self, Display};

use crate::metadata::ValueType;

#[derive(Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Operands of an expression do not share a compatible type.
    TypeMismatch { context: String, expected: String, found: ValueType },
    /// `build()` was called without a required clause.
    IncompleteQuery(String),
    /// The target dialect (or the builder) cannot express this node.
    UnsupportedConstruct(String),
    /// Result shape and row data disagree.
    ProjectionMismatch(String),
    /// A single-row fetch matched more than one row.
    NonUniqueResult { count: usize },
    UnknownEntity(String),
    UnknownColumn { entity: String, column: String },
    UnknownRelation { entity: String, relation: String },
    /// Failure reported by a statement executor.
    Storage(String),
}

impl QueryError {
    pub fn type_mismatch(context: &str, expected: &str, found: ValueType) -> Self {
        Self::TypeMismatch {
            context: context.to_string(),
            expected: expected.to_string(),
            found,
        }
    }

    pub fn err<T>(self) -> Result<T, QueryError> {
        Err(self)
    }
}

impl Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::TypeMismatch { context, expected, found } =>
                write!(f, "TypeMismatch: {} expected {}, found {}", context, expected, found),
            QueryError::IncompleteQuery(msg) => write!(f, "IncompleteQuery: {}", msg),
            QueryError::UnsupportedConstruct(msg) => write!(f, "UnsupportedConstruct: {}", msg),
            QueryError::ProjectionMismatch(msg) => write!(f, "ProjectionMismatch: {}", msg),
            QueryError::NonUniqueResult { count } =>
                write!(f, "NonUniqueResult: expected at most one row, got {}", count),
            QueryError::UnknownEntity(name) => write!(f, "UnknownEntity: {}", name),
            QueryError::UnknownColumn { entity, column } =>
                write!(f, "UnknownColumn: {}.{}", entity, column),
            QueryError::UnknownRelation { entity, relation } =>
                write!(f, "UnknownRelation: {}.{}", entity, relation),
            QueryError::Storage(msg) => write!(f, "Storage: {}", msg),
        }
    }
}

impl std::error::Error for QueryError {}
