use std::sync::Arc;

use crate::{
    compiler::BoundStatement,
    error::QueryError,
    expr::Value,
    query::{DeletePlan, InsertPlan, QueryPlan, UpdatePlan},
};

/// One raw result row, cells in select-list order.
pub type Row = Vec<Value>;

/// The plan a statement was compiled from.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    Select(Arc<QueryPlan>),
    /// Answered with a single row holding one `Int`.
    Count(Arc<QueryPlan>),
    Update(Arc<UpdatePlan>),
    Delete(Arc<DeletePlan>),
    Insert(Arc<InsertPlan>),
}

impl StatementKind {
    pub fn name(&self) -> &'static str {
        match self {
            StatementKind::Select(_) => "select",
            StatementKind::Count(_) => "count",
            StatementKind::Update(_) => "update",
            StatementKind::Delete(_) => "delete",
            StatementKind::Insert(_) => "insert",
        }
    }
}

/// What an executor receives: the SQL to send plus the plan behind it, so
/// backends that interpret plans need no SQL parser.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub bound: BoundStatement,
    pub kind: StatementKind,
}

impl Statement {
    pub fn new(bound: BoundStatement, kind: StatementKind) -> Self {
        Self { bound, kind }
    }
}

/// The storage boundary.
pub trait StatementExecutor: Send + Sync {
    /// Select and count statements.
    fn query(&self, statement: &Statement) -> Result<Vec<Row>, QueryError>;

    /// Update and delete statements; returns the affected row count.
    fn execute(&self, statement: &Statement) -> Result<u64, QueryError>;

    /// Insert statements; returns the generated (or supplied) key.
    fn insert(&self, statement: &Statement) -> Result<Value, QueryError>;
}

impl<E: StatementExecutor + ?Sized> StatementExecutor for Arc<E> {
    fn query(&self, statement: &Statement) -> Result<Vec<Row>, QueryError> {
        (**self).query(statement)
    }

    fn execute(&self, statement: &Statement) -> Result<u64, QueryError> {
        (**self).execute(statement)
    }

    fn insert(&self, statement: &Statement) -> Result<Value, QueryError> {
        (**self).insert(statement)
    }
}
