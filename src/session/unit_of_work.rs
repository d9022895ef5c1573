use std::sync::Arc;

use tracing::{debug, trace};

use crate::{
    compiler::SqlCompiler,
    config::Config,
    error::QueryError,
    executor::{Row, Statement, StatementExecutor, StatementKind},
    expr::Value,
    mapper::{FromTuple, Projection, RowLayout, Tuple},
    query::{InsertPlan, MutationPlan, QueryPlan},
    session::{PersistenceContext, QueryResults},
};

/// Unit of work: compiles plans, runs them through the executor and maps
/// the rows. Entity records read through a session share its persistence
/// context.
pub struct Session {
    executor: Arc<dyn StatementExecutor>,
    compiler: SqlCompiler,
    context: PersistenceContext,
}

impl Session {
    pub fn new(executor: Arc<dyn StatementExecutor>, config: &Config) -> Self {
        Self::with_compiler(executor, SqlCompiler::from_config(config))
    }

    pub fn with_compiler(executor: Arc<dyn StatementExecutor>, compiler: SqlCompiler) -> Self {
        Self {
            executor,
            compiler,
            context: PersistenceContext::new(),
        }
    }

    pub fn compiler(&self) -> &SqlCompiler {
        &self.compiler
    }

    pub fn context(&self) -> &PersistenceContext {
        &self.context
    }

    /// The statement `fetch` would send, without running it.
    pub fn statement(&self, plan: &QueryPlan) -> Result<Statement, QueryError> {
        let bound = self.compiler.compile(plan)?;
        Ok(Statement::new(bound, StatementKind::Select(Arc::new(plan.clone()))))
    }

    fn rows(&self, plan: &QueryPlan) -> Result<Vec<Row>, QueryError> {
        if plan.limit == Some(0) {
            trace!("limit 0, nothing to fetch");
            return Ok(vec![]);
        }
        let statement = self.statement(plan)?;
        debug!(sql = %statement.bound.sql, params = statement.bound.params.len(), "fetch");
        self.executor.query(&statement)
    }

    fn read_all<T>(&self, layout: RowLayout, rows: Vec<Row>, map: impl Fn(Tuple) -> Result<T, QueryError>) -> Result<Vec<T>, QueryError> {
        let layout = Arc::new(layout);
        rows.into_iter()
            .map(|row| map(Tuple::read(&layout, row, &self.context)?))
            .collect()
    }

    pub fn fetch<T: FromTuple>(&self, plan: &QueryPlan) -> Result<Vec<T>, QueryError> {
        let layout = RowLayout::of(plan);
        T::check(&layout)?;
        let rows = self.rows(plan)?;
        self.read_all(layout, rows, T::from_tuple)
    }

    /// `None` when nothing matches, `NonUniqueResult` when several rows do.
    pub fn fetch_one<T: FromTuple>(&self, plan: &QueryPlan) -> Result<Option<T>, QueryError> {
        let probe = match plan.limit {
            Some(_) => plan.clone(),
            None => plan.with_limit(2),
        };
        let mut results = self.fetch(&probe)?;
        match results.len() {
            0 => Ok(None),
            1 => Ok(results.pop()),
            count => QueryError::NonUniqueResult { count }.err(),
        }
    }

    pub fn fetch_first<T: FromTuple>(&self, plan: &QueryPlan) -> Result<Option<T>, QueryError> {
        let limit = plan.limit.map_or(1, |l| l.min(1));
        Ok(self.fetch(&plan.with_limit(limit))?.into_iter().next())
    }

    /// Rows the plan matches, ignoring its order, offset and limit.
    pub fn fetch_count(&self, plan: &QueryPlan) -> Result<u64, QueryError> {
        let bound = self.compiler.compile_count(plan)?;
        let statement = Statement::new(bound, StatementKind::Count(Arc::new(plan.clone())));
        debug!(sql = %statement.bound.sql, params = statement.bound.params.len(), "count");
        let rows = self.executor.query(&statement)?;
        match rows.as_slice() {
            [row] => match row.as_slice() {
                [Value::Int(n)] if *n >= 0 => Ok(*n as u64),
                other => QueryError::Storage(format!("count returned {other:?}")).err(),
            },
            other => QueryError::Storage(format!("count returned {} rows", other.len())).err(),
        }
    }

    /// Count query, then the content query when the count is not zero.
    pub fn fetch_paged<T: FromTuple>(&self, plan: &QueryPlan) -> Result<QueryResults<T>, QueryError> {
        T::check(&RowLayout::of(plan))?;
        let total = self.fetch_count(plan)?;
        let results = if total == 0 { vec![] } else { self.fetch(plan)? };
        Ok(QueryResults {
            results,
            total,
            offset: plan.offset.unwrap_or(0),
            limit: plan.limit,
        })
    }

    /// Maps rows through a DTO projection bound to this plan's shape.
    pub fn fetch_into<P: Projection>(&self, plan: &QueryPlan, projection: &P) -> Result<Vec<P::Output>, QueryError> {
        let layout = RowLayout::of(plan);
        if projection.layout() != &layout {
            return QueryError::ProjectionMismatch("projection was bound to a different query shape".into()).err();
        }
        let rows = self.rows(plan)?;
        self.read_all(layout, rows, |tuple| projection.map(tuple))
    }

    /// Bulk update or delete. Runs straight against storage; cached entity
    /// records are not refreshed until [`Session::clear`].
    pub fn execute(&self, plan: impl Into<MutationPlan>) -> Result<u64, QueryError> {
        let statement = match plan.into() {
            MutationPlan::Update(p) => Statement::new(self.compiler.compile_update(&p)?, StatementKind::Update(Arc::new(p))),
            MutationPlan::Delete(p) => Statement::new(self.compiler.compile_delete(&p)?, StatementKind::Delete(Arc::new(p))),
        };
        let affected = self.executor.execute(&statement)?;
        debug!(sql = %statement.bound.sql, affected, "execute");
        Ok(affected)
    }

    /// Returns the generated (or supplied) id.
    pub fn insert(&self, plan: &InsertPlan) -> Result<Value, QueryError> {
        let bound = self.compiler.compile_insert(plan)?;
        let statement = Statement::new(bound, StatementKind::Insert(Arc::new(plan.clone())));
        let id = self.executor.insert(&statement)?;
        debug!(sql = %statement.bound.sql, id = %id, "insert");
        Ok(id)
    }

    /// Drops every cached entity record.
    pub fn clear(&self) {
        self.context.clear();
    }
}
