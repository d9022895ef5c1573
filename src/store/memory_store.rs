use std::{
    collections::HashMap,
    fs,
    path::Path,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use tracing::{debug, trace};

use crate::{
    config::Config,
    error::QueryError,
    executor::{Row, Statement, StatementExecutor, StatementKind},
    expr::Value,
    metadata::Catalog,
    store::{PlanExecutor, Table},
};

/// In-memory [`StatementExecutor`] that interprets the plan carried by each
/// statement. Every catalog entity gets an empty table up front.
#[derive(Debug)]
pub struct MemoryStore {
    config: Config,
    catalog: Arc<Catalog>,
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryStore {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self::with_config(catalog, Config::default())
    }

    pub fn with_config(catalog: Arc<Catalog>, config: Config) -> Self {
        let tables = catalog
            .entities()
            .map(|e| (e.table().to_string(), Table::new(Arc::clone(e), config.id_type)))
            .collect();
        Self {
            config,
            catalog,
            tables: RwLock::new(tables),
        }
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Table>>, QueryError> {
        self.tables.read().map_err(|_| QueryError::Storage("store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Table>>, QueryError> {
        self.tables.write().map_err(|_| QueryError::Storage("store lock poisoned".into()))
    }

    fn with_table<R>(&self, table: &str, f: impl FnOnce(&mut Table) -> Result<R, QueryError>) -> Result<R, QueryError> {
        let mut tables = self.write()?;
        let table = tables
            .get_mut(table)
            .ok_or_else(|| QueryError::Storage(format!("no table {table} in the store")))?;
        f(table)
    }

    /// Appends a JSON array of row objects to `table`.
    pub fn load_from_json(&self, table: &str, rows: serde_json::Value) -> Result<usize, QueryError> {
        let n = self.with_table(table, |t| t.load(rows))?;
        debug!(table, rows = n, "rows loaded");
        Ok(n)
    }

    pub fn load_from_file(&self, table: &str, path: impl AsRef<Path>) -> Result<usize, QueryError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| QueryError::Storage(format!("cannot read {}: {e}", path.display())))?;
        let rows = serde_json::from_str(&text)
            .map_err(|e| QueryError::Storage(format!("invalid json in {}: {e}", path.display())))?;
        self.load_from_json(table, rows)
    }

    /// Inserts one row object, returning its id.
    pub fn insert_json(&self, table: &str, row: serde_json::Value) -> Result<Value, QueryError> {
        self.with_table(table, |t| t.insert(row))
    }

    pub fn row_count(&self, table: &str) -> Result<usize, QueryError> {
        self.read()?
            .get(table)
            .map(Table::len)
            .ok_or_else(|| QueryError::Storage(format!("no table {table} in the store")))
    }
}

impl StatementExecutor for MemoryStore {
    fn query(&self, statement: &Statement) -> Result<Vec<Row>, QueryError> {
        let tables = self.read()?;
        let exec = PlanExecutor::new(&tables);
        let rows = match &statement.kind {
            StatementKind::Select(plan) => exec.select(plan, None)?,
            StatementKind::Count(plan) => vec![vec![Value::Int(exec.count(plan)?)]],
            other => {
                return QueryError::UnsupportedConstruct(format!("{} statement cannot be queried", other.name())).err();
            }
        };
        trace!(sql = %statement.bound.sql, rows = rows.len(), "memory store query");
        Ok(rows)
    }

    fn execute(&self, statement: &Statement) -> Result<u64, QueryError> {
        let mut tables = self.write()?;
        let affected = match &statement.kind {
            StatementKind::Update(plan) => {
                let changes = PlanExecutor::new(&tables).update_changes(plan)?;
                let name = plan.target.entity().table();
                let table = tables
                    .get_mut(name)
                    .ok_or_else(|| QueryError::Storage(format!("no table {name} in the store")))?;
                // all or nothing
                for (_, values) in &changes {
                    for (column, value) in values {
                        table.check_set(column, value)?;
                    }
                }
                for (key, values) in &changes {
                    for (column, value) in values {
                        table.set(key, column, value)?;
                    }
                }
                changes.len()
            }
            StatementKind::Delete(plan) => {
                let keys = PlanExecutor::new(&tables).delete_keys(plan)?;
                let name = plan.target.entity().table();
                let table = tables
                    .get_mut(name)
                    .ok_or_else(|| QueryError::Storage(format!("no table {name} in the store")))?;
                keys.iter().filter(|k| table.remove(k)).count()
            }
            other => {
                return QueryError::UnsupportedConstruct(format!("{} statement cannot be executed", other.name())).err();
            }
        };
        debug!(sql = %statement.bound.sql, affected, "memory store mutation");
        Ok(affected as u64)
    }

    fn insert(&self, statement: &Statement) -> Result<Value, QueryError> {
        let StatementKind::Insert(plan) = &statement.kind else {
            return QueryError::UnsupportedConstruct(format!("{} statement cannot be inserted", statement.kind.name())).err();
        };
        let values = plan.values.iter().map(|(c, v)| (c.column.clone(), v.clone())).collect();
        let id = self.with_table(plan.target.entity().table(), |t| t.insert_values(values))?;
        debug!(sql = %statement.bound.sql, id = %id, "memory store insert");
        Ok(id)
    }
}
