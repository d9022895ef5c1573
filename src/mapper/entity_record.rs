use std::sync::Arc;

use indexmap::IndexMap;

use crate::{error::QueryError, expr::Value, mapper::FromValue, metadata::Entity};

/// A hydrated entity row plus the associations loaded by fetch joins.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    entity: Arc<Entity>,
    values: IndexMap<String, Value>,
    associations: IndexMap<String, Option<EntityRecord>>,
}

impl EntityRecord {
    /// `cells` are in the entity's column order.
    pub fn from_cells(entity: &Arc<Entity>, cells: &[Value]) -> Self {
        let values = entity
            .column_names()
            .into_iter()
            .zip(cells.iter().cloned())
            .collect();
        Self { entity: Arc::clone(entity), values, associations: IndexMap::new() }
    }

    pub fn entity(&self) -> &Arc<Entity> {
        &self.entity
    }

    pub fn name(&self) -> &str {
        self.entity.name()
    }

    pub fn id(&self) -> &Value {
        self.values.get(self.entity.id_column()).unwrap_or(&Value::Null)
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    pub fn get_as<T: FromValue>(&self, column: &str) -> Result<T, QueryError> {
        let v = self.values.get(column).ok_or_else(|| QueryError::UnknownColumn {
            entity: self.entity.name().to_string(),
            column: column.to_string(),
        })?;
        T::from_value(v)
    }

    pub fn values(&self) -> &IndexMap<String, Value> {
        &self.values
    }

    /// Whether a fetch join populated the association, even with "absent".
    pub fn is_loaded(&self, association: &str) -> bool {
        self.associations.contains_key(association)
    }

    pub fn association(&self, name: &str) -> Option<&EntityRecord> {
        self.associations.get(name).and_then(Option::as_ref)
    }

    pub fn attach(&mut self, name: &str, record: Option<EntityRecord>) {
        self.associations.insert(name.to_string(), record);
    }

    pub(crate) fn associations(&self) -> &IndexMap<String, Option<EntityRecord>> {
        &self.associations
    }
}
