use std::{fs, path::Path, sync::Arc};

use indexmap::IndexMap;
use tracing::debug;

use crate::{error::QueryError, metadata::Entity};

/// Registry of every mapped entity, looked up by entity name.
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    entities: IndexMap<String, Arc<Entity>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entity: Arc<Entity>) -> &mut Self {
        self.entities.insert(entity.name().to_string(), entity);
        self
    }

    pub fn with(mut self, entity: Arc<Entity>) -> Self {
        self.register(entity);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<Entity>> {
        self.entities.get(name).map(Arc::clone)
    }

    pub fn entity(&self, name: &str) -> Result<Arc<Entity>, QueryError> {
        self.get(name).ok_or_else(|| QueryError::UnknownEntity(name.to_string()))
    }

    pub fn by_table(&self, table: &str) -> Option<Arc<Entity>> {
        self.entities.values().find(|e| e.table().eq_ignore_ascii_case(table)).map(Arc::clone)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Arc<Entity>> {
        self.entities.values()
    }

    /// Cross-entity checks: relation targets exist and expose the referenced column.
    pub fn validate(&self) -> Result<(), QueryError> {
        for entity in self.entities.values() {
            entity.validate()?;
            for (name, rel) in entity.relations() {
                let target = self.get(&rel.target).ok_or_else(|| QueryError::UnknownRelation {
                    entity: entity.name().to_string(),
                    relation: name.clone(),
                })?;
                let column = rel.target_column.as_deref().unwrap_or(target.id_column());
                if target.column(column).is_none() {
                    return QueryError::UnknownColumn {
                        entity: target.name().to_string(),
                        column: column.to_string(),
                    }.err();
                }
            }
        }
        Ok(())
    }

    /// Builds a validated catalog from a JSON array of entity descriptions.
    pub fn from_json(value: serde_json::Value) -> Result<Self, QueryError> {
        let entities: Vec<Entity> = serde_json::from_value(value)
            .map_err(|e| QueryError::Storage(format!("invalid catalog description: {e}")))?;
        let mut catalog = Self::new();
        for entity in entities {
            catalog.register(Arc::new(entity));
        }
        catalog.validate()?;
        debug!(entities = catalog.entities.len(), "catalog loaded");
        Ok(catalog)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, QueryError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| QueryError::Storage(format!("cannot read {}: {e}", path.display())))?;
        let value = serde_json::from_str(&text)
            .map_err(|e| QueryError::Storage(format!("invalid json in {}: {e}", path.display())))?;
        Self::from_json(value)
    }

    pub fn into_shared(self) -> Arc<Catalog> {
        Arc::new(self)
    }
}
