use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{error::QueryError, metadata::{ColumnDef, Relation, ValueType}};

/// Immutable description of one mapped table.
///
/// Column order is declaration order and is the order in which entity
/// projections are rendered and read back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    name: String,
    table: String,
    #[serde(default = "Entity::default_id")]
    id: String,
    columns: IndexMap<String, ColumnDef>,
    #[serde(default)]
    relations: IndexMap<String, Relation>,
}

impl Entity {
    fn default_id() -> String {
        "id".to_string()
    }

    pub fn builder(name: &str) -> EntityBuilder {
        EntityBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn id_column(&self) -> &str {
        &self.id
    }

    pub fn id_type(&self) -> ValueType {
        self.columns.get(&self.id).map(|c| c.ty).unwrap_or(ValueType::Null)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.get(name)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&String, &ColumnDef)> {
        self.columns.iter()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.keys().cloned().collect()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }

    pub fn relations(&self) -> impl Iterator<Item = (&String, &Relation)> {
        self.relations.iter()
    }

    /// Checks the entity on its own: the id column and every relation's
    /// foreign-key column must be declared.
    pub fn validate(&self) -> Result<(), QueryError> {
        if !self.columns.contains_key(&self.id) {
            return QueryError::UnknownColumn { entity: self.name.clone(), column: self.id.clone() }.err();
        }
        for rel in self.relations.values() {
            if !self.columns.contains_key(&rel.column) {
                return QueryError::UnknownColumn { entity: self.name.clone(), column: rel.column.clone() }.err();
            }
        }
        Ok(())
    }
}

/// Fluent construction of an [`Entity`]. The table defaults to the lower-cased
/// entity name and the id to an `Int` column called `id`.
#[derive(Debug, Clone)]
pub struct EntityBuilder {
    name: String,
    table: String,
    id: String,
    columns: IndexMap<String, ColumnDef>,
    relations: IndexMap<String, Relation>,
}

impl EntityBuilder {
    pub fn new(name: &str) -> Self {
        let mut columns = IndexMap::new();
        columns.insert("id".to_string(), ColumnDef::new(ValueType::Int));
        Self {
            name: name.to_string(),
            table: name.to_ascii_lowercase(),
            id: "id".to_string(),
            columns,
            relations: IndexMap::new(),
        }
    }

    pub fn table(mut self, table: &str) -> Self {
        self.table = table.to_string();
        self
    }

    /// Replaces the id column. The id stays the first column.
    pub fn id(mut self, name: &str, ty: ValueType) -> Self {
        self.columns.shift_remove(&self.id);
        self.columns.shift_insert(0, name.to_string(), ColumnDef::new(ty));
        self.id = name.to_string();
        self
    }

    pub fn column(mut self, name: &str, ty: ValueType) -> Self {
        self.columns.insert(name.to_string(), ColumnDef::new(ty));
        self
    }

    pub fn nullable_column(mut self, name: &str, ty: ValueType) -> Self {
        self.columns.insert(name.to_string(), ColumnDef::nullable(ty));
        self
    }

    /// Declares a many-to-one relation whose foreign key is `column`.
    pub fn relation(mut self, name: &str, column: &str, target: &str) -> Self {
        self.relations.insert(name.to_string(), Relation::new(column, target));
        self
    }

    pub fn build(self) -> Result<Arc<Entity>, QueryError> {
        let entity = Entity {
            name: self.name,
            table: self.table,
            id: self.id,
            columns: self.columns,
            relations: self.relations,
        };
        entity.validate()?;
        Ok(Arc::new(entity))
    }
}
