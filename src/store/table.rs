use std::{collections::HashMap, sync::Arc};

use indexmap::IndexMap;
use serde_json::{Map, Value as JsonValue};

use crate::{
    config::IdType,
    error::QueryError,
    expr::Value,
    metadata::{Entity, ValueType},
    store::IdManager,
};

/// Column values of the rows in scope, keyed `alias.column`.
pub type Scope = HashMap<String, Value>;

/// Rows of one mapped table, stored as JSON objects keyed by id.
///
/// Every stored object carries all declared columns and only those; cells
/// always read back under the declared column type.
#[derive(Debug)]
pub struct Table {
    entity: Arc<Entity>,
    rows: IndexMap<String, Map<String, JsonValue>>,
    id_manager: IdManager,
}

impl Table {
    pub fn new(entity: Arc<Entity>, id_type: IdType) -> Self {
        Self {
            entity,
            rows: IndexMap::new(),
            id_manager: IdManager::new(id_type),
        }
    }

    pub fn name(&self) -> &str {
        self.entity.table()
    }

    pub fn entity(&self) -> &Arc<Entity> {
        &self.entity
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn key(id: &Value) -> String {
        match id {
            Value::Text(s) => s.clone(),
            other => other.to_string(),
        }
    }

    pub fn get(&self, id: &Value) -> Option<&Map<String, JsonValue>> {
        self.rows.get(&Self::key(id))
    }

    /// Checks `value` fits `column` and returns its stored form.
    fn cell(&self, column: &str, value: &Value) -> Result<JsonValue, QueryError> {
        let def = self.entity.column(column).ok_or_else(|| QueryError::UnknownColumn {
            entity: self.entity.name().to_string(),
            column: column.to_string(),
        })?;
        if value.is_null() && !def.nullable && column != self.entity.id_column() {
            return QueryError::Storage(format!("{}.{} is not nullable", self.name(), column)).err();
        }
        let json = value.to_json();
        if Value::from_json(&json, def.ty).is_none() {
            return Err(QueryError::type_mismatch(
                &format!("{}.{}", self.name(), column),
                &def.ty.to_string(),
                value.value_type(),
            ));
        }
        Ok(json)
    }

    /// Inserts one JSON object, generating its id when absent.
    pub fn insert(&mut self, doc: JsonValue) -> Result<Value, QueryError> {
        let JsonValue::Object(doc) = doc else {
            return QueryError::Storage(format!("rows of {} must be JSON objects", self.name())).err();
        };
        let mut values = Vec::with_capacity(doc.len());
        for (column, json) in doc {
            let ty = self.entity.column(&column).map(|d| d.ty).unwrap_or(ValueType::Null);
            let value = Value::from_json(&json, ty).ok_or_else(|| {
                QueryError::type_mismatch(&format!("{}.{}", self.name(), column), &ty.to_string(), ValueType::of_json(&json))
            })?;
            values.push((column, value));
        }
        self.insert_values(values)
    }

    pub fn insert_values(&mut self, values: Vec<(String, Value)>) -> Result<Value, QueryError> {
        let id_column = self.entity.id_column().to_string();
        let mut row = Map::new();
        let mut id = None;
        for (column, value) in values {
            let json = self.cell(&column, &value)?;
            if column == id_column && !value.is_null() {
                id = Some(value);
            }
            row.insert(column, json);
        }
        for (name, def) in self.entity.columns() {
            if *name == id_column || row.contains_key(name) {
                continue;
            }
            if !def.nullable {
                return QueryError::Storage(format!("missing value for {}.{}", self.name(), name)).err();
            }
            row.insert(name.clone(), JsonValue::Null);
        }

        let id = match id {
            Some(id) => {
                self.id_manager.observe(&id);
                id
            }
            None => {
                let generated = self.id_manager.next().ok_or_else(|| {
                    QueryError::Storage(format!("row for {} has no id and ids are caller-provided", self.name()))
                })?.into_value();
                let json = self.cell(&id_column, &generated)?;
                row.insert(id_column, json);
                generated
            }
        };

        let key = Self::key(&id);
        if self.rows.contains_key(&key) {
            return QueryError::Storage(format!("duplicate id {} in {}", id, self.name())).err();
        }
        self.rows.insert(key, row);
        Ok(id)
    }

    /// Loads a JSON array of objects. Nothing is inserted if any row fails.
    pub fn load(&mut self, docs: JsonValue) -> Result<usize, QueryError> {
        let JsonValue::Array(docs) = docs else {
            return QueryError::Storage(format!("data for {} must be a JSON array", self.name())).err();
        };
        let (rows, ids) = (self.rows.clone(), self.id_manager.clone());
        let n = docs.len();
        for doc in docs {
            if let Err(e) = self.insert(doc) {
                self.rows = rows;
                self.id_manager = ids;
                return Err(e);
            }
        }
        Ok(n)
    }

    /// All rows as scopes under `alias`, with their storage keys.
    pub fn scan(&self, alias: &str) -> Vec<(String, Scope)> {
        self.rows
            .iter()
            .map(|(key, row)| {
                let scope = self
                    .entity
                    .columns()
                    .map(|(name, def)| {
                        let v = row.get(name).and_then(|j| Value::from_json(j, def.ty)).unwrap_or(Value::Null);
                        (format!("{alias}.{name}"), v)
                    })
                    .collect();
                (key.clone(), scope)
            })
            .collect()
    }

    /// Checks an update of `column` to `value` without applying it.
    pub fn check_set(&self, column: &str, value: &Value) -> Result<JsonValue, QueryError> {
        if column == self.entity.id_column() {
            return QueryError::UnsupportedConstruct(format!("id column {}.{} cannot be updated", self.name(), column)).err();
        }
        self.cell(column, value)
    }

    pub fn set(&mut self, key: &str, column: &str, value: &Value) -> Result<(), QueryError> {
        let json = self.check_set(column, value)?;
        let row = self.rows.get_mut(key).ok_or_else(|| QueryError::Storage(format!("no row {key} in {}", self.entity.table())))?;
        row.insert(column.to_string(), json);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.rows.shift_remove(key).is_some()
    }
}
