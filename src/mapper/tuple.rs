use std::sync::Arc;

use crate::{
    error::QueryError,
    expr::{Expr, Value},
    mapper::{EntityRecord, FromElement, RowLayout, Slot},
    metadata::Entity,
};

/// One cell of a tuple: a value, or an entity that may be absent (left join).
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Value(Value),
    Entity(Option<EntityRecord>),
}

/// Decides which record instance a freshly read entity row becomes.
pub trait EntityResolver {
    fn resolve(&self, record: EntityRecord) -> EntityRecord;
}

/// Every row gets its own records.
pub struct Detached;

impl EntityResolver for Detached {
    fn resolve(&self, record: EntityRecord) -> EntityRecord {
        record
    }
}

/// A result row, addressable by position, label or producing expression.
#[derive(Debug, Clone)]
pub struct Tuple {
    layout: Arc<RowLayout>,
    elements: Vec<Element>,
}

fn read_entity(entity: &Arc<Entity>, row: &[Value], start: usize) -> Option<EntityRecord> {
    let cells = row.get(start..start + entity.column_count())?;
    let record = EntityRecord::from_cells(entity, cells);
    if record.id().is_null() { None } else { Some(record) }
}

impl Tuple {
    /// Splits a raw row according to `layout`.
    pub fn read(layout: &Arc<RowLayout>, row: Vec<Value>, resolver: &dyn EntityResolver) -> Result<Tuple, QueryError> {
        if row.len() != layout.width {
            return QueryError::ProjectionMismatch(format!(
                "row has {} cells, layout expects {}", row.len(), layout.width
            )).err();
        }

        let mut elements = Vec::with_capacity(layout.slots.len());
        for slot in &layout.slots {
            let element = match slot {
                Slot::Entity { alias, entity, start } => {
                    let record = read_entity(entity, &row, *start).map(|mut record| {
                        for fetch in layout.fetches.iter().filter(|f| &f.owner == alias) {
                            let associated = read_entity(&fetch.entity, &row, fetch.start).map(|r| resolver.resolve(r));
                            record.attach(&fetch.name, associated);
                        }
                        resolver.resolve(record)
                    });
                    Element::Entity(record)
                }
                Slot::Value { index, .. } => Element::Value(row[*index].clone()),
                Slot::Constant { value, .. } => Element::Value(value.clone()),
            };
            elements.push(element);
        }
        Ok(Tuple { layout: Arc::clone(layout), elements })
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn layout(&self) -> &RowLayout {
        &self.layout
    }

    pub fn get(&self, index: usize) -> Option<&Element> {
        self.elements.get(index)
    }

    pub fn value(&self, index: usize) -> Option<&Value> {
        match self.elements.get(index) {
            Some(Element::Value(v)) => Some(v),
            _ => None,
        }
    }

    pub fn entity(&self, index: usize) -> Option<&EntityRecord> {
        match self.elements.get(index) {
            Some(Element::Entity(e)) => e.as_ref(),
            _ => None,
        }
    }

    pub fn get_as<T: FromElement>(&self, index: usize) -> Result<T, QueryError> {
        let element = self.elements.get(index).ok_or_else(|| {
            QueryError::ProjectionMismatch(format!("tuple has no element {index}"))
        })?;
        T::from_element(element.clone())
    }

    pub fn by_label(&self, label: &str) -> Option<&Element> {
        let index = self.layout.slots.iter().position(|s| s.label() == label)?;
        self.elements.get(index)
    }

    /// Value produced by `expr`, when it is part of the select list.
    pub fn by_expr(&self, expr: &Expr) -> Option<&Value> {
        let index = self.layout.slots.iter().position(|s| match s {
            Slot::Value { expr: e, .. } => e == expr,
            Slot::Constant { value, .. } => matches!(expr, Expr::Constant(v) if v == value),
            Slot::Entity { .. } => false,
        })?;
        self.value(index)
    }

    pub fn into_elements(self) -> Vec<Element> {
        self.elements
    }
}
