use std::sync::Arc;

use crate::{
    expr::{Expr, Value},
    metadata::{Entity, ValueType},
    query::{QueryPlan, SelectItem},
};

/// Where one select item lives in a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// `entity.column_count()` cells starting at `start`.
    Entity { alias: String, entity: Arc<Entity>, start: usize },
    Value { label: String, field: String, expr: Expr, ty: ValueType, index: usize },
    /// Not sent to the database; injected into every row.
    Constant { label: String, field: String, value: Value },
}

impl Slot {
    pub fn label(&self) -> &str {
        match self {
            Slot::Entity { alias, .. } => alias,
            Slot::Value { label, .. } | Slot::Constant { label, .. } => label,
        }
    }

    /// Name used by by-name DTO binding.
    pub fn field(&self) -> &str {
        match self {
            Slot::Entity { alias, .. } => alias,
            Slot::Value { field, .. } | Slot::Constant { field, .. } => field,
        }
    }

    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Slot::Entity { .. } => None,
            Slot::Value { ty, .. } => Some(*ty),
            Slot::Constant { value, .. } => Some(value.value_type()),
        }
    }
}

/// A fetch-joined entity, attached to its owner under `name`.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSlot {
    pub owner: String,
    pub name: String,
    pub entity: Arc<Entity>,
    pub start: usize,
}

/// Shape of the rows a select plan produces: one slot per select item, then
/// the columns of fetch-joined entities.
#[derive(Debug, Clone, PartialEq)]
pub struct RowLayout {
    pub slots: Vec<Slot>,
    pub fetches: Vec<FetchSlot>,
    pub width: usize,
}

impl RowLayout {
    pub fn of(plan: &QueryPlan) -> RowLayout {
        let mut width = 0;
        let mut slots = Vec::with_capacity(plan.projection.len());
        for item in &plan.projection {
            match item {
                SelectItem::Entity(path) => {
                    slots.push(Slot::Entity {
                        alias: path.alias().to_string(),
                        entity: Arc::clone(path.entity()),
                        start: width,
                    });
                    width += path.entity().column_count();
                }
                SelectItem::Expr { expr: Expr::Constant(value), .. } => slots.push(Slot::Constant {
                    label: item.label(),
                    field: item.field_name(),
                    value: value.clone(),
                }),
                SelectItem::Expr { expr, .. } => {
                    slots.push(Slot::Value {
                        label: item.label(),
                        field: item.field_name(),
                        expr: expr.clone(),
                        ty: expr.value_type(),
                        index: width,
                    });
                    width += 1;
                }
            }
        }

        let default_owner = plan.sources.first().map(|s| s.alias().to_string()).unwrap_or_default();
        let mut fetches = vec![];
        for join in plan.fetch_joins() {
            let Some(path) = join.entity() else { continue };
            let (owner, name) = match &join.relation {
                Some((owner, name)) => (owner.clone(), name.clone()),
                None => (default_owner.clone(), path.alias().to_string()),
            };
            fetches.push(FetchSlot { owner, name, entity: Arc::clone(path.entity()), start: width });
            width += path.entity().column_count();
        }

        RowLayout { slots, fetches, width }
    }
}
