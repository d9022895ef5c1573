use std::sync::Arc;

use crate::{
    error::QueryError,
    expr::{AggregateFunc, ColumnRef, Expr},
    metadata::{Entity, Relation},
};

/// An entity bound to a query alias. The same entity under two aliases gives
/// two independent paths (self joins, subqueries over the outer table).
#[derive(Debug, Clone)]
pub struct EntityPath {
    entity: Arc<Entity>,
    alias: String,
}

impl EntityPath {
    pub fn new(entity: Arc<Entity>, alias: &str) -> Self {
        Self { entity, alias: alias.to_string() }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn entity(&self) -> &Arc<Entity> {
        &self.entity
    }

    pub fn name(&self) -> &str {
        self.entity.name()
    }

    pub fn column_ref(&self, name: &str) -> Result<ColumnRef, QueryError> {
        let def = self.entity.column(name).ok_or_else(|| QueryError::UnknownColumn {
            entity: self.entity.name().to_string(),
            column: name.to_string(),
        })?;
        Ok(ColumnRef::new(&self.alias, name, def.ty))
    }

    pub fn column(&self, name: &str) -> Result<Expr, QueryError> {
        self.column_ref(name).map(Expr::Column)
    }

    pub fn id(&self) -> Expr {
        Expr::Column(ColumnRef::new(&self.alias, self.entity.id_column(), self.entity.id_type()))
    }

    /// `count(alias.id)`
    pub fn count(&self) -> Expr {
        Expr::aggregate(AggregateFunc::Count, Some(self.id()), false)
    }

    pub fn columns(&self) -> Vec<ColumnRef> {
        self.entity
            .columns()
            .map(|(name, def)| ColumnRef::new(&self.alias, name, def.ty))
            .collect()
    }

    pub fn relation(&self, name: &str) -> Result<RelationPath, QueryError> {
        let relation = self.entity.relation(name).ok_or_else(|| QueryError::UnknownRelation {
            entity: self.entity.name().to_string(),
            relation: name.to_string(),
        })?;
        let fk = self.column_ref(&relation.column)?;
        Ok(RelationPath {
            owner_alias: self.alias.clone(),
            name: name.to_string(),
            relation: relation.clone(),
            fk,
        })
    }
}

impl PartialEq for EntityPath {
    fn eq(&self, other: &Self) -> bool {
        self.alias == other.alias && self.entity.name() == other.entity.name()
    }
}

/// A declared relation navigated from an aliased owner, e.g. `m.team`.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationPath {
    pub owner_alias: String,
    pub name: String,
    pub relation: Relation,
    pub fk: ColumnRef,
}

impl RelationPath {
    pub fn target(&self) -> &str {
        &self.relation.target
    }
}
