use std::{fmt, sync::Arc};

use crate::{metadata::EntityPath, predicate::Predicate, query::QueryPlan};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinKind::Inner => write!(f, "INNER JOIN"),
            JoinKind::Left => write!(f, "LEFT JOIN"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinTarget {
    Entity(EntityPath),
    /// FROM-clause subquery. Never compiled.
    SubQuery { plan: Arc<QueryPlan>, alias: String },
}

impl JoinTarget {
    pub fn alias(&self) -> &str {
        match self {
            JoinTarget::Entity(path) => path.alias(),
            JoinTarget::SubQuery { alias, .. } => alias,
        }
    }
}

/// A join in declaration order.
///
/// `relation` holds the owner alias and relation name when the join was
/// inferred from a declared relation; fetched targets are attached under
/// that name.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub kind: JoinKind,
    pub target: JoinTarget,
    pub on: Option<Predicate>,
    pub relation: Option<(String, String)>,
    pub fetch: bool,
}

impl JoinClause {
    pub fn entity(&self) -> Option<&EntityPath> {
        match &self.target {
            JoinTarget::Entity(path) => Some(path),
            JoinTarget::SubQuery { .. } => None,
        }
    }
}
