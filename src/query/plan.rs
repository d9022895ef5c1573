use crate::{
    error::QueryError,
    expr::Expr,
    metadata::{EntityPath, ValueType},
    predicate::Predicate,
    query::{JoinClause, OrderSpec, SelectItem},
};

/// A validated, immutable select query.
///
/// Produced by [`QueryBuilder::build`](crate::query::QueryBuilder::build).
/// `sources` beyond the first form a theta join.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub projection: Vec<SelectItem>,
    pub distinct: bool,
    pub sources: Vec<EntityPath>,
    pub joins: Vec<JoinClause>,
    pub filter: Option<Predicate>,
    pub group_by: Vec<Expr>,
    pub having: Option<Predicate>,
    pub order_by: Vec<OrderSpec>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl QueryPlan {
    /// Type of the single column a scalar or `IN` subquery yields.
    pub fn scalar_type(&self) -> Result<ValueType, QueryError> {
        match self.projection.as_slice() {
            [item @ SelectItem::Expr { .. }] if !item.is_constant() => {
                Ok(item.value_type().unwrap_or(ValueType::Null))
            }
            _ => QueryError::ProjectionMismatch(
                "subquery must project exactly one non-entity column".into(),
            ).err(),
        }
    }

    /// Group-by, having, or an aggregate in the select list.
    pub fn is_grouped(&self) -> bool {
        !self.group_by.is_empty()
            || self.having.is_some()
            || self.projection.iter().filter_map(SelectItem::expr).any(Expr::contains_aggregate)
    }

    pub fn with_limit(&self, limit: u64) -> QueryPlan {
        let mut plan = self.clone();
        plan.limit = Some(limit);
        plan
    }

    pub fn with_page(&self, offset: Option<u64>, limit: Option<u64>) -> QueryPlan {
        let mut plan = self.clone();
        plan.offset = offset;
        plan.limit = limit;
        plan
    }

    pub fn fetch_joins(&self) -> impl Iterator<Item = &JoinClause> {
        self.joins.iter().filter(|j| j.fetch)
    }

    /// Every alias in scope: sources, then join targets.
    pub fn aliases(&self) -> Vec<&str> {
        self.sources
            .iter()
            .map(EntityPath::alias)
            .chain(self.joins.iter().map(|j| j.target.alias()))
            .collect()
    }
}
