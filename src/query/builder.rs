use std::sync::Arc;

use tracing::trace;

use crate::{
    error::QueryError,
    expr::{ComparatorOp, Expr},
    metadata::{EntityPath, RelationPath},
    predicate::{compose_all, Predicate},
    query::{JoinClause, JoinKind, JoinTarget, OrderSpec, QueryPlan, SelectItem},
};

/// Fluent select-query builder.
///
/// Clause methods never fail; problems found along the way are kept and the
/// first one is returned by [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    projection: Vec<SelectItem>,
    distinct: bool,
    sources: Vec<EntityPath>,
    joins: Vec<JoinClause>,
    filters: Vec<Predicate>,
    group_by: Vec<Expr>,
    having: Vec<Predicate>,
    order_by: Vec<OrderSpec>,
    offset: Option<u64>,
    limit: Option<u64>,
    error: Option<QueryError>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn fail(&mut self, err: QueryError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    pub fn select<S: Into<SelectItem>>(mut self, items: impl IntoIterator<Item = S>) -> Self {
        self.projection = items.into_iter().map(Into::into).collect();
        self
    }

    pub fn select_distinct<S: Into<SelectItem>>(self, items: impl IntoIterator<Item = S>) -> Self {
        let mut builder = self.select(items);
        builder.distinct = true;
        builder
    }

    /// `select(path).from(path)`
    pub fn select_from(self, path: &EntityPath) -> Self {
        self.select([path]).from(path)
    }

    /// Adds a source. Several sources are cross joined and filtered in WHERE.
    pub fn from(mut self, path: &EntityPath) -> Self {
        self.sources.push(path.clone());
        self
    }

    fn relation_join(mut self, kind: JoinKind, relation: &RelationPath, target: &EntityPath) -> Self {
        if relation.target() != target.name() {
            self.fail(QueryError::UnsupportedConstruct(format!(
                "relation {}.{} points to {}, not {}",
                relation.owner_alias, relation.name, relation.target(), target.name()
            )));
            return self;
        }
        let target_column = relation.relation.target_column.as_deref().unwrap_or(target.entity().id_column());
        match target.column(target_column) {
            Ok(right) => {
                let on = Predicate::Compare { left: Expr::Column(relation.fk.clone()), op: ComparatorOp::Eq, right };
                self.joins.push(JoinClause {
                    kind,
                    target: JoinTarget::Entity(target.clone()),
                    on: Some(on),
                    relation: Some((relation.owner_alias.clone(), relation.name.clone())),
                    fetch: false,
                });
            }
            Err(e) => self.fail(e),
        }
        self
    }

    /// Inner join over a declared relation; the join condition is inferred.
    pub fn join(self, relation: &RelationPath, target: &EntityPath) -> Self {
        self.relation_join(JoinKind::Inner, relation, target)
    }

    pub fn left_join(self, relation: &RelationPath, target: &EntityPath) -> Self {
        self.relation_join(JoinKind::Left, relation, target)
    }

    fn entity_join(mut self, kind: JoinKind, target: &EntityPath) -> Self {
        self.joins.push(JoinClause {
            kind,
            target: JoinTarget::Entity(target.clone()),
            on: None,
            relation: None,
            fetch: false,
        });
        self
    }

    /// Join without a relation. Without `on` this is a cross join.
    pub fn join_entity(self, target: &EntityPath) -> Self {
        self.entity_join(JoinKind::Inner, target)
    }

    /// Left join without a relation; needs an `on`.
    pub fn left_join_entity(self, target: &EntityPath) -> Self {
        self.entity_join(JoinKind::Left, target)
    }

    /// Joins a derived table. Kept so such queries fail at `build` with a
    /// clear error instead of being silently rewritten.
    pub fn join_subquery(mut self, plan: QueryPlan, alias: &str) -> Self {
        self.joins.push(JoinClause {
            kind: JoinKind::Inner,
            target: JoinTarget::SubQuery { plan: Arc::new(plan), alias: alias.to_string() },
            on: None,
            relation: None,
            fetch: false,
        });
        self
    }

    /// Adds a condition to the most recent join.
    pub fn on(mut self, pred: Predicate) -> Self {
        match self.joins.last_mut() {
            Some(join) => {
                join.on = Some(match join.on.take() {
                    Some(existing) => existing.and(pred),
                    None => pred,
                });
            }
            None => self.fail(QueryError::UnsupportedConstruct("on without a preceding join".into())),
        }
        self
    }

    /// Marks the most recent join as a fetch join.
    pub fn fetch_join(mut self) -> Self {
        match self.joins.last_mut() {
            Some(join) => join.fetch = true,
            None => self.fail(QueryError::UnsupportedConstruct("fetch_join without a preceding join".into())),
        }
        self
    }

    /// Repeated calls are AND-ed.
    pub fn filter(mut self, pred: Predicate) -> Self {
        self.filters.push(pred);
        self
    }

    /// Absent predicates are skipped.
    pub fn filter_all(mut self, preds: impl IntoIterator<Item = Option<Predicate>>) -> Self {
        if let Some(p) = compose_all(preds) {
            self.filters.push(p);
        }
        self
    }

    pub fn group_by<E: Into<Expr>>(mut self, exprs: impl IntoIterator<Item = E>) -> Self {
        self.group_by.extend(exprs.into_iter().map(Into::into));
        self
    }

    pub fn having(mut self, pred: Predicate) -> Self {
        self.having.push(pred);
        self
    }

    pub fn order_by(mut self, specs: impl IntoIterator<Item = OrderSpec>) -> Self {
        self.order_by.extend(specs);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn build(self) -> Result<QueryPlan, QueryError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if self.projection.is_empty() {
            return QueryError::IncompleteQuery("no projection".into()).err();
        }
        if self.sources.is_empty() {
            return QueryError::IncompleteQuery("no source entity".into()).err();
        }
        for join in &self.joins {
            match (&join.target, join.kind, &join.on) {
                (JoinTarget::SubQuery { alias, .. }, _, _) => {
                    return QueryError::UnsupportedConstruct(format!("subquery join target {alias}")).err();
                }
                (JoinTarget::Entity(path), JoinKind::Left, None) => {
                    return QueryError::UnsupportedConstruct(format!(
                        "left join to {} needs an on condition", path.alias()
                    )).err();
                }
                _ => {}
            }
        }

        let plan = QueryPlan {
            projection: self.projection,
            distinct: self.distinct,
            sources: self.sources,
            joins: self.joins,
            filter: compose_all(self.filters.into_iter().map(Some)),
            group_by: self.group_by,
            having: compose_all(self.having.into_iter().map(Some)),
            order_by: self.order_by,
            offset: self.offset,
            limit: self.limit,
        };

        let aliases = plan.aliases();
        for (i, alias) in aliases.iter().enumerate() {
            if aliases[..i].contains(alias) {
                return QueryError::UnsupportedConstruct(format!("alias {alias} used twice")).err();
            }
        }
        for join in &plan.joins {
            if let Some((owner, name)) = &join.relation {
                if !aliases.contains(&owner.as_str()) {
                    return QueryError::UnsupportedConstruct(format!(
                        "relation {owner}.{name} joined from an alias not in scope"
                    )).err();
                }
            }
        }

        trace!(sources = plan.sources.len(), joins = plan.joins.len(), "query plan built");
        Ok(plan)
    }
}
