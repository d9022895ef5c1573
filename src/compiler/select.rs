use crate::{
    compiler::{Clause, SqlWriter},
    error::QueryError,
    metadata::EntityPath,
    query::{JoinKind, JoinTarget, NullOrdering, OrderSpec, QueryPlan, SelectItem},
};

/// MySQL has no `OFFSET` without `LIMIT`; its documented workaround is
/// `LIMIT 18446744073709551615`, the largest unsigned 64-bit value.
const MYSQL_NO_LIMIT: u64 = u64::MAX;

impl SqlWriter {
    fn entity_columns(&mut self, path: &EntityPath, first: &mut bool) {
        for column in path.columns() {
            if !*first { self.push(", "); }
            *first = false;
            self.push(&column.to_string());
        }
    }

    fn projection(&mut self, plan: &QueryPlan) -> Result<(), QueryError> {
        let mut first = true;
        for item in &plan.projection {
            match item {
                SelectItem::Entity(path) => self.entity_columns(path, &mut first),
                SelectItem::Expr { .. } if item.is_constant() => {}
                SelectItem::Expr { expr, alias } => {
                    if !first { self.push(", "); }
                    first = false;
                    self.expr(expr, Clause::Select)?;
                    if let Some(alias) = alias {
                        self.push(&format!(" AS {alias}"));
                    }
                }
            }
        }
        for join in plan.fetch_joins() {
            if let Some(path) = join.entity() {
                self.entity_columns(path, &mut first);
            }
        }
        if first {
            return QueryError::UnsupportedConstruct("select list has no column to send".into()).err();
        }
        Ok(())
    }

    fn table(&mut self, path: &EntityPath) {
        self.push(&format!("{} {}", path.entity().table(), path.alias()));
    }

    /// FROM, joins and WHERE; shared by select and count.
    fn from_where(&mut self, plan: &QueryPlan) -> Result<(), QueryError> {
        self.push(" FROM ");
        for (i, source) in plan.sources.iter().enumerate() {
            if i > 0 { self.push(", "); }
            self.table(source);
        }
        for join in &plan.joins {
            let path = match &join.target {
                JoinTarget::Entity(path) => path,
                JoinTarget::SubQuery { alias, .. } => {
                    return QueryError::UnsupportedConstruct(format!("subquery join target {alias}")).err();
                }
            };
            match (&join.on, join.kind) {
                (Some(on), kind) => {
                    self.push(&format!(" {kind} "));
                    self.table(path);
                    self.push(" ON ");
                    self.predicate(on, Clause::On)?;
                }
                (None, JoinKind::Inner) => {
                    self.push(" CROSS JOIN ");
                    self.table(path);
                }
                (None, JoinKind::Left) => {
                    return QueryError::UnsupportedConstruct(format!(
                        "left join to {} needs an on condition", path.alias()
                    )).err();
                }
            }
        }
        if let Some(filter) = &plan.filter {
            self.push(" WHERE ");
            self.predicate(filter, Clause::Where)?;
        }
        Ok(())
    }

    fn order_spec(&mut self, spec: &OrderSpec) -> Result<(), QueryError> {
        let direction = if spec.is_ascending() { "ASC" } else { "DESC" };
        if self.dialect.supports_null_ordering() {
            self.expr(&spec.expr, Clause::OrderBy)?;
            self.push(&format!(" {direction}"));
            match spec.nulls {
                NullOrdering::Default => {}
                NullOrdering::First => self.push(" NULLS FIRST"),
                NullOrdering::Last => self.push(" NULLS LAST"),
            }
        } else {
            match spec.nulls {
                NullOrdering::Default => {}
                NullOrdering::First => {
                    self.expr(&spec.expr, Clause::OrderBy)?;
                    self.push(" IS NULL DESC, ");
                }
                NullOrdering::Last => {
                    self.expr(&spec.expr, Clause::OrderBy)?;
                    self.push(" IS NULL ASC, ");
                }
            }
            self.expr(&spec.expr, Clause::OrderBy)?;
            self.push(&format!(" {direction}"));
        }
        Ok(())
    }

    pub fn select(&mut self, plan: &QueryPlan) -> Result<(), QueryError> {
        self.push(if plan.distinct { "SELECT DISTINCT " } else { "SELECT " });
        self.projection(plan)?;
        self.from_where(plan)?;
        if !plan.group_by.is_empty() {
            self.push(" GROUP BY ");
            for (i, e) in plan.group_by.iter().enumerate() {
                if i > 0 { self.push(", "); }
                self.expr(e, Clause::GroupBy)?;
            }
        }
        if let Some(having) = &plan.having {
            self.push(" HAVING ");
            self.predicate(having, Clause::Having)?;
        }
        if !plan.order_by.is_empty() {
            self.push(" ORDER BY ");
            for (i, spec) in plan.order_by.iter().enumerate() {
                if i > 0 { self.push(", "); }
                self.order_spec(spec)?;
            }
        }
        match (plan.limit, plan.offset) {
            (Some(limit), _) => self.push(&format!(" LIMIT {limit}")),
            (None, Some(_)) if self.dialect.offset_needs_limit() => {
                self.push(&format!(" LIMIT {MYSQL_NO_LIMIT}"))
            }
            _ => {}
        }
        if let Some(offset) = plan.offset {
            self.push(&format!(" OFFSET {offset}"));
        }
        Ok(())
    }

    /// Row count of the query without paging or ordering.
    pub fn count(&mut self, plan: &QueryPlan) -> Result<(), QueryError> {
        if plan.is_grouped() {
            return QueryError::UnsupportedConstruct("count of a grouped query".into()).err();
        }
        if plan.distinct {
            // one per distinct row, an all-null row included
            self.push("SELECT count(*) FROM (SELECT DISTINCT ");
            self.projection(plan)?;
            self.from_where(plan)?;
            self.push(") distinct_rows");
            return Ok(());
        }
        self.push("SELECT count(*)");
        self.from_where(plan)
    }
}
