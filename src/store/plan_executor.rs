use std::{cmp::Ordering, collections::{HashMap, HashSet}};

use indexmap::IndexMap;

use crate::{
    error::QueryError,
    executor::Row,
    expr::Value,
    metadata::EntityPath,
    predicate::Predicate,
    query::{DeletePlan, JoinKind, QueryPlan, SelectItem, UpdatePlan},
    store::{Frame, Helpers, Scope, Table},
};

/// One output candidate: a row, or a group's representative row with its members.
struct Unit {
    row: Scope,
    group: Option<Vec<Scope>>,
}

impl Unit {
    fn frame<'a>(&'a self, outer: Option<&'a Frame<'a>>) -> Frame<'a> {
        Frame { row: &self.row, group: self.group.as_deref(), outer }
    }
}

/// Interprets plans against a snapshot of the store's tables.
///
/// Select pipeline: sources (cross product), joins, where, group + having,
/// order, projection, distinct, offset/limit.
pub struct PlanExecutor<'s> {
    tables: &'s HashMap<String, Table>,
}

impl<'s> PlanExecutor<'s> {
    pub fn new(tables: &'s HashMap<String, Table>) -> Self {
        Self { tables }
    }

    fn table(&self, path: &EntityPath) -> Result<&'s Table, QueryError> {
        self.tables
            .get(path.entity().table())
            .ok_or_else(|| QueryError::Storage(format!("no table {} in the store", path.entity().table())))
    }

    fn scan(&self, path: &EntityPath) -> Result<Vec<Scope>, QueryError> {
        Ok(self.table(path)?.scan(path.alias()).into_iter().map(|(_, row)| row).collect())
    }

    fn null_scope(path: &EntityPath) -> Scope {
        path.columns().into_iter().map(|c| (c.key(), Value::Null)).collect()
    }

    fn merge(left: &Scope, right: &Scope) -> Scope {
        let mut out = left.clone();
        out.extend(right.iter().map(|(k, v)| (k.clone(), v.clone())));
        out
    }

    /// FROM, JOIN and WHERE.
    fn joined_rows(&self, plan: &QueryPlan, outer: Option<&Frame<'_>>) -> Result<Vec<Scope>, QueryError> {
        let mut rows = vec![Scope::new()];
        for source in &plan.sources {
            let right = self.scan(source)?;
            rows = rows
                .iter()
                .flat_map(|l| right.iter().map(move |r| Self::merge(l, r)))
                .collect();
        }

        for join in &plan.joins {
            let path = join.entity().ok_or_else(|| {
                QueryError::UnsupportedConstruct(format!("subquery join {} cannot be executed", join.target.alias()))
            })?;
            let right = self.scan(path)?;
            let nulls = Self::null_scope(path);
            let mut next = Vec::new();
            for l in &rows {
                let mut matched = false;
                for r in &right {
                    let merged = Self::merge(l, r);
                    let keep = match &join.on {
                        Some(on) => self.eval_predicate3(on, &Frame::nested(&merged, outer))?.is_true(),
                        None => true,
                    };
                    if keep {
                        next.push(merged);
                        matched = true;
                    }
                }
                if !matched && join.kind == JoinKind::Left {
                    next.push(Self::merge(l, &nulls));
                }
            }
            rows = next;
        }

        match &plan.filter {
            None => Ok(rows),
            Some(filter) => {
                let mut kept = Vec::with_capacity(rows.len());
                for row in rows {
                    if self.eval_predicate3(filter, &Frame::nested(&row, outer))?.is_true() {
                        kept.push(row);
                    }
                }
                Ok(kept)
            }
        }
    }

    fn group(&self, plan: &QueryPlan, rows: Vec<Scope>, outer: Option<&Frame<'_>>) -> Result<Vec<Unit>, QueryError> {
        let mut groups: IndexMap<Vec<Value>, Vec<Scope>> = IndexMap::new();
        for row in rows {
            let key = plan
                .group_by
                .iter()
                .map(|e| self.eval(e, &Frame::nested(&row, outer)))
                .collect::<Result<Vec<_>, _>>()?;
            groups.entry(key).or_default().push(row);
        }
        // aggregates without GROUP BY always yield one row
        if groups.is_empty() && plan.group_by.is_empty() {
            groups.insert(vec![], vec![]);
        }

        let mut units = Vec::with_capacity(groups.len());
        for (_, members) in groups {
            let row = match members.first() {
                Some(first) => first.clone(),
                None => plan
                    .sources
                    .iter()
                    .chain(plan.joins.iter().filter_map(|j| j.entity()))
                    .flat_map(Self::null_scope)
                    .collect(),
            };
            let unit = Unit { row, group: Some(members) };
            if let Some(having) = &plan.having {
                if !self.eval_predicate3(having, &unit.frame(outer))?.is_true() {
                    continue;
                }
            }
            units.push(unit);
        }
        Ok(units)
    }

    fn sort(&self, plan: &QueryPlan, units: Vec<Unit>, outer: Option<&Frame<'_>>) -> Result<Vec<Unit>, QueryError> {
        if plan.order_by.is_empty() {
            return Ok(units);
        }
        let mut keyed = Vec::with_capacity(units.len());
        for unit in units {
            let keys = {
                let frame = unit.frame(outer);
                plan.order_by.iter().map(|o| self.eval(&o.expr, &frame)).collect::<Result<Vec<_>, _>>()?
            };
            keyed.push((keys, unit));
        }
        keyed.sort_by(|(a, _), (b, _)| {
            for (i, spec) in plan.order_by.iter().enumerate() {
                let ord = Helpers::cmp_for_sort(&a[i], &b[i], spec.direction, spec.nulls);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
        Ok(keyed.into_iter().map(|(_, u)| u).collect())
    }

    /// Cells in select-list order, then fetch-joined entity columns.
    fn project(&self, plan: &QueryPlan, unit: &Unit, outer: Option<&Frame<'_>>) -> Result<Row, QueryError> {
        let frame = unit.frame(outer);
        let entity_cells = |path: &EntityPath, out: &mut Row| {
            for c in path.columns() {
                out.push(unit.row.get(&c.key()).cloned().unwrap_or(Value::Null));
            }
        };
        let mut out = Vec::new();
        for item in &plan.projection {
            match item {
                SelectItem::Entity(path) => entity_cells(path, &mut out),
                SelectItem::Expr { .. } if item.is_constant() => {}
                SelectItem::Expr { expr, .. } => out.push(self.eval(expr, &frame)?),
            }
        }
        for join in plan.fetch_joins() {
            if let Some(path) = join.entity() {
                entity_cells(path, &mut out);
            }
        }
        Ok(out)
    }

    pub fn select(&self, plan: &QueryPlan, outer: Option<&Frame<'_>>) -> Result<Vec<Row>, QueryError> {
        let rows = self.joined_rows(plan, outer)?;
        let units = if plan.is_grouped() {
            self.group(plan, rows, outer)?
        } else {
            rows.into_iter().map(|row| Unit { row, group: None }).collect()
        };
        let units = self.sort(plan, units, outer)?;

        let mut out = Vec::with_capacity(units.len());
        for unit in &units {
            out.push(self.project(plan, unit, outer)?);
        }
        if plan.distinct {
            let mut seen = HashSet::new();
            out.retain(|row| seen.insert(row.clone()));
        }

        let offset = plan.offset.map_or(0, |o| usize::try_from(o).unwrap_or(usize::MAX));
        let limit = plan.limit.map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        Ok(out.into_iter().skip(offset).take(limit).collect())
    }

    /// Rows the plan would return, ignoring order, offset and limit.
    pub fn count(&self, plan: &QueryPlan) -> Result<i64, QueryError> {
        if plan.is_grouped() {
            return QueryError::UnsupportedConstruct("count over a grouped query".into()).err();
        }
        let rows = self.joined_rows(plan, None)?;
        if !plan.distinct {
            return Ok(rows.len() as i64);
        }
        // one per distinct projected row, an all-null row included
        let mut seen = HashSet::new();
        for row in rows {
            seen.insert(self.project(plan, &Unit { row, group: None }, None)?);
        }
        Ok(seen.len() as i64)
    }

    /// Storage keys of the target rows matching `filter`, with their scopes.
    fn matching(&self, path: &EntityPath, filter: Option<&Predicate>) -> Result<Vec<(String, Scope)>, QueryError> {
        let mut out = vec![];
        for (key, row) in self.table(path)?.scan(path.alias()) {
            let keep = match filter {
                Some(f) => self.eval_predicate3(f, &Frame::new(&row))?.is_true(),
                None => true,
            };
            if keep {
                out.push((key, row));
            }
        }
        Ok(out)
    }

    /// New column values per matching row, all computed from pre-update values.
    pub fn update_changes(&self, plan: &UpdatePlan) -> Result<Vec<(String, Vec<(String, Value)>)>, QueryError> {
        let mut changes = vec![];
        for (key, row) in self.matching(&plan.target, plan.filter.as_ref())? {
            let frame = Frame::new(&row);
            let mut values = Vec::with_capacity(plan.assignments.len());
            for a in &plan.assignments {
                values.push((a.column.column.clone(), self.eval(&a.value, &frame)?));
            }
            changes.push((key, values));
        }
        Ok(changes)
    }

    pub fn delete_keys(&self, plan: &DeletePlan) -> Result<Vec<String>, QueryError> {
        Ok(self.matching(&plan.target, plan.filter.as_ref())?.into_iter().map(|(k, _)| k).collect())
    }
}
