use crate::{
    compiler::BoundStatement,
    config::Dialect,
    error::QueryError,
    expr::{CaseTest, Expr, Value, LIKE_ESCAPE},
    metadata::ValueType,
    predicate::Predicate,
    query::QueryPlan,
};

/// Where an expression is being written. Decides whether aggregates are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clause {
    Select,
    On,
    Where,
    GroupBy,
    Having,
    OrderBy,
    Set,
}

impl Clause {
    fn allows_aggregates(self) -> bool {
        matches!(self, Clause::Select | Clause::Having | Clause::OrderBy)
    }

    fn name(self) -> &'static str {
        match self {
            Clause::Select => "SELECT",
            Clause::On => "ON",
            Clause::Where => "WHERE",
            Clause::GroupBy => "GROUP BY",
            Clause::Having => "HAVING",
            Clause::OrderBy => "ORDER BY",
            Clause::Set => "SET",
        }
    }
}

/// Single-pass SQL text buffer. Parameters are pushed exactly when their
/// placeholder is written, so nested subqueries keep global ordering and
/// numbered placeholders keep counting.
pub struct SqlWriter {
    pub(crate) dialect: Dialect,
    sql: String,
    params: Vec<Value>,
    in_aggregate: bool,
}

impl SqlWriter {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect, sql: String::new(), params: vec![], in_aggregate: false }
    }

    pub fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    pub fn param(&mut self, value: Value) {
        self.params.push(value);
        let placeholder = self.dialect.placeholder(self.params.len());
        self.sql.push_str(&placeholder);
    }

    pub fn finish(self) -> BoundStatement {
        BoundStatement { sql: self.sql, params: self.params }
    }

    fn list(&mut self, items: &[Expr], clause: Clause) -> Result<(), QueryError> {
        for (i, e) in items.iter().enumerate() {
            if i > 0 { self.push(", "); }
            self.expr(e, clause)?;
        }
        Ok(())
    }

    fn sql_type(&self, ty: ValueType) -> &'static str {
        match ty {
            ValueType::Text | ValueType::Null => self.dialect.text_cast_type(),
            ValueType::Int => "BIGINT",
            ValueType::Float => "DOUBLE PRECISION",
            ValueType::Bool => "BOOLEAN",
            ValueType::Date => "DATE",
        }
    }

    pub fn expr(&mut self, e: &Expr, clause: Clause) -> Result<(), QueryError> {
        match e {
            Expr::Column(c) => self.push(&c.to_string()),
            Expr::Literal(v) => self.param(v.clone()),
            Expr::Constant(v) => {
                return QueryError::UnsupportedConstruct(format!("constant {v} outside the select list")).err();
            }
            Expr::Binary { left, op, right } => {
                self.push("(");
                self.expr(left, clause)?;
                self.push(&format!(" {op} "));
                self.expr(right, clause)?;
                self.push(")");
            }
            Expr::Concat { left, right } => {
                if self.dialect.concat_with_function() {
                    self.push("CONCAT(");
                    self.expr(left, clause)?;
                    self.push(", ");
                    self.expr(right, clause)?;
                    self.push(")");
                } else {
                    self.push("(");
                    self.expr(left, clause)?;
                    self.push(" || ");
                    self.expr(right, clause)?;
                    self.push(")");
                }
            }
            Expr::Function { name, args, .. } => {
                self.push(name);
                self.push("(");
                self.list(args, clause)?;
                self.push(")");
            }
            Expr::Cast { expr, ty } => {
                self.push("CAST(");
                self.expr(expr, clause)?;
                let ty = self.sql_type(*ty);
                self.push(&format!(" AS {ty})"));
            }
            Expr::Aggregate { func, arg, distinct } => {
                if !clause.allows_aggregates() {
                    return QueryError::UnsupportedConstruct(format!("aggregate {e} in {}", clause.name())).err();
                }
                if self.in_aggregate {
                    return QueryError::UnsupportedConstruct(format!("nested aggregate {e}")).err();
                }
                self.push(func.name());
                self.push("(");
                match arg {
                    None => self.push("*"),
                    Some(a) => {
                        if *distinct { self.push("DISTINCT "); }
                        self.in_aggregate = true;
                        let written = self.expr(a, clause);
                        self.in_aggregate = false;
                        written?;
                    }
                }
                self.push(")");
            }
            Expr::Case(case) => {
                self.push("CASE");
                if let Some(subject) = &case.subject {
                    self.push(" ");
                    self.expr(subject, clause)?;
                }
                for branch in &case.branches {
                    self.push(" WHEN ");
                    match &branch.test {
                        CaseTest::Value(v) => self.expr(v, clause)?,
                        CaseTest::Predicate(p) => self.predicate(p, clause)?,
                    }
                    self.push(" THEN ");
                    self.expr(&branch.then, clause)?;
                }
                if let Some(otherwise) = &case.otherwise {
                    self.push(" ELSE ");
                    self.expr(otherwise, clause)?;
                }
                self.push(" END");
            }
            Expr::SubQuery(plan) => self.subquery(plan)?,
        }
        Ok(())
    }

    fn subquery(&mut self, plan: &QueryPlan) -> Result<(), QueryError> {
        // Aggregates inside belong to the inner query.
        let outer = self.in_aggregate;
        self.in_aggregate = false;
        self.push("(");
        let written = self.select(plan);
        self.push(")");
        self.in_aggregate = outer;
        written
    }

    fn joined(&mut self, parts: &[Predicate], sep: &str, clause: Clause) -> Result<(), QueryError> {
        for (i, p) in parts.iter().enumerate() {
            if i > 0 { self.push(sep); }
            self.push("(");
            self.predicate(p, clause)?;
            self.push(")");
        }
        Ok(())
    }

    pub fn predicate(&mut self, p: &Predicate, clause: Clause) -> Result<(), QueryError> {
        match p {
            Predicate::And(v) => self.joined(v, " AND ", clause)?,
            Predicate::Or(v) => self.joined(v, " OR ", clause)?,
            Predicate::Not(inner) => {
                self.push("NOT (");
                self.predicate(inner, clause)?;
                self.push(")");
            }
            Predicate::Compare { left, op, right } => {
                self.expr(left, clause)?;
                self.push(&format!(" {op} "));
                self.expr(right, clause)?;
            }
            Predicate::IsNull { expr, negated } => {
                self.expr(expr, clause)?;
                self.push(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            Predicate::InList { expr, list, negated } => {
                self.expr(expr, clause)?;
                self.push(if *negated { " NOT IN (" } else { " IN (" });
                self.list(list, clause)?;
                self.push(")");
            }
            Predicate::InSubQuery { expr, plan, negated } => {
                self.expr(expr, clause)?;
                self.push(if *negated { " NOT IN " } else { " IN " });
                self.subquery(plan)?;
            }
            Predicate::Like { expr, pattern, negated } => {
                self.expr(expr, clause)?;
                self.push(if *negated { " NOT LIKE " } else { " LIKE " });
                self.expr(pattern, clause)?;
                self.push(&format!(" ESCAPE '{LIKE_ESCAPE}'"));
            }
        }
        Ok(())
    }
}
