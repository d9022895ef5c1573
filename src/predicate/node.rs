use std::{fmt, sync::Arc};

use crate::{expr::{ComparatorOp, Expr}, query::QueryPlan};

/// Boolean condition over expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    Compare { left: Expr, op: ComparatorOp, right: Expr },
    IsNull { expr: Expr, negated: bool },
    InList { expr: Expr, list: Vec<Expr>, negated: bool },
    InSubQuery { expr: Expr, plan: Arc<QueryPlan>, negated: bool },
    /// Pattern uses `!` as its escape character.
    Like { expr: Expr, pattern: Expr, negated: bool },
}

impl Predicate {
    pub fn and(self, other: Predicate) -> Predicate {
        Predicate::And(vec![self, other])
    }

    pub fn or(self, other: Predicate) -> Predicate {
        Predicate::Or(vec![self, other])
    }

    pub fn not(self) -> Predicate {
        Predicate::Not(Box::new(self))
    }

    pub fn contains_aggregate(&self) -> bool {
        match self {
            Predicate::And(v) | Predicate::Or(v) => v.iter().any(Predicate::contains_aggregate),
            Predicate::Not(p) => p.contains_aggregate(),
            Predicate::Compare { left, right, .. } => left.contains_aggregate() || right.contains_aggregate(),
            Predicate::IsNull { expr, .. } | Predicate::InSubQuery { expr, .. } => expr.contains_aggregate(),
            Predicate::InList { expr, list, .. } => {
                expr.contains_aggregate() || list.iter().any(Expr::contains_aggregate)
            }
            Predicate::Like { expr, pattern, .. } => expr.contains_aggregate() || pattern.contains_aggregate(),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, parts: &[Predicate], sep: &str) -> fmt::Result {
    for (i, p) in parts.iter().enumerate() {
        if i > 0 { write!(f, " {sep} ")?; }
        write!(f, "({p})")?;
    }
    Ok(())
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::And(v) => write_joined(f, v, "and"),
            Predicate::Or(v) => write_joined(f, v, "or"),
            Predicate::Not(p) => write!(f, "not ({p})"),
            Predicate::Compare { left, op, right } => write!(f, "{left} {op} {right}"),
            Predicate::IsNull { expr, negated } => {
                write!(f, "{expr} is {}null", if *negated { "not " } else { "" })
            }
            Predicate::InList { expr, list, negated } => {
                write!(f, "{expr} {}in (", if *negated { "not " } else { "" })?;
                for (i, e) in list.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{e}")?;
                }
                write!(f, ")")
            }
            Predicate::InSubQuery { expr, negated, .. } => {
                write!(f, "{expr} {}in (subquery)", if *negated { "not " } else { "" })
            }
            Predicate::Like { expr, pattern, negated } => {
                write!(f, "{expr} {}like {pattern}", if *negated { "not " } else { "" })
            }
        }
    }
}
