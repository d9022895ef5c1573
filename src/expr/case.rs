use std::fmt;

use crate::{error::QueryError, expr::Expr, metadata::ValueType, predicate::Predicate};

#[derive(Debug, Clone, PartialEq)]
pub enum CaseTest {
    /// Simple case: compared for equality against the subject.
    Value(Expr),
    /// Searched case.
    Predicate(Predicate),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseBranch {
    pub test: CaseTest,
    pub then: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseExpr {
    pub subject: Option<Expr>,
    pub branches: Vec<CaseBranch>,
    pub otherwise: Option<Expr>,
    pub ty: ValueType,
}

impl CaseExpr {
    pub fn contains_aggregate(&self) -> bool {
        self.subject.as_ref().is_some_and(Expr::contains_aggregate)
            || self.otherwise.as_ref().is_some_and(Expr::contains_aggregate)
            || self.branches.iter().any(|b| {
                b.then.contains_aggregate()
                    || match &b.test {
                        CaseTest::Value(e) => e.contains_aggregate(),
                        CaseTest::Predicate(p) => p.contains_aggregate(),
                    }
            })
    }
}

/// Result branches must agree; the accumulated type widens `Int` to `Float`.
fn unify(ty: ValueType, then: &Expr) -> Result<ValueType, QueryError> {
    let found = then.value_type();
    if ValueType::compatible(ty, found) {
        Ok(ValueType::promote(ty, found))
    } else {
        Err(QueryError::type_mismatch("then", &ty.to_string(), found))
    }
}

fn finish(subject: Option<Expr>, branches: Vec<CaseBranch>, otherwise: Option<Expr>, ty: ValueType) -> Expr {
    Expr::Case(Box::new(CaseExpr { subject, branches, otherwise, ty }))
}

/// Simple case waiting for the `then` of its latest `when`.
#[derive(Debug, Clone)]
pub struct SimpleCaseWhen {
    case: SimpleCase,
    value: Expr,
}

impl SimpleCaseWhen {
    pub(crate) fn start(subject: Expr, value: Expr) -> Result<Self, QueryError> {
        SimpleCase { subject, branches: vec![], ty: ValueType::Null }.when(value)
    }

    pub fn then(self, result: impl Into<Expr>) -> Result<SimpleCase, QueryError> {
        let result = result.into();
        let mut case = self.case;
        case.ty = unify(case.ty, &result)?;
        case.branches.push(CaseBranch { test: CaseTest::Value(self.value), then: result });
        Ok(case)
    }
}

#[derive(Debug, Clone)]
pub struct SimpleCase {
    subject: Expr,
    branches: Vec<CaseBranch>,
    ty: ValueType,
}

impl SimpleCase {
    pub fn when(self, value: impl Into<Expr>) -> Result<SimpleCaseWhen, QueryError> {
        let value = value.into();
        let (subject, found) = (self.subject.value_type(), value.value_type());
        if !ValueType::compatible(subject, found) {
            return Err(QueryError::type_mismatch("when", &subject.to_string(), found));
        }
        Ok(SimpleCaseWhen { case: self, value })
    }

    pub fn otherwise(self, result: impl Into<Expr>) -> Result<Expr, QueryError> {
        let result = result.into();
        let ty = unify(self.ty, &result)?;
        Ok(finish(Some(self.subject), self.branches, Some(result), ty))
    }

    /// Without an else branch unmatched rows yield null.
    pub fn end(self) -> Expr {
        finish(Some(self.subject), self.branches, None, self.ty)
    }
}

/// Searched case under construction.
#[derive(Debug, Clone, Default)]
pub struct CaseBuilder {
    branches: Vec<CaseBranch>,
    ty: ValueType,
}

impl CaseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn when(self, condition: Predicate) -> CaseWhen {
        CaseWhen { case: self, condition }
    }

    pub fn otherwise(self, result: impl Into<Expr>) -> Result<Expr, QueryError> {
        if self.branches.is_empty() {
            return QueryError::IncompleteQuery("case needs at least one when".into()).err();
        }
        let result = result.into();
        let ty = unify(self.ty, &result)?;
        Ok(finish(None, self.branches, Some(result), ty))
    }

    pub fn end(self) -> Result<Expr, QueryError> {
        if self.branches.is_empty() {
            return QueryError::IncompleteQuery("case needs at least one when".into()).err();
        }
        Ok(finish(None, self.branches, None, self.ty))
    }
}

pub struct CaseWhen {
    case: CaseBuilder,
    condition: Predicate,
}

impl CaseWhen {
    pub fn then(self, result: impl Into<Expr>) -> Result<CaseBuilder, QueryError> {
        let result = result.into();
        let mut case = self.case;
        case.ty = unify(case.ty, &result)?;
        case.branches.push(CaseBranch { test: CaseTest::Predicate(self.condition), then: result });
        Ok(case)
    }
}

impl fmt::Display for CaseExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "case")?;
        if let Some(s) = &self.subject {
            write!(f, " {s}")?;
        }
        for b in &self.branches {
            match &b.test {
                CaseTest::Value(v) => write!(f, " when {v} then {}", b.then)?,
                CaseTest::Predicate(p) => write!(f, " when {p} then {}", b.then)?,
            }
        }
        if let Some(o) = &self.otherwise {
            write!(f, " else {o}")?;
        }
        write!(f, " end")
    }
}
