use crate::{
    error::QueryError,
    expr::{ColumnRef, Expr, Value},
    metadata::{EntityPath, ValueType},
    predicate::{compose_all, Predicate},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: ColumnRef,
    pub value: Expr,
}

/// Bulk update. Runs straight against storage.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePlan {
    pub target: EntityPath,
    pub assignments: Vec<Assignment>,
    pub filter: Option<Predicate>,
}

/// Bulk delete. Runs straight against storage.
#[derive(Debug, Clone, PartialEq)]
pub struct DeletePlan {
    pub target: EntityPath,
    pub filter: Option<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertPlan {
    pub target: EntityPath,
    pub values: Vec<(ColumnRef, Value)>,
}

/// Statements answered with an affected-row count.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationPlan {
    Update(UpdatePlan),
    Delete(DeletePlan),
}

impl From<UpdatePlan> for MutationPlan {
    fn from(p: UpdatePlan) -> Self { MutationPlan::Update(p) }
}
impl From<&UpdatePlan> for MutationPlan {
    fn from(p: &UpdatePlan) -> Self { MutationPlan::Update(p.clone()) }
}
impl From<DeletePlan> for MutationPlan {
    fn from(p: DeletePlan) -> Self { MutationPlan::Delete(p) }
}
impl From<&DeletePlan> for MutationPlan {
    fn from(p: &DeletePlan) -> Self { MutationPlan::Delete(p.clone()) }
}

/// Resolves `column` to a column of `target`, checking `value_ty` fits it.
fn target_column(target: &EntityPath, column: &Expr, value_ty: ValueType, context: &str) -> Result<ColumnRef, QueryError> {
    let c = match column {
        Expr::Column(c) if c.alias == target.alias() => c,
        other => {
            return QueryError::UnsupportedConstruct(format!(
                "{context} target {other} is not a column of {}", target.alias()
            )).err();
        }
    };
    let def = target.entity().column(&c.column).ok_or_else(|| QueryError::UnknownColumn {
        entity: target.name().to_string(),
        column: c.column.clone(),
    })?;
    if value_ty == ValueType::Null && !def.nullable {
        return Err(QueryError::type_mismatch(context, &format!("non-null {}", def.ty), value_ty));
    }
    if !ValueType::assignable(def.ty, value_ty) {
        return Err(QueryError::type_mismatch(context, &def.ty.to_string(), value_ty));
    }
    Ok(c.clone())
}

#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    target: EntityPath,
    assignments: Vec<Assignment>,
    filters: Vec<Predicate>,
}

impl UpdateBuilder {
    pub fn new(target: &EntityPath) -> Self {
        Self { target: target.clone(), assignments: vec![], filters: vec![] }
    }

    pub fn set(self, column: &Expr, value: impl Into<Value>) -> Result<Self, QueryError> {
        self.set_expr(column, Expr::Literal(value.into()))
    }

    /// Assigns a computed value, e.g. `age = age + 1`.
    pub fn set_expr(mut self, column: &Expr, value: impl Into<Expr>) -> Result<Self, QueryError> {
        let value = value.into();
        if value.contains_aggregate() {
            return QueryError::UnsupportedConstruct("aggregate in update assignment".into()).err();
        }
        let column = target_column(&self.target, column, value.value_type(), "set")?;
        self.assignments.push(Assignment { column, value });
        Ok(self)
    }

    pub fn filter(mut self, pred: Predicate) -> Self {
        self.filters.push(pred);
        self
    }

    pub fn build(self) -> Result<UpdatePlan, QueryError> {
        if self.assignments.is_empty() {
            return QueryError::IncompleteQuery("update without assignments".into()).err();
        }
        Ok(UpdatePlan {
            target: self.target,
            assignments: self.assignments,
            filter: compose_all(self.filters.into_iter().map(Some)),
        })
    }
}

#[derive(Debug, Clone)]
pub struct DeleteBuilder {
    target: EntityPath,
    filters: Vec<Predicate>,
}

impl DeleteBuilder {
    pub fn new(target: &EntityPath) -> Self {
        Self { target: target.clone(), filters: vec![] }
    }

    pub fn filter(mut self, pred: Predicate) -> Self {
        self.filters.push(pred);
        self
    }

    pub fn build(self) -> DeletePlan {
        DeletePlan { target: self.target, filter: compose_all(self.filters.into_iter().map(Some)) }
    }
}

#[derive(Debug, Clone)]
pub struct InsertBuilder {
    target: EntityPath,
    values: Vec<(ColumnRef, Value)>,
}

impl InsertBuilder {
    pub fn new(target: &EntityPath) -> Self {
        Self { target: target.clone(), values: vec![] }
    }

    pub fn value(mut self, column: &Expr, value: impl Into<Value>) -> Result<Self, QueryError> {
        let value = value.into();
        let column = target_column(&self.target, column, value.value_type(), "value")?;
        self.values.retain(|(c, _)| c.column != column.column);
        self.values.push((column, value));
        Ok(self)
    }

    pub fn build(self) -> Result<InsertPlan, QueryError> {
        if self.values.is_empty() {
            return QueryError::IncompleteQuery("insert without values".into()).err();
        }
        Ok(InsertPlan { target: self.target, values: self.values })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{member, team};

    #[test]
    fn set_checks_value_type_against_column() {
        let m = member("m");
        let err = UpdateBuilder::new(&m.path).set(&m.age, "old").unwrap_err();
        assert_eq!(err, QueryError::type_mismatch("set", "Int", ValueType::Text));
        assert!(UpdateBuilder::new(&m.path).set(&m.username, "비회원").is_ok());
    }

    #[test]
    fn set_rejects_columns_of_other_aliases() {
        let (m, t) = (member("m"), team("t"));
        let err = UpdateBuilder::new(&m.path).set(&t.name, "x").unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedConstruct(_)));
    }

    #[test]
    fn update_needs_assignments() {
        let m = member("m");
        let err = UpdateBuilder::new(&m.path).filter(m.age.lt(28).unwrap()).build().unwrap_err();
        assert!(matches!(err, QueryError::IncompleteQuery(_)));
    }

    #[test]
    fn null_only_fits_nullable_columns() {
        let m = member("m");
        assert!(UpdateBuilder::new(&m.path).set(&m.team_id, Value::Null).is_ok());
        assert!(matches!(
            UpdateBuilder::new(&m.path).set(&m.age, Value::Null),
            Err(QueryError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn assignments_never_narrow_a_float_into_an_int_column() {
        let m = member("m");
        let err = UpdateBuilder::new(&m.path).set_expr(&m.age, m.age.mul(1.5).unwrap()).unwrap_err();
        assert_eq!(err, QueryError::type_mismatch("set", "Int", ValueType::Float));
        assert!(matches!(UpdateBuilder::new(&m.path).set(&m.age, 2.0), Err(QueryError::TypeMismatch { .. })));
        assert!(matches!(InsertBuilder::new(&m.path).value(&m.age, 30.5), Err(QueryError::TypeMismatch { .. })));
        assert!(UpdateBuilder::new(&m.path).set_expr(&m.age, m.age.mul(2).unwrap()).is_ok());
    }

    #[test]
    fn insert_keeps_last_value_per_column() {
        let t = team("t");
        let plan = InsertBuilder::new(&t.path).value(&t.name, "a").unwrap().value(&t.name, "b").unwrap().build().unwrap();
        assert_eq!(plan.values.len(), 1);
        assert_eq!(plan.values[0].1, Value::from("b"));
    }
}
