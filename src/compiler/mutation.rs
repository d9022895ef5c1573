use crate::{
    compiler::{Clause, SqlWriter},
    error::QueryError,
    query::{DeletePlan, InsertPlan, UpdatePlan},
};

impl SqlWriter {
    /// SET parameters are written, and therefore bound, before WHERE parameters.
    pub fn update(&mut self, plan: &UpdatePlan) -> Result<(), QueryError> {
        let target = &plan.target;
        self.push(&format!("UPDATE {} {} SET ", target.entity().table(), target.alias()));
        for (i, a) in plan.assignments.iter().enumerate() {
            if i > 0 { self.push(", "); }
            self.push(&format!("{} = ", a.column.column));
            self.expr(&a.value, Clause::Set)?;
        }
        if let Some(filter) = &plan.filter {
            self.push(" WHERE ");
            self.predicate(filter, Clause::Where)?;
        }
        Ok(())
    }

    pub fn delete(&mut self, plan: &DeletePlan) -> Result<(), QueryError> {
        let target = &plan.target;
        self.push(&format!("DELETE FROM {} {}", target.entity().table(), target.alias()));
        if let Some(filter) = &plan.filter {
            self.push(" WHERE ");
            self.predicate(filter, Clause::Where)?;
        }
        Ok(())
    }

    pub fn insert(&mut self, plan: &InsertPlan) -> Result<(), QueryError> {
        let columns: Vec<&str> = plan.values.iter().map(|(c, _)| c.column.as_str()).collect();
        self.push(&format!("INSERT INTO {} ({}) VALUES (", plan.target.entity().table(), columns.join(", ")));
        for (i, (_, value)) in plan.values.iter().enumerate() {
            if i > 0 { self.push(", "); }
            self.param(value.clone());
        }
        self.push(")");
        Ok(())
    }
}
