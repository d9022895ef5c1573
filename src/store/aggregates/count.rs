use crate::{error::QueryError, expr::Value, store::aggregates::Accumulator};

/// Counts non-null values. `count(*)` feeds a non-null sentinel per row.
#[derive(Debug, Default)]
pub struct CountAcc {
    n: i64,
}

impl Accumulator for CountAcc {
    fn update(&mut self, value: &Value) -> Result<(), QueryError> {
        if !value.is_null() {
            self.n += 1;
        }
        Ok(())
    }

    fn finalize(&self) -> Value {
        Value::Int(self.n)
    }
}
