use crate::{error::QueryError, expr::Value, store::aggregates::Accumulator};

#[derive(Debug, Default)]
pub struct AvgAcc {
    sum: f64,
    cnt: i64,
}

impl Accumulator for AvgAcc {
    fn update(&mut self, value: &Value) -> Result<(), QueryError> {
        match value {
            Value::Null => {}
            v => {
                let f = v.as_f64().ok_or_else(|| QueryError::Storage(format!("avg over non numeric value {v}")))?;
                self.sum += f;
                self.cnt += 1;
            }
        }
        Ok(())
    }

    fn finalize(&self) -> Value {
        if self.cnt == 0 {
            Value::Null
        } else {
            Value::float(self.sum / self.cnt as f64)
        }
    }
}
