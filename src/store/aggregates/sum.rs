use crate::{error::QueryError, expr::Value, store::aggregates::Accumulator};

/// Integer sum until a float shows up; null over an empty or all-null group.
#[derive(Debug, Default)]
pub struct SumAcc {
    int: Option<i64>,
    float: Option<f64>,
}

impl Accumulator for SumAcc {
    fn update(&mut self, value: &Value) -> Result<(), QueryError> {
        match value {
            Value::Null => {}
            Value::Int(i) => match self.float {
                Some(f) => self.float = Some(f + *i as f64),
                None => {
                    let sum = self.int.unwrap_or(0).checked_add(*i)
                        .ok_or_else(|| QueryError::Storage("sum overflow".into()))?;
                    self.int = Some(sum);
                }
            },
            Value::Float(f) => {
                let base = self.float.or(self.int.map(|i| i as f64)).unwrap_or(0.0);
                self.float = Some(base + f.into_inner());
            }
            other => return QueryError::Storage(format!("sum over non numeric value {other}")).err(),
        }
        Ok(())
    }

    fn finalize(&self) -> Value {
        match (self.float, self.int) {
            (Some(f), _) => Value::float(f),
            (None, Some(i)) => Value::Int(i),
            (None, None) => Value::Null,
        }
    }
}
