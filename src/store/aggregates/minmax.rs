use crate::{error::QueryError, expr::Value, store::aggregates::Accumulator};

#[derive(Debug)]
enum Mode {
    Min,
    Max,
}

#[derive(Debug)]
pub struct ExtremaAcc {
    mode: Mode,
    current: Option<Value>,
}

impl ExtremaAcc {
    pub fn new_min() -> Self {
        Self { mode: Mode::Min, current: None }
    }

    pub fn new_max() -> Self {
        Self { mode: Mode::Max, current: None }
    }
}

impl Accumulator for ExtremaAcc {
    fn update(&mut self, value: &Value) -> Result<(), QueryError> {
        if value.is_null() {
            return Ok(());
        }
        match &mut self.current {
            None => self.current = Some(value.clone()),
            Some(cur) => {
                let ord = cur.sql_cmp(value).ok_or_else(|| {
                    QueryError::Storage(format!("min/max over mixed values {cur} and {value}"))
                })?;
                let better = match self.mode {
                    Mode::Min => ord.is_gt(),
                    Mode::Max => ord.is_lt(),
                };
                if better {
                    *cur = value.clone();
                }
            }
        }
        Ok(())
    }

    fn finalize(&self) -> Value {
        self.current.clone().unwrap_or(Value::Null)
    }
}
