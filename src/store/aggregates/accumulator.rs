use crate::{error::QueryError, expr::{AggregateFunc, Value}};

/// Per-group aggregate state.
///
/// The executor evaluates the argument for each row of the group, calls
/// `update`, then `finalize` once the group is exhausted. DISTINCT is applied
/// by the executor before `update`.
pub trait Accumulator: Send {
    fn update(&mut self, value: &Value) -> Result<(), QueryError>;

    fn finalize(&self) -> Value;
}

pub fn accumulator_for(func: AggregateFunc) -> Box<dyn Accumulator> {
    use crate::store::aggregates::{AvgAcc, CountAcc, ExtremaAcc, SumAcc};
    match func {
        AggregateFunc::Count => Box::new(CountAcc::default()),
        AggregateFunc::Sum => Box::new(SumAcc::default()),
        AggregateFunc::Avg => Box::new(AvgAcc::default()),
        AggregateFunc::Max => Box::new(ExtremaAcc::new_max()),
        AggregateFunc::Min => Box::new(ExtremaAcc::new_min()),
    }
}
