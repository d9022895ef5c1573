pub mod persistence_context;
pub use persistence_context::*;
pub mod query_results;
pub use query_results::*;
pub mod unit_of_work;
pub use unit_of_work::*;

#[cfg(test)]
mod _tests;
