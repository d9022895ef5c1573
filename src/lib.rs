pub mod error;
pub use error::QueryError;

pub mod config;
pub use config::{Config, Dialect, IdType};

pub mod metadata;
pub mod expr;
pub mod predicate;
pub use predicate::compose_all;
pub mod query;
pub mod compiler;
pub use compiler::{BoundStatement, SqlCompiler};
pub mod mapper;
pub mod executor;
pub use executor::{Statement, StatementExecutor};
pub mod store;
pub use store::MemoryStore;
pub mod session;
pub use session::{QueryResults, Session};

#[cfg(test)]
mod fixtures;
