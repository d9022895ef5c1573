pub mod aggregates;
pub use aggregates::*;
pub mod id_manager;
pub use id_manager::*;
pub mod table;
pub use table::*;
pub mod helpers;
pub use helpers::*;
pub mod eval;
pub use eval::*;
pub mod plan_executor;
pub use plan_executor::*;
pub mod memory_store;
pub use memory_store::*;
