pub mod bound;
pub use bound::*;
pub mod writer;
pub use writer::*;
pub mod select;
pub mod mutation;
pub mod sql_compiler;
pub use sql_compiler::*;
