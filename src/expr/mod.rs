pub mod value;
pub use value::*;
pub mod column_ref;
pub use column_ref::*;
pub mod operators;
pub use operators::*;
pub mod case;
pub use case::*;
pub mod node;
pub use node::*;
