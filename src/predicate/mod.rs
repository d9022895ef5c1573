pub mod truth;
pub use truth::*;
pub mod node;
pub use node::*;
pub mod compose;
pub use compose::*;
