pub mod select_item;
pub use select_item::*;
pub mod join;
pub use join::*;
pub mod order;
pub use order::*;
pub mod plan;
pub use plan::*;
pub mod builder;
pub use builder::*;
pub mod mutation;
pub use mutation::*;
