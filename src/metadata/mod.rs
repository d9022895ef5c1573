pub mod value_type;
pub use value_type::*;
pub mod column_def;
pub use column_def::*;
pub mod relation;
pub use relation::*;
pub mod entity;
pub use entity::*;
pub mod catalog;
pub use catalog::*;
pub mod entity_path;
pub use entity_path::*;
