pub mod from_value;
pub use from_value::*;
pub mod layout;
pub use layout::*;
pub mod entity_record;
pub use entity_record::*;
pub mod tuple;
pub use tuple::*;
pub mod from_tuple;
pub use from_tuple::*;
pub mod projection;
pub use projection::*;
