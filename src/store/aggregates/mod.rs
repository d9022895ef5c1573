pub mod accumulator;
pub use accumulator::*;
pub mod count;
pub use count::*;
pub mod sum;
pub use sum::*;
pub mod avg;
pub use avg::*;
pub mod minmax;
pub use minmax::*;
