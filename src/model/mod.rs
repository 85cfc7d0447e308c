pub mod entity;
pub mod filter;
pub mod selection;

pub use entity::*;
pub use filter::*;
pub use selection::*;
