pub mod errors;
pub mod naming;
pub mod parse;
pub mod pipeline;
pub mod reduce;

pub use errors::*;
pub use naming::*;
pub use parse::*;
pub use pipeline::*;
pub use reduce::*;
