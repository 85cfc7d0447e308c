pub mod fields_extractor;
pub mod handlers;
pub mod routes;

pub use fields_extractor::*;
pub use handlers::*;
pub use routes::*;
