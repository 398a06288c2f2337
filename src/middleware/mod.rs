pub mod cors;
pub mod extract;
pub mod response;

pub use cors::build_cors_layer;
pub use extract::{ApiJson, ApiQuery};
pub use response::{ApiResponse, ApiResult, StatusEnvelope};
