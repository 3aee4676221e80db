pub mod auth;
pub mod response;

pub use auth::{optional_auth, protect, restrict_to, CurrentUser};
pub use response::{ApiResponse, ApiResult};
