pub mod auth;
pub mod extract;
pub mod rate_limit;
pub mod response;

pub use auth::{authorize, protect, CurrentUser, TOKEN_COOKIE};
pub use extract::{RecordId, ValidJson};
pub use rate_limit::{rate_limit_middleware, ClientRateLimiter};
pub use response::{ApiResponse, ApiResult, PageLink, Pagination};
