//! The pipeline stages.
//!
//! Fixed order, outermost first:
//!
//! 1. [`error_handler`] - fault-to-envelope conversion, `X-Request-Id` tagging
//! 2. [`timeout`] - deadline enforcement
//! 3. [`rate_limit`] - sliding-window admission
//! 4. [`auth`] - bearer-token authentication
//! 5. [`guard`] - route-specific role and ownership checks

pub mod auth;
pub mod error_handler;
pub mod guard;
pub mod rate_limit;
pub mod timeout;

pub use auth::{AuthMiddleware, RoomProfile};
pub use error_handler::ErrorHandlerMiddleware;
pub use guard::{OwnershipGuard, ResourceKind, RoleGuard};
pub use rate_limit::{FailMode, RateLimitConfig, RateLimitMiddleware};
pub use timeout::TimeoutMiddleware;
