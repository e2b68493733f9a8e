//! Server middleware
//!
//! Provides request logging, session enforcement and login rate limiting.

pub mod auth;
pub mod logging;
pub mod rate_limit;

pub use auth::{authorize, require_session};
pub use logging::log_request;
pub use rate_limit::RateLimiter;
