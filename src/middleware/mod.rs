mod auth;
mod error_handler;
mod rate_limit;

pub use auth::{SessionId, require_session, session_id_from_headers};
pub use error_handler::log_errors;
pub use rate_limit::{RateLimiter, rate_limit};
