// Session types and data structures

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Arbitrary JSON-compatible key/value state held for a session.
pub type Payload = Map<String, Value>;

/// Session store configuration, fixed for the lifetime of a store.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Inactivity period after which a session expires
    pub timeout: Duration,
    /// Sweep expired sessions from the oldest end on every operation
    pub proactive_cleanup: bool,
    /// Maximum number of expired sessions purged by a single proactive sweep.
    /// `None` sweeps until the first live session.
    pub sweep_limit: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::hours(4),
            proactive_cleanup: true,
            sweep_limit: Some(128),
        }
    }
}

/// Snapshot of a live session as handed to callers.
///
/// Mutating a snapshot never affects the stored session; use
/// [`SessionStore::set_payload`](super::SessionStore::set_payload) for that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub last_activity: DateTime<Utc>,
    pub payload: Payload,
}

/// Raw and live session counts, for monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total_sessions: usize,
    pub active_sessions: usize,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("secure random source unavailable: {0}")]
    Randomness(String),
}
