// Session management module
// Server-side session registry with inactivity expiry and amortised cleanup

mod clock;
mod purge;
mod store;
mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use purge::spawn_purge_task;
pub(crate) use store::short_id;
pub use store::SessionStore;
pub use types::{Payload, Session, SessionConfig, SessionError, SessionStats};
