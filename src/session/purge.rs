use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::SessionStore;

/// Periodically runs a full purge so a bounded proactive sweep can never leave an
/// unbounded backlog behind.
pub fn spawn_purge_task(store: SessionStore, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            store.purge_expired();
        }
    })
}
