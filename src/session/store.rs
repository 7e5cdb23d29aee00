use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, MutexGuard};
use rand::{TryRngCore, rngs::OsRng};
use tracing::{debug, info};

use super::clock::{Clock, SystemClock};
use super::types::{Payload, Session, SessionConfig, SessionError, SessionStats};

const SESSION_ID_BYTES: usize = 32;

struct Entry {
    last_activity: DateTime<Utc>,
    payload: Payload,
    /// Key of this session in the activity order.
    seq: u64,
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<String, Entry>,
    /// Session ids keyed by a monotonically increasing sequence, oldest activity first.
    activity: BTreeMap<u64, String>,
    next_seq: u64,
}

fn is_live(entry: &Entry, now: DateTime<Utc>, timeout: Duration) -> bool {
    now.signed_duration_since(entry.last_activity) < timeout
}

impl Inner {
    /// Timestamp for an entry about to become the newest. Never earlier than the
    /// current newest entry, so the activity order stays sorted by time.
    fn stamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let newest = self
            .activity
            .last_key_value()
            .and_then(|(_, id)| self.sessions.get(id))
            .map(|entry| entry.last_activity);

        match newest {
            Some(newest) if newest > now => newest,
            _ => now,
        }
    }

    fn insert(&mut self, id: String, payload: Payload, now: DateTime<Utc>) {
        let last_activity = self.stamp(now);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.activity.insert(seq, id.clone());
        self.sessions.insert(
            id,
            Entry {
                last_activity,
                payload,
                seq,
            },
        );
    }

    /// The single removal path: explicit deletes, lazy expiry and sweeps all end here.
    fn remove(&mut self, id: &str) -> Option<Entry> {
        let entry = self.sessions.remove(id)?;
        self.activity.remove(&entry.seq);
        Some(entry)
    }

    /// Whether `id` names a live session. An expired entry is purged on the spot.
    fn check_live(&mut self, id: &str, now: DateTime<Utc>, timeout: Duration) -> bool {
        match self.sessions.get(id) {
            None => false,
            Some(entry) if is_live(entry, now, timeout) => true,
            Some(_) => {
                self.remove(id);
                debug!(session = %short_id(id), "Expired session purged on access");
                false
            }
        }
    }

    /// Moves `id` to the newest end of the activity order and stamps it.
    fn refresh(&mut self, id: &str, now: DateTime<Utc>) -> Option<&mut Entry> {
        let last_activity = self.stamp(now);
        let seq = self.next_seq;

        let entry = self.sessions.get_mut(id)?;
        let key = self
            .activity
            .remove(&entry.seq)
            .unwrap_or_else(|| id.to_string());
        self.activity.insert(seq, key);
        self.next_seq += 1;

        entry.seq = seq;
        entry.last_activity = last_activity;
        Some(entry)
    }

    /// Purges expired sessions from the oldest end, stopping at the first live one
    /// or after `limit` removals.
    fn sweep(&mut self, now: DateTime<Utc>, timeout: Duration, limit: Option<usize>) -> usize {
        let mut purged = 0;

        while limit.is_none_or(|max| purged < max) {
            let Some((_, head)) = self.activity.first_key_value() else {
                break;
            };

            match self.sessions.get(head).map(|entry| is_live(entry, now, timeout)) {
                Some(true) => break,
                Some(false) => {
                    let id = head.clone();
                    self.remove(&id);
                    purged += 1;
                }
                None => {
                    self.activity.pop_first();
                }
            }
        }

        purged
    }
}

/// In-memory session registry with inactivity expiry.
///
/// Clones share the same underlying state. Every operation runs under one lock,
/// so an expiry check and the activity refresh that follows it are atomic.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Mutex<Inner>>,
    config: Arc<SessionConfig>,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: SessionConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            config: Arc::new(config),
            clock,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Takes the lock, reads the clock under it and runs the proactive sweep if enabled.
    fn lock_and_sweep(&self) -> (MutexGuard<'_, Inner>, DateTime<Utc>) {
        let mut inner = self.inner.lock();
        let now = self.clock.now();

        if self.config.proactive_cleanup {
            let purged = inner.sweep(now, self.config.timeout, self.config.sweep_limit);
            if purged > 0 {
                debug!(purged, "Proactive sweep reclaimed expired sessions");
            }
        }

        (inner, now)
    }

    pub fn create(&self, payload: Option<Payload>) -> Result<String, SessionError> {
        let (mut inner, now) = self.lock_and_sweep();

        let id = loop {
            let candidate = generate_session_id()?;
            if !inner.sessions.contains_key(&candidate) {
                break candidate;
            }
        };

        inner.insert(id.clone(), payload.unwrap_or_default(), now);
        debug!(session = %short_id(&id), "Session created");

        Ok(id)
    }

    /// Returns a snapshot of the session if it is live, optionally refreshing its activity.
    pub fn get(&self, id: &str, update_activity: bool) -> Option<Session> {
        let (mut inner, now) = self.lock_and_sweep();

        if !inner.check_live(id, now, self.config.timeout) {
            return None;
        }

        let entry = if update_activity {
            inner.refresh(id, now)?
        } else {
            inner.sessions.get_mut(id)?
        };

        Some(Session {
            id: id.to_string(),
            last_activity: entry.last_activity,
            payload: entry.payload.clone(),
        })
    }

    /// Returns a copy of the payload of a live session, refreshing its activity.
    pub fn get_payload(&self, id: &str) -> Option<Payload> {
        let (mut inner, now) = self.lock_and_sweep();

        if !inner.check_live(id, now, self.config.timeout) {
            return None;
        }

        inner.refresh(id, now).map(|entry| entry.payload.clone())
    }

    /// Shallow-merges `partial` into the payload of a live session.
    /// Returns `false` if the session is unknown or expired.
    pub fn set_payload(&self, id: &str, partial: Payload) -> bool {
        let (mut inner, now) = self.lock_and_sweep();

        if !inner.check_live(id, now, self.config.timeout) {
            return false;
        }

        match inner.refresh(id, now) {
            Some(entry) => {
                entry.payload.extend(partial);
                true
            }
            None => false,
        }
    }

    pub fn touch(&self, id: &str) -> bool {
        let (mut inner, now) = self.lock_and_sweep();

        inner.check_live(id, now, self.config.timeout) && inner.refresh(id, now).is_some()
    }

    /// Removes a session. Idempotent.
    pub fn delete(&self, id: &str) -> bool {
        let (mut inner, _) = self.lock_and_sweep();

        let removed = inner.remove(id).is_some();
        if removed {
            info!(session = %short_id(id), "Session deleted");
        }
        removed
    }

    /// Raw and live counts. Does not sweep, so expired-but-unpurged entries show up
    /// in `total_sessions`.
    pub fn stats(&self) -> SessionStats {
        let inner = self.inner.lock();
        let now = self.clock.now();
        let timeout = self.config.timeout;

        SessionStats {
            total_sessions: inner.sessions.len(),
            active_sessions: inner
                .sessions
                .values()
                .filter(|entry| is_live(entry, now, timeout))
                .count(),
        }
    }

    /// Purges every expired session regardless of `sweep_limit`.
    pub fn purge_expired(&self) -> usize {
        let mut inner = self.inner.lock();
        let now = self.clock.now();

        let purged = inner.sweep(now, self.config.timeout, None);
        if purged > 0 {
            info!(purged, "Purged expired sessions");
        }
        purged
    }

    pub fn len(&self) -> usize {
        self.inner.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn generate_session_id() -> Result<String, SessionError> {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| SessionError::Randomness(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

pub(crate) fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ManualClock;
    use serde_json::json;

    fn store_with(proactive_cleanup: bool, sweep_limit: Option<usize>) -> (SessionStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let config = SessionConfig {
            timeout: Duration::seconds(60),
            proactive_cleanup,
            sweep_limit,
        };
        (SessionStore::with_clock(config, clock.clone()), clock)
    }

    fn activity_order(store: &SessionStore) -> Vec<String> {
        store.inner.lock().activity.values().cloned().collect()
    }

    fn assert_order_consistent(store: &SessionStore) {
        let inner = store.inner.lock();
        assert_eq!(inner.activity.len(), inner.sessions.len());

        let stamps: Vec<_> = inner
            .activity
            .iter()
            .map(|(seq, id)| {
                let entry = &inner.sessions[id];
                assert_eq!(entry.seq, *seq);
                entry.last_activity
            })
            .collect();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_session_id_is_url_safe() {
        let (store, _) = store_with(true, None);
        let id = store.create(None).unwrap();

        assert_eq!(id.len(), 43);
        assert!(
            id.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_refresh_moves_session_to_newest_end() {
        let (store, clock) = store_with(true, None);
        let a = store.create(None).unwrap();
        clock.advance(Duration::seconds(1));
        let b = store.create(None).unwrap();
        clock.advance(Duration::seconds(1));
        let c = store.create(None).unwrap();

        assert_eq!(activity_order(&store), vec![a.clone(), b.clone(), c.clone()]);

        clock.advance(Duration::seconds(1));
        assert!(store.touch(&a));
        assert_eq!(activity_order(&store), vec![b.clone(), c.clone(), a.clone()]);

        assert!(store.get(&b, false).is_some());
        assert_eq!(activity_order(&store), vec![b, c, a]);
        assert_order_consistent(&store);
    }

    #[test]
    fn test_sweep_stops_at_first_live_session() {
        let (store, clock) = store_with(true, None);
        let old = store.create(None).unwrap();
        clock.advance(Duration::seconds(30));
        let young = store.create(None).unwrap();

        clock.advance(Duration::seconds(40));
        // `old` is 70s idle, `young` 40s.
        let fresh = store.create(None).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(activity_order(&store), vec![young, fresh]);
        assert!(store.get(&old, true).is_none());
    }

    #[test]
    fn test_sweep_limit_bounds_a_single_pass() {
        let (store, clock) = store_with(true, Some(2));
        for _ in 0..5 {
            store.create(None).unwrap();
        }
        clock.advance(Duration::seconds(61));

        let survivor = store.create(None).unwrap();
        assert_eq!(store.len(), 4);

        store.touch(&survivor);
        assert_eq!(store.len(), 2);

        assert_eq!(store.purge_expired(), 1);
        assert_eq!(activity_order(&store), vec![survivor]);
        assert_order_consistent(&store);
    }

    #[test]
    fn test_stamp_never_goes_backwards() {
        let (store, clock) = store_with(false, None);
        let start = clock.now();
        let a = store.create(None).unwrap();

        clock.set(start - Duration::seconds(5));
        let b = store.create(None).unwrap();

        let a_seen = store.get(&a, false).unwrap().last_activity;
        let b_seen = store.get(&b, false).unwrap().last_activity;
        assert_eq!(a_seen, start);
        assert!(b_seen >= a_seen);
        assert_order_consistent(&store);
    }

    #[test]
    fn test_get_without_update_keeps_activity() {
        let (store, clock) = store_with(true, None);
        let id = store.create(Some(json!({"k": "v"}).as_object().unwrap().clone())).unwrap();
        let created = store.get(&id, false).unwrap().last_activity;

        clock.advance(Duration::seconds(10));
        let session = store.get(&id, false).unwrap();
        assert_eq!(session.last_activity, created);
        assert_eq!(session.payload["k"], "v");

        let session = store.get(&id, true).unwrap();
        assert_eq!(session.last_activity, created + Duration::seconds(10));
    }

    #[test]
    fn test_returned_payload_is_a_copy() {
        let (store, _) = store_with(true, None);
        let id = store.create(None).unwrap();

        let mut payload = store.get_payload(&id).unwrap();
        payload.insert("leak".into(), json!(true));

        assert!(store.get_payload(&id).unwrap().is_empty());
    }

    #[test]
    fn test_lazy_eviction_without_proactive_cleanup() {
        let (store, clock) = store_with(false, None);
        let a = store.create(None).unwrap();
        let b = store.create(None).unwrap();
        clock.advance(Duration::seconds(60));

        assert_eq!(store.len(), 2);
        assert!(!store.touch(&a));
        assert_eq!(store.len(), 1);
        assert_eq!(activity_order(&store), vec![b]);
        assert_order_consistent(&store);
    }
}
