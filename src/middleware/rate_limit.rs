use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use parking_lot::Mutex;

use crate::{config::RateLimit, error::AppError, utils::client_ip};

/// Window count above which stale windows are dropped.
const PRUNE_THRESHOLD: usize = 1024;

struct Window {
    started: Instant,
    count: u32,
}

struct Windows {
    by_key: HashMap<String, Window>,
    last_prune: Instant,
}

#[derive(Clone)]
pub struct RateLimiter {
    windows: Arc<Mutex<Windows>>,
    limit: RateLimit,
    trust_forwarded: bool,
}

impl RateLimiter {
    pub fn new(limit: RateLimit, trust_forwarded: bool) -> Self {
        Self {
            windows: Arc::new(Mutex::new(Windows {
                by_key: HashMap::new(),
                last_prune: Instant::now(),
            })),
            limit,
            trust_forwarded,
        }
    }

    /// Counts a request for `key`. Returns the seconds until the window resets when
    /// the limit is exceeded.
    pub fn check(&self, key: &str) -> Result<(), u64> {
        let now = Instant::now();
        let window = self.limit.window();
        let mut windows = self.windows.lock();

        // At most one full scan per window length.
        if windows.by_key.len() >= PRUNE_THRESHOLD
            && now.duration_since(windows.last_prune) >= window
        {
            windows
                .by_key
                .retain(|_, w| now.duration_since(w.started) < window);
            windows.last_prune = now;
        }

        let entry = windows.by_key.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= window {
            entry.started = now;
            entry.count = 0;
        }

        entry.count += 1;
        if entry.count > self.limit.requests {
            let remaining = window.saturating_sub(now.duration_since(entry.started));
            return Err((remaining.as_millis().div_ceil(1000) as u64).max(1));
        }

        Ok(())
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.windows.lock().by_key.len()
    }
}

pub async fn rate_limit(
    State(limiter): State<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let ip = client_ip(&req, limiter.trust_forwarded);

    if let Err(retry_after_secs) = limiter.check(&ip) {
        tracing::warn!("Rate limit exceeded for {} on {}", ip, req.uri().path());
        return Err(AppError::RateLimited { retry_after_secs });
    }

    Ok(next.run(req).await)
}
