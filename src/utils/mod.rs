use std::net::SocketAddr;

use axum::{body::Body, extract::ConnectInfo, http::Request};
use sha2::{Digest, Sha256};

/// Compares a submitted passphrase against the configured one.
///
/// Both sides are hashed first so the comparison runs over fixed-length digests and
/// does not stop at the first differing byte.
pub fn verify_passphrase(submitted: &str, expected: &str) -> bool {
    let submitted = Sha256::digest(submitted.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());

    submitted
        .iter()
        .zip(expected.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Client address used for rate limiting.
///
/// Forwarding headers are client-controlled, so `x-real-ip` and `x-forwarded-for` are
/// only consulted when `trust_forwarded` is set (i.e. behind a proxy that overwrites
/// them). Otherwise the peer address is the only key.
pub fn client_ip(req: &Request<Body>, trust_forwarded: bool) -> String {
    let remote_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string());

    let forwarded = trust_forwarded
        .then(|| {
            req.headers()
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .filter(|ip| !ip.trim().is_empty())
                .or_else(|| {
                    req.headers()
                        .get("x-forwarded-for")
                        .and_then(|h| h.to_str().ok())
                        .and_then(|s| s.split(',').find(|ip| !ip.trim().is_empty()))
                })
        })
        .flatten();

    forwarded
        .or(remote_ip.as_deref())
        .unwrap_or("unknown")
        .trim()
        .to_string()
}
