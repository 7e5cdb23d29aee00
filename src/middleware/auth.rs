use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use crate::{AppState, error::AppError, session::short_id};

/// Id of the authenticated session, set by [`require_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(pub String);

pub fn session_id_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(cookie_name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

/// Rejects requests without a live session and refreshes the session's activity.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let session_id = session_id_from_headers(req.headers(), &state.config.session_cookie_name)
        .ok_or(AppError::Unauthorized(
            "No session found. Please authenticate.",
        ))?;

    if state.sessions.get(&session_id, true).is_none() {
        debug!(session = %short_id(&session_id), "Rejected unknown or expired session");
        return Err(AppError::Unauthorized(
            "Invalid or expired session. Please authenticate again.",
        ));
    }

    req.extensions_mut().insert(SessionId(session_id));
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;

    #[test]
    fn test_session_id_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, "theme=dark; session_id=abc123".parse().unwrap());

        assert_eq!(
            session_id_from_headers(&headers, "session_id").as_deref(),
            Some("abc123")
        );
        assert_eq!(session_id_from_headers(&headers, "other"), None);

        headers.insert(COOKIE, "session_id=".parse().unwrap());
        assert_eq!(session_id_from_headers(&headers, "session_id"), None);
    }
}
