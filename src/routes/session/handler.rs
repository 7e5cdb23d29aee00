use axum::{
    Json,
    extract::{Extension, State},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::{info, warn};

use crate::{
    AppState,
    config::{Config, CookieSameSite},
    error::AppError,
    middleware::SessionId,
    session::{SessionStats, short_id},
    utils::verify_passphrase,
};

use super::model::{
    AuthRequest, AuthResponse, AuthStatusResponse, SessionDataRequest, SessionDataResponse,
};

fn session_cookie(config: &Config, session_id: String) -> Cookie<'static> {
    let same_site = match config.session_cookie_samesite {
        CookieSameSite::Lax => SameSite::Lax,
        CookieSameSite::Strict => SameSite::Strict,
        CookieSameSite::None => SameSite::None,
    };

    Cookie::build((config.session_cookie_name.clone(), session_id))
        .http_only(true)
        .secure(config.session_cookie_secure)
        .same_site(same_site)
        .path("/")
        .build()
}

fn cookie_session_id(jar: &CookieJar, config: &Config) -> Option<String> {
    jar.get(&config.session_cookie_name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

pub async fn authenticate(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<AuthRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    if state.config.passphrase_auth {
        let accepted = req
            .passphrase
            .as_deref()
            .is_some_and(|passphrase| verify_passphrase(passphrase, &state.config.passphrase));
        if !accepted {
            warn!("Authentication attempt with invalid passphrase");
            return Err(AppError::Unauthorized("Invalid passphrase"));
        }
    }

    // Drop whatever session the client was holding before.
    if let Some(previous) = cookie_session_id(&jar, &state.config) {
        state.sessions.delete(&previous);
    }

    let session_id = state.sessions.create(None)?;
    info!(session = %short_id(&session_id), "Session authenticated");

    let jar = jar.add(session_cookie(&state.config, session_id));
    Ok((
        jar,
        Json(AuthResponse {
            success: true,
            message: "Successfully authenticated".to_string(),
        }),
    ))
}

/// Reports whether the caller holds a live session. Never rejects.
pub async fn status(State(state): State<AppState>, jar: CookieJar) -> Json<AuthStatusResponse> {
    let session = cookie_session_id(&jar, &state.config)
        .and_then(|session_id| state.sessions.get(&session_id, true));

    Json(AuthStatusResponse {
        authenticated: session.is_some(),
        passphrase_required: state.config.passphrase_auth,
        last_activity: session.map(|session| session.last_activity.to_rfc3339()),
    })
}

pub async fn store_data(
    State(state): State<AppState>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    Json(req): Json<SessionDataRequest>,
) -> Result<Json<SessionDataResponse>, AppError> {
    if !state.sessions.set_payload(&session_id, req.data) {
        return Err(AppError::InternalServerError(
            "Failed to store session data".to_string(),
        ));
    }

    Ok(Json(SessionDataResponse {
        success: true,
        data: None,
        message: Some("Successfully stored data in session".to_string()),
    }))
}

pub async fn get_data(
    State(state): State<AppState>,
    Extension(SessionId(session_id)): Extension<SessionId>,
) -> Result<Json<SessionDataResponse>, AppError> {
    let data = state
        .sessions
        .get_payload(&session_id)
        .ok_or_else(|| AppError::InternalServerError("Session not found".to_string()))?;

    Ok(Json(SessionDataResponse {
        success: true,
        data: Some(data),
        message: None,
    }))
}

pub async fn count(
    State(state): State<AppState>,
    Extension(_): Extension<SessionId>,
) -> Json<SessionStats> {
    Json(state.sessions.stats())
}

pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<AuthResponse>) {
    let removed = cookie_session_id(&jar, &state.config)
        .map(|session_id| state.sessions.delete(&session_id))
        .unwrap_or(false);

    let message = if removed {
        "Successfully logged out"
    } else {
        "No active session"
    };

    let jar = jar.remove(
        Cookie::build((state.config.session_cookie_name.clone(), ""))
            .path("/")
            .build(),
    );
    (
        jar,
        Json(AuthResponse {
            success: true,
            message: message.to_string(),
        }),
    )
}
