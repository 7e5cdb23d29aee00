use axum::{
    Json,
    extract::{Extension, Path, State},
};
use tracing::info;

use crate::{
    AppState,
    error::AppError,
    middleware::SessionId,
    stackstorm::{self, CUSTOM_CONNECTION, ResolvedConnection, StackStormError, StoredConnection},
};

use super::model::{
    ConnectionInfo, ConnectionRequest, ConnectionResponse, ConnectionTestResponse,
    ConnectionUpdateResponse, ExecutionResponse, ExecutionsListResponse,
};

fn resolve_for(state: &AppState, session_id: &str) -> Result<ResolvedConnection, StackStormError> {
    let payload = state.sessions.get_payload(session_id);
    stackstorm::resolve(payload.as_ref(), &state.connections)
}

pub async fn get_connection(
    State(state): State<AppState>,
    Extension(SessionId(session_id)): Extension<SessionId>,
) -> Json<ConnectionResponse> {
    let connections = state
        .connections
        .connections
        .iter()
        .map(|conn| ConnectionInfo {
            id: conn.id.clone(),
            alias: conn.display_alias().to_string(),
        })
        .collect();

    let stored = state
        .sessions
        .get_payload(&session_id)
        .as_ref()
        .and_then(StoredConnection::from_payload)
        .unwrap_or_default();

    Json(ConnectionResponse {
        connections,
        default: state.connections.default.clone(),
        current: stored.current,
        custom_connection: stored.custom_connection,
    })
}

pub async fn set_connection(
    State(state): State<AppState>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    Json(req): Json<ConnectionRequest>,
) -> Result<Json<ConnectionUpdateResponse>, AppError> {
    if req.current == CUSTOM_CONNECTION {
        match &req.custom_connection {
            None => {
                return Err(AppError::BadRequest(
                    "Custom connection data required when current is 'custom'".to_string(),
                ));
            }
            Some(custom) if custom.url.trim().is_empty() => {
                return Err(AppError::BadRequest(
                    "URL is required for custom connection".to_string(),
                ));
            }
            Some(_) => {}
        }
    } else if state.connections.by_id(&req.current).is_none() {
        return Err(AppError::BadRequest(format!(
            "Connection '{}' not found in preconfigured connections",
            req.current
        )));
    }

    let message = format!("Connection configuration updated to '{}'", req.current);
    let stored = StoredConnection {
        current: Some(req.current),
        custom_connection: req.custom_connection,
    };

    if !state.sessions.set_payload(&session_id, stored.into_payload()) {
        return Err(AppError::InternalServerError(
            "Failed to save connection configuration".to_string(),
        ));
    }

    info!("{}", message);
    Ok(Json(ConnectionUpdateResponse {
        success: true,
        message,
    }))
}

/// Probes the caller's resolved connection. Failures are reported in the body.
pub async fn test_connection(
    State(state): State<AppState>,
    Extension(SessionId(session_id)): Extension<SessionId>,
) -> Json<ConnectionTestResponse> {
    let check = match resolve_for(&state, &session_id) {
        Ok(conn) => state.stackstorm.test_connection(&conn).await,
        Err(e) => stackstorm::ConnectionCheck {
            success: false,
            message: e.to_string(),
        },
    };

    Json(ConnectionTestResponse {
        success: check.success,
        message: check.message,
    })
}

pub async fn list_executions(
    State(state): State<AppState>,
    Extension(SessionId(session_id)): Extension<SessionId>,
) -> Result<Json<ExecutionsListResponse>, AppError> {
    let conn = resolve_for(&state, &session_id)?;
    let executions = state.stackstorm.list_executions(&conn).await?;

    Ok(Json(ExecutionsListResponse { executions }))
}

pub async fn get_execution(
    State(state): State<AppState>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    Path(execution_id): Path<String>,
) -> Result<Json<ExecutionResponse>, AppError> {
    let conn = resolve_for(&state, &session_id)?;
    let execution_data = state.stackstorm.get_execution(&conn, &execution_id).await?;

    let status = execution_data
        .get("status")
        .and_then(|status| status.as_str())
        .unwrap_or("unknown");
    let message = format!("Execution loaded successfully! Status: {}", status);

    Ok(Json(ExecutionResponse {
        execution_data,
        message,
    }))
}
