use axum::Json;
use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::session::SessionError;
use crate::stackstorm::StackStormError;

#[derive(Debug)]
pub enum AppError {
    Unauthorized(&'static str),
    BadRequest(String),
    NotFound(String),
    RateLimited { retry_after_secs: u64 },
    Upstream { status: StatusCode, message: String },
    ServiceUnavailable(String),
    InternalServerError(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    code: i32,
    error_message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let retry_after = match &self {
            AppError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };

        let (status, error_message) = match self {
            AppError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message.to_string()),
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            AppError::RateLimited { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                format!("Rate limit exceeded, retry in {} seconds", retry_after_secs),
            ),
            AppError::Upstream { status, message } => (status, message),
            AppError::ServiceUnavailable(message) => (StatusCode::SERVICE_UNAVAILABLE, message),
            AppError::InternalServerError(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };

        let body = Json(ErrorResponse {
            code: status.as_u16() as i32,
            error_message,
        });

        match retry_after {
            Some(secs) => (status, [(header::RETRY_AFTER, secs.to_string())], body).into_response(),
            None => (status, body).into_response(),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        tracing::error!("Session store failure: {}", err);
        AppError::InternalServerError("Failed to create session".to_string())
    }
}

impl From<StackStormError> for AppError {
    fn from(err: StackStormError) -> Self {
        let message = err.to_string();
        match err {
            StackStormError::MissingCustomConnection
            | StackStormError::NoConnection
            | StackStormError::UnknownConnection(_)
            | StackStormError::InvalidUrl(_) => AppError::BadRequest(message),
            StackStormError::Unauthorized => AppError::Upstream {
                status: StatusCode::UNAUTHORIZED,
                message,
            },
            StackStormError::ExecutionNotFound(_) => AppError::NotFound(message),
            StackStormError::Api { status, .. } => AppError::Upstream {
                status: StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                message,
            },
            StackStormError::Request(_) => AppError::ServiceUnavailable(message),
        }
    }
}
