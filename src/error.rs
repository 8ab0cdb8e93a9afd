use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::backend::BackendError;
use crate::generation::GenerationError;

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    Unauthorized(String),
    BadRequest(String),
    Conflict(String),
    RateLimited(String),
    Backend(BackendError),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "Not Found: {msg}"),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {msg}"),
            AppError::Conflict(msg) => write!(f, "Conflict: {msg}"),
            AppError::RateLimited(msg) => write!(f, "Rate Limited: {msg}"),
            AppError::Backend(err) => write!(f, "Backend Error: {err}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::RateLimited(msg) => (StatusCode::TOO_MANY_REQUESTS, msg.clone()),
            AppError::Backend(err) => backend_status(err),
        };

        let body = json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn backend_status(err: &BackendError) -> (StatusCode, String) {
    match err {
        BackendError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
        BackendError::Status { status: 401, message } => {
            (StatusCode::UNAUTHORIZED, message.clone())
        }
        BackendError::Status { status: 400 | 422, message } => {
            (StatusCode::BAD_REQUEST, message.clone())
        }
        other => {
            tracing::error!("Backend error: {other}");
            (
                StatusCode::BAD_GATEWAY,
                "Backend request failed".to_string(),
            )
        }
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Status { status: 409, message } => AppError::Conflict(message),
            other => AppError::Backend(other),
        }
    }
}

impl From<GenerationError> for AppError {
    fn from(err: GenerationError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
