use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::ranking_client::ClientError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Backend timed out: {0}")]
    Timeout(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<ClientError> for AppError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::NotFound(msg) => AppError::NotFound(msg),
            ClientError::Validation(msg) => AppError::Validation(msg),
            ClientError::Api { status, message } if (400..500).contains(&status) => {
                AppError::Validation(message)
            }
            e @ ClientError::Timeout { .. } => AppError::Timeout(e.to_string()),
            e => AppError::Backend(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Timeout(msg) => {
                tracing::error!("Backend timeout: {msg}");
                (StatusCode::GATEWAY_TIMEOUT, "BACKEND_TIMEOUT", msg.clone())
            }
            AppError::Backend(msg) => {
                tracing::error!("Backend error: {msg}");
                (StatusCode::BAD_GATEWAY, "BACKEND_ERROR", msg.clone())
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
