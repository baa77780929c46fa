//! HTTP error mapping.
//!
//! Handlers return `ApiResult<T>`; activities raise `anyhow::Error` and the
//! typed domain errors inside it decide the status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::domains::research::{ResearchAccessDenied, ResearchNotFound, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 400
    #[error("{0}")]
    BadRequest(String),

    /// 403
    #[error("{0}")]
    Forbidden(String),

    /// 404
    #[error("{0}")]
    NotFound(String),

    /// 500 with a caller-facing message; the cause is logged
    #[error("{message}")]
    Failed {
        message: String,
        cause: anyhow::Error,
    },

    /// 500 "Internal server error"; the cause is logged
    #[error(transparent)]
    Internal(anyhow::Error),
}

impl ApiError {
    /// Keep a typed 4xx, otherwise answer 500 with `message`.
    pub fn or_failed(err: anyhow::Error, message: &str) -> Self {
        match ApiError::from(err) {
            ApiError::Internal(cause) => ApiError::Failed {
                message: message.to_string(),
                cause,
            },
            other => other,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(e) = err.downcast_ref::<ValidationError>() {
            return ApiError::BadRequest(e.to_string());
        }
        if let Some(e) = err.downcast_ref::<ResearchAccessDenied>() {
            return ApiError::Forbidden(e.to_string());
        }
        if let Some(e) = err.downcast_ref::<ResearchNotFound>() {
            return ApiError::NotFound(e.to_string());
        }
        ApiError::Internal(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Failed { message, cause } => {
                error!(error = %format!("{:#}", cause), "{}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
            ApiError::Internal(err) => {
                error!(error = %format!("{:#}", err), "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
