//! Unified API error handling with structured responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// API error type with structured responses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message sent to the client. Internal details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => "internal server error".to_string(),
            Self::ServiceUnavailable(_) => "service unavailable".to_string(),
            other => other.to_string(),
        }
    }

    /// Categorize an anyhow error into the appropriate ApiError variant by
    /// looking at its message:
    /// - "not found" -> NotFound
    /// - "already registered" / "already exists" / "unique constraint" -> Conflict
    /// - "pool timed out" / "unavailable" -> ServiceUnavailable
    /// - anything else -> Internal
    ///
    /// Request validation never reaches this path; handlers build
    /// [`ApiError::BadRequest`] themselves.
    pub fn from_anyhow(err: anyhow::Error) -> Self {
        let msg = format!("{err:#}");
        let msg_lower = msg.to_lowercase();

        if msg_lower.contains("not found") {
            ApiError::NotFound(err.to_string())
        } else if msg_lower.contains("already registered")
            || msg_lower.contains("already exists")
            || msg_lower.contains("unique constraint")
        {
            ApiError::Conflict(err.to_string())
        } else if msg_lower.contains("pool timed out") || msg_lower.contains("unavailable") {
            ApiError::ServiceUnavailable(msg)
        } else {
            ApiError::Internal(msg)
        }
    }
}

/// Error envelope: `{"error": {"statusCode": 404, "message": "..."}}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                status_code: status.as_u16(),
                message: message.into(),
            },
        }
    }

    fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.error.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            ApiError::Internal(msg) => {
                error!(status = status.as_u16(), message = %msg, "API error");
            }
            ApiError::ServiceUnavailable(msg) => {
                warn!(status = status.as_u16(), message = %msg, "Service unavailable");
            }
            _ => {
                tracing::debug!(status = status.as_u16(), message = %self, "Client error");
            }
        }

        ErrorResponse::new(status, self.public_message()).into_response()
    }
}

/// Convert anyhow errors to API errors using the centralized categorization logic.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::from_anyhow(err)
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
