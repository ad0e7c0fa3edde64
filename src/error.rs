//! Error types for the memo archive.
//!
//! Uses thiserror for ergonomic error definitions that integrate
//! with axum's response system.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

/// A validation failure on a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Resource errors
    #[error("Resource not found: {0}")]
    NotFound(String),

    // Validation errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation failed: {}", join_fields(.0))]
    Validation(Vec<FieldError>),

    // External service errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Chat API error: {0}")]
    ChatApi(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    // Generic errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{} {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// Shorthand for a single-field validation failure.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            // 404
            Self::NotFound(_) => StatusCode::NOT_FOUND,

            // 400
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,

            // 422
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,

            // 502
            Self::ChatApi(_) => StatusCode::BAD_GATEWAY,

            // 504
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,

            // 500
            Self::Database(_) | Self::Config(_) | Self::Internal(_) | Self::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::ChatApi(_) => "CHAT_API_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Other(_) => "UNKNOWN_ERROR",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(code, "{}", message);
        }

        let body = match &self {
            Self::Validation(details) => json!({
                "error": {
                    "code": code,
                    "message": message,
                    "details": details,
                }
            }),
            _ => json!({
                "error": {
                    "code": code,
                    "message": message,
                }
            }),
        };

        (status, Json(body)).into_response()
    }
}

// Convenience conversions
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::ChatApi(format!("HTTP request failed: {}", err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

/// Map a unique-constraint violation to a validation failure on `field`,
/// anything else to `Database`.
pub(crate) fn unique_violation(err: sqlx::Error, field: &str) -> Error {
    match err {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            Error::field(field, "has already been taken")
        }
        _ => Error::Database(err),
    }
}
