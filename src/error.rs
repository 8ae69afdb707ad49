use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;
use tracing::error;

#[derive(Debug, ThisError)]
pub enum HubError {
    #[error("secret unavailable: {0}")]
    SecretUnavailable(String),

    #[error("database connection failed: {0}")]
    ConnectionFailed(String),

    #[error("no JSON data provided")]
    EmptyBody,

    #[error("invalid request data")]
    InvalidBody,

    #[error("invalid name format")]
    InvalidName,

    #[error("invalid email format")]
    InvalidEmail,

    #[error("invalid pagination parameters")]
    InvalidPagination,

    #[error("invalid user id")]
    InvalidId,

    #[error("user not found")]
    NotFound,

    #[error("email already exists")]
    DuplicateEmail,

    #[error("database error: {0}")]
    Database(#[from] SqlxError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("migration {version} failed: {source}")]
    MigrationApply {
        version: String,
        source: Box<HubError>,
    },
}

/// Map every error to a `{"error": "<message>"}` body. Messages are fixed
/// strings; raw database and secret-store detail stays in the server logs.
impl IntoResponse for HubError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            HubError::SecretUnavailable(_) | HubError::ConnectionFailed(_) => {
                error!(error = %self, "request aborted before reaching the database");
                (StatusCode::INTERNAL_SERVER_ERROR, "Database connection failed")
            }
            HubError::Database(_) | HubError::Io(_) | HubError::MigrationApply { .. } => {
                error!(error = %self, "persistence failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error occurred")
            }
            HubError::EmptyBody => (StatusCode::BAD_REQUEST, "No JSON data provided"),
            HubError::InvalidBody => (StatusCode::BAD_REQUEST, "Invalid request data"),
            HubError::InvalidName => (StatusCode::BAD_REQUEST, "Invalid name format"),
            HubError::InvalidEmail => (StatusCode::BAD_REQUEST, "Invalid email format"),
            HubError::InvalidPagination => {
                (StatusCode::BAD_REQUEST, "Invalid pagination parameters")
            }
            HubError::InvalidId => (StatusCode::BAD_REQUEST, "Invalid user ID"),
            HubError::NotFound => (StatusCode::NOT_FOUND, "User not found"),
            HubError::DuplicateEmail => (StatusCode::CONFLICT, "Email already exists"),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
