//! Application Error Types
//!
//! Core room errors plus the HTTP-facing error with Axum integration.

use axum::{
    http::{header::RETRY_AFTER, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Errors raised by the room state core.
///
/// Every variant reaches the caller; only [`RoomError::Busy`] is worth retrying.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("User {user_id} is already a member of room {room_id}")]
    AlreadyMember { room_id: i64, user_id: i64 },

    #[error("User {user_id} is not a member of room {room_id}")]
    Forbidden { room_id: i64, user_id: i64 },

    #[error("Room {room_id} is busy: lock not acquired within {waited_ms}ms")]
    Busy { room_id: i64, waited_ms: u64 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl RoomError {
    /// Room lookup failure.
    pub fn room_not_found() -> Self {
        Self::NotFound("Room")
    }

    /// Membership lookup failure.
    pub fn membership_not_found() -> Self {
        Self::NotFound("Membership")
    }

    /// Whether the caller may retry the operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy { .. })
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::AlreadyMember { .. } => "already_member",
            Self::Forbidden { .. } => "forbidden",
            Self::Busy { .. } => "busy",
            Self::Database(_) => "database",
        }
    }
}

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Busy: {0}")]
    Busy(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },
}

impl From<RoomError> for AppError {
    fn from(err: RoomError) -> Self {
        match err {
            RoomError::NotFound(_) => AppError::NotFound(err.to_string()),
            RoomError::AlreadyMember { .. } => AppError::Conflict("Already a member".into()),
            RoomError::Forbidden { .. } => {
                AppError::Forbidden("You are not a member of this room".into())
            }
            RoomError::Busy { .. } => AppError::Busy(err.to_string()),
            RoomError::Database(e) => AppError::Database(e),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

/// Field-level validation error
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, errors) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, 10001, msg, None),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, 10002, msg, None),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, 10003, msg, None),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, 10004, msg, None),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, 10005, msg, None),
            AppError::Busy(msg) => {
                tracing::warn!("Room contention: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, 10006, msg, None)
            }
            AppError::Validation { message, errors } => {
                (StatusCode::BAD_REQUEST, 10007, message, Some(errors))
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    10000,
                    "Internal server error".into(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            code,
            message,
            errors,
        };

        if status == StatusCode::SERVICE_UNAVAILABLE {
            return (status, [(RETRY_AFTER, "1")], Json(body)).into_response();
        }

        (status, Json(body)).into_response()
    }
}
