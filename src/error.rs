//! Error types for the Rotonde circulation engine

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error codes exposed on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Success = 0,
    Failure = 1,
    DbFailure = 2,
    BadValue = 3,
    NoSuchData = 4,
    Conflict = 5,
    LimitExceeded = 6,
    DuplicateBarcode = 7,
    LotExhausted = 8,
    RenewalLimitReached = 9,
    InvalidStateTransition = 10,
    NoConnectorAvailable = 11,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Genre limit exceeded for '{genre}': {current} active, limit {limit}")]
    LimitExceeded {
        genre: String,
        limit: i16,
        current: i64,
    },

    #[error("Duplicate barcode: {0}")]
    DuplicateBarcode(String),

    #[error("Barcode lot exhausted: {0}")]
    LotExhausted(String),

    #[error("Renewal limit reached ({current}/{max})")]
    RenewalLimitReached { current: i16, max: i16 },

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("No connector available: {0}")]
    NoConnectorAvailable(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl AppError {
    /// Wire-level error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation(_) => ErrorCode::BadValue,
            AppError::NotFound(_) => ErrorCode::NoSuchData,
            AppError::Conflict(_) => ErrorCode::Conflict,
            AppError::LimitExceeded { .. } => ErrorCode::LimitExceeded,
            AppError::DuplicateBarcode(_) => ErrorCode::DuplicateBarcode,
            AppError::LotExhausted(_) => ErrorCode::LotExhausted,
            AppError::RenewalLimitReached { .. } => ErrorCode::RenewalLimitReached,
            AppError::InvalidStateTransition(_) => ErrorCode::InvalidStateTransition,
            AppError::NoConnectorAvailable(_) => ErrorCode::NoConnectorAvailable,
            AppError::Database(_) => ErrorCode::DbFailure,
            AppError::Internal(_) => ErrorCode::Failure,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::LimitExceeded { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string())
            }
            AppError::DuplicateBarcode(_) => (StatusCode::CONFLICT, self.to_string()),
            AppError::LotExhausted(_) => (StatusCode::CONFLICT, self.to_string()),
            AppError::RenewalLimitReached { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string())
            }
            AppError::InvalidStateTransition(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::NoConnectorAvailable(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_are_stable() {
        assert_eq!(
            AppError::Validation("x".into()).code() as u32,
            ErrorCode::BadValue as u32
        );
        assert_eq!(
            AppError::LotExhausted("lot 3".into()).code(),
            ErrorCode::LotExhausted
        );
        assert_eq!(
            AppError::LimitExceeded {
                genre: "strategy".into(),
                limit: 3,
                current: 3
            }
            .code(),
            ErrorCode::LimitExceeded
        );
    }

    #[test]
    fn limit_exceeded_message_names_genre_and_counts() {
        let e = AppError::LimitExceeded {
            genre: "strategy".into(),
            limit: 3,
            current: 3,
        };
        let msg = e.to_string();
        assert!(msg.contains("strategy"));
        assert!(msg.contains('3'));
    }
}
