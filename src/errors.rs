use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};

/// Standard error payload returned to clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Additional error details (validation errors in dev mode)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        sea_orm::error::DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not enough material available: {0}")]
    InsufficientStock(String),

    #[error("Not enough capacity: {0}")]
    InsufficientCapacity(String),

    #[error("Circular packaging hierarchy detected at packaging type {0}")]
    CycleDetected(i64),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Internal server error")]
    InternalServerError,

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

pub trait IntoDbErr {
    fn into_db_err(self) -> DbErr;
}

impl IntoDbErr for DbErr {
    fn into_db_err(self) -> DbErr {
        self
    }
}

impl IntoDbErr for String {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self)
    }
}

impl IntoDbErr for &str {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self.to_string())
    }
}

impl ServiceError {
    /// Generic constructor that normalizes any supported database error input.
    pub fn db_error<E: IntoDbErr>(error: E) -> Self {
        ServiceError::DatabaseError(error.into_db_err())
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_)
            | Self::InvalidOperation(_)
            | Self::InvalidInput(_)
            | Self::CycleDetected(_) => StatusCode::BAD_REQUEST,
            Self::InsufficientStock(_) | Self::InsufficientCapacity(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::InternalError(_) | Self::InternalServerError | Self::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_) | Self::Other(_) => "Internal server error".to_string(),
            Self::InternalServerError => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            details: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

/// API error type for HTTP handler boundaries.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Service error: {0}")]
    ServiceError(#[from] ServiceError),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Internal server error")]
    InternalServerError,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::ServiceError(err) => err.into_response(),
            Self::ValidationError(message) => {
                error_response(StatusCode::UNPROCESSABLE_ENTITY, message)
            }
            Self::NotFound(message) => error_response(StatusCode::NOT_FOUND, message),
            Self::BadRequest(message) => error_response(StatusCode::BAD_REQUEST, message),
            Self::Unauthorized => {
                error_response(StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
            }
            Self::InternalServerError => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        }
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    let err = ErrorResponse {
        error: status.canonical_reason().unwrap_or("Error").to_string(),
        message,
        details: None,
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    (status, Json(err)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let err = ServiceError::NotFound("packaging type 7".into());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert!(err.response_message().contains("packaging type 7"));
    }

    #[test]
    fn internal_errors_do_not_leak_details() {
        let err = ServiceError::InternalError("connection pool exhausted".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.response_message(), "Internal server error");
    }

    #[test]
    fn precondition_failures_map_to_422() {
        let err = ServiceError::InsufficientStock("cardboard".into());
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn cycle_detected_is_a_client_error() {
        let err = ServiceError::CycleDetected(12);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.response_message().contains("12"));
    }
}
