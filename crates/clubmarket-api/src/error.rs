//! API error handling
//!
//! Maps the layered error taxonomy onto HTTP statuses. Every response body
//! carries a stable machine code plus a human-actionable message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

/// API error kinds
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Expired: {0}")]
    Expired(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Database error")]
    DatabaseError,

    #[error("Internal error")]
    InternalError,
}

impl ApiError {
    /// Stable machine-readable code for clients
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::Expired(_) => "EXPIRED",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) | Self::InvalidState(_) => StatusCode::CONFLICT,
            Self::Expired(_) => StatusCode::GONE,
            Self::BadRequest(_) | Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::DatabaseError | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// API error response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub code: String,
    /// Human-readable error message
    pub msg: String,
}

impl From<&ApiError> for ErrorResponse {
    fn from(err: &ApiError) -> Self {
        Self {
            code: err.code().to_string(),
            msg: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_response = ErrorResponse::from(&self);
        (status, Json(error_response)).into_response()
    }
}

impl From<clubmarket_db::DbError> for ApiError {
    fn from(err: clubmarket_db::DbError) -> Self {
        use clubmarket_db::DbError;
        match err {
            DbError::NotFound(msg) => Self::NotFound(msg),
            DbError::NotAuthorized(msg) => Self::Forbidden(msg),
            DbError::Conflict(msg) => Self::Conflict(msg),
            DbError::InvalidState(msg) => Self::InvalidState(msg),
            DbError::Expired(msg) => Self::Expired(msg),
            DbError::InvalidInput(msg) => Self::BadRequest(msg),
            other => {
                tracing::error!(error = ?other, "Database error");
                Self::DatabaseError
            }
        }
    }
}

impl From<clubmarket_types::DomainError> for ApiError {
    fn from(err: clubmarket_types::DomainError) -> Self {
        use clubmarket_types::DomainError;
        match err {
            DomainError::NotFound { .. } => Self::NotFound(err.to_string()),
            DomainError::NotAuthorized(msg) => Self::Forbidden(msg),
            DomainError::InvalidState(msg) => Self::InvalidState(msg),
            DomainError::Validation(msg) => Self::ValidationError(msg),
            DomainError::Expired(msg) => Self::Expired(msg),
            DomainError::Conflict(msg) => Self::Conflict(msg),
            DomainError::NotConfigured => {
                Self::ServiceUnavailable("fee configuration is not set up".to_string())
            }
            DomainError::Unsupported(msg) => Self::BadRequest(msg),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = err
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    format!(
                        "{}: {}",
                        field,
                        e.message.as_ref().map(|m| m.as_ref()).unwrap_or("invalid")
                    )
                })
            })
            .collect();
        Self::ValidationError(messages.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::NotFound("listing".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::InvalidState("already accepted".to_string()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Expired("intent".to_string()).status_code(),
            StatusCode::GONE
        );
    }

    #[test]
    fn test_domain_error_mapping() {
        use clubmarket_types::DomainError;
        let api: ApiError = DomainError::NotConfigured.into();
        assert_eq!(api.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let api: ApiError = DomainError::Conflict("dup".into()).into();
        assert_eq!(api.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_db_error_mapping_hides_internals() {
        let api: ApiError = clubmarket_db::DbError::Connection("pg down".to_string()).into();
        assert_eq!(api.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api.to_string().contains("pg down"));
    }
}
