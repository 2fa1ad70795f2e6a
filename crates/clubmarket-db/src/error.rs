//! Database error types

use thiserror::Error;

/// Database operation errors
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Query error: {0}")]
    Query(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Expired: {0}")]
    Expired(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DbError {
    /// Map a unique-constraint violation to `Conflict`, everything else to
    /// `Query`.
    pub fn on_insert(e: sqlx::Error, conflict_msg: &str) -> Self {
        if let sqlx::Error::Database(ref db) = e {
            if db.code().as_deref() == Some("23505") {
                return DbError::Conflict(conflict_msg.to_string());
            }
        }
        DbError::Query(e)
    }
}

impl From<serde_json::Error> for DbError {
    fn from(e: serde_json::Error) -> Self {
        DbError::Serialization(e.to_string())
    }
}

impl From<clubmarket_types::DomainError> for DbError {
    fn from(e: clubmarket_types::DomainError) -> Self {
        use clubmarket_types::DomainError;
        match e {
            DomainError::NotFound { entity, id } => DbError::NotFound(format!("{entity} {id}")),
            DomainError::NotAuthorized(m) => DbError::NotAuthorized(m),
            DomainError::InvalidState(m) => DbError::InvalidState(m),
            DomainError::Validation(m) => DbError::InvalidInput(m),
            DomainError::Expired(m) => DbError::Expired(m),
            DomainError::Conflict(m) => DbError::Conflict(m),
            DomainError::NotConfigured => DbError::InvalidState("fee configuration is not set up".into()),
            DomainError::Unsupported(m) => DbError::InvalidInput(m),
        }
    }
}

/// Result type for database operations
pub type DbResult<T> = Result<T, DbError>;
