//! Shared error taxonomy
//!
//! Every failure in the domain maps to one of these kinds; layers above
//! (database, API) translate into and out of this taxonomy so a caller can
//! always act on the message.

use thiserror::Error;

/// Result type for domain operations
pub type DomainResult<T> = std::result::Result<T, DomainError>;

/// Domain error kinds
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    /// Referenced entity does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Actor lacks permission for the requested mutation
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// Requested transition is illegal for the entity's current status
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Malformed or out-of-range input
    #[error("validation failed: {0}")]
    Validation(String),

    /// Payment intent past its expiry window
    #[error("expired: {0}")]
    Expired(String),

    /// Uniqueness violation
    #[error("conflict: {0}")]
    Conflict(String),

    /// No active fee configuration exists
    #[error("fee configuration is not set up")]
    NotConfigured,

    /// Declared in the schema but not computable here
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_actionable() {
        let err = DomainError::not_found("listing", "abc");
        assert_eq!(err.to_string(), "listing not found: abc");

        let err = DomainError::InvalidState("listing cannot be extended: maximum extensions reached".into());
        assert!(err.to_string().contains("maximum extensions reached"));
    }
}
