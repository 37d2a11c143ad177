//! Domain errors for the brandscore orchestration core.

use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors shared by repositories and services.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Execution not found: {0}")]
    ExecutionNotFound(Uuid),

    #[error("Agent not registered: {0}")]
    AgentNotRegistered(String),

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition { from: String, to: String, reason: String },

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
