//! Error types for the lift access system.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum LiftError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// Uniqueness violation. Services retry or translate these; they
    /// are not meant to reach end users.
    #[error("Entity already exists: {entity}")]
    Conflict { entity: String },

    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Authorization denied: {reason}")]
    AuthorizationDenied { reason: String },

    #[error("Authorization denied: no permission to grant access to floors {}", join_ids(.floor_ids))]
    FloorAccessDenied { floor_ids: Vec<Uuid> },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LiftError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Message safe to hand to an end user.
    ///
    /// Storage and internal failures collapse to a generic message; the
    /// detail only goes to the server log.
    pub fn client_message(&self) -> String {
        match self {
            LiftError::Database(_)
            | LiftError::Internal(_)
            | LiftError::Credential(_)
            | LiftError::Conflict { .. } => "The request could not be completed".into(),
            other => other.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LiftError::NotFound { .. })
    }
}

fn join_ids(ids: &[Uuid]) -> String {
    ids.iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub type LiftResult<T> = Result<T, LiftError>;
