//! Database-specific error types and conversions.

use lift_core::error::LiftError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Invalid stored value: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Unique constraint violated on {entity}")]
    Conflict { entity: String },

    /// Another transaction wrote the same records first. The statement
    /// had no effect and may be run again.
    #[error("Write conflict on {entity}: {message}")]
    WriteConflict { entity: String, message: String },
}

impl DbError {
    /// Classify a failed statement. Unique index violations become
    /// [`DbError::Conflict`], optimistic transaction clashes become
    /// [`DbError::WriteConflict`]; everything else is a query failure.
    pub(crate) fn from_statement(entity: &str, err: surrealdb::Error) -> Self {
        let message = err.to_string();
        if message.contains("already contains") || message.contains("already exists") {
            DbError::Conflict {
                entity: entity.into(),
            }
        } else if is_write_conflict(&message) {
            DbError::WriteConflict {
                entity: entity.into(),
                message,
            }
        } else {
            DbError::Query(message)
        }
    }
}

impl From<DbError> for LiftError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => LiftError::NotFound { entity, id },
            DbError::Conflict { entity } => LiftError::Conflict { entity },
            other => LiftError::Database(other.to_string()),
        }
    }
}

fn is_write_conflict(message: &str) -> bool {
    message.contains("Transaction conflict") || message.contains("retry the transaction")
}

pub(crate) fn parse_uuid(value: &str, what: &str) -> Result<uuid::Uuid, DbError> {
    uuid::Uuid::parse_str(value).map_err(|e| DbError::Decode(format!("invalid {what} UUID: {e}")))
}
