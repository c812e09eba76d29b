//! Access-layer error types.

use lift_core::error::LiftError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is inactive")]
    AccountInactive,

    #[error("malformed password hash: {0}")]
    PasswordHash(String),

    #[error("failed to render credential image: {0}")]
    ImageEncoding(String),
}

impl From<AccessError> for LiftError {
    fn from(err: AccessError) -> Self {
        match err {
            // Both collapse to the same message so callers cannot tell
            // an unknown account from a wrong password or a disabled one.
            AccessError::InvalidCredentials | AccessError::AccountInactive => {
                LiftError::AuthenticationFailed {
                    reason: AccessError::InvalidCredentials.to_string(),
                }
            }
            AccessError::PasswordHash(msg) => LiftError::Internal(msg),
            AccessError::ImageEncoding(msg) => LiftError::Credential(msg),
        }
    }
}
