//! Resident/admin sign-in.

use chrono::Utc;
use lift_core::context::AccessContext;
use lift_core::error::{LiftError, LiftResult};
use lift_core::models::user::{CreateUser, Role, UpdateUser, User};
use lift_core::repository::UserRepository;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::AccessError;
use crate::password::CredentialVerifier;

/// Self-service sign-up. The password arrives already hashed by the
/// credential collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResident {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

/// Authentication service.
///
/// Generic over the user repository and the password verifier so the
/// access layer has no dependency on the database crate.
pub struct AuthService<U: UserRepository, V: CredentialVerifier> {
    user_repo: U,
    verifier: V,
}

impl<U: UserRepository, V: CredentialVerifier> AuthService<U, V> {
    pub fn new(user_repo: U, verifier: V) -> Self {
        Self {
            user_repo,
            verifier,
        }
    }

    /// Check an email/password pair and return the caller context.
    ///
    /// Unknown email, wrong password and inactive account all fail the
    /// same way. A successful sign-in stamps `last_login_at`.
    pub async fn authenticate(&self, email: &str, password: &str) -> LiftResult<AccessContext> {
        let user = match self.user_repo.get_by_email(email.trim()).await {
            Ok(user) => user,
            Err(LiftError::NotFound { .. }) => return Err(AccessError::InvalidCredentials.into()),
            Err(e) => return Err(e),
        };

        if !self.verifier.verify(password, &user.password_hash)? {
            warn!(user_id = %user.id, "Password mismatch");
            return Err(AccessError::InvalidCredentials.into());
        }

        if !user.is_active {
            warn!(user_id = %user.id, "Sign-in attempt on inactive account");
            return Err(AccessError::AccountInactive.into());
        }

        self.user_repo
            .update(
                user.id,
                UpdateUser {
                    last_login_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await?;

        info!(user_id = %user.id, role = ?user.role, "User signed in");
        Ok(AccessContext::new(user.id, user.role))
    }

    /// Create an active, unconfirmed resident account.
    ///
    /// A taken email is a validation error, whether it is found up
    /// front or lost to a concurrent sign-up at insert time.
    pub async fn register(&self, input: RegisterResident) -> LiftResult<User> {
        let email = input.email.trim().to_string();
        let first_name = input.first_name.trim().to_string();
        let last_name = input.last_name.trim().to_string();
        if email.is_empty() || !email.contains('@') {
            return Err(LiftError::validation("a valid email is required"));
        }
        if first_name.is_empty() || last_name.is_empty() {
            return Err(LiftError::validation("first and last name are required"));
        }
        if input.password_hash.is_empty() {
            return Err(LiftError::validation("a password is required"));
        }

        match self.user_repo.get_by_email(&email).await {
            Ok(_) => return Err(email_taken()),
            Err(LiftError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        let user = self
            .user_repo
            .create(CreateUser {
                email,
                first_name,
                last_name,
                password_hash: input.password_hash,
                role: Role::Resident,
            })
            .await
            .map_err(|e| match e {
                LiftError::Conflict { .. } => email_taken(),
                other => other,
            })?;

        info!(user_id = %user.id, "Resident registered");
        Ok(user)
    }
}

fn email_taken() -> LiftError {
    LiftError::validation("email is already registered")
}
