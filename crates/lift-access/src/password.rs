//! Password verification seam.
//!
//! Hashing happens elsewhere; the access core only checks a plaintext
//! against a stored hash through [`CredentialVerifier`].

use argon2::{Argon2, PasswordVerifier};

use crate::error::AccessError;

/// Checks a plaintext password against a stored hash.
pub trait CredentialVerifier: Send + Sync {
    /// `Ok(true)` on match, `Ok(false)` on mismatch.
    fn verify(&self, password: &str, stored_hash: &str) -> Result<bool, AccessError>;
}

/// Argon2 verifier for PHC-format hashes.
///
/// If a pepper is configured it is prepended to the password before
/// verification; it must match the pepper used when hashing.
#[derive(Debug, Clone, Default)]
pub struct Argon2Verifier {
    pepper: Option<String>,
}

impl Argon2Verifier {
    pub fn new(pepper: Option<String>) -> Self {
        Self { pepper }
    }
}

impl CredentialVerifier for Argon2Verifier {
    fn verify(&self, password: &str, stored_hash: &str) -> Result<bool, AccessError> {
        let peppered: String;
        let input = match &self.pepper {
            Some(p) => {
                peppered = format!("{p}{password}");
                peppered.as_bytes()
            }
            None => password.as_bytes(),
        };

        let parsed_hash = argon2::PasswordHash::new(stored_hash)
            .map_err(|e| AccessError::PasswordHash(format!("invalid hash format: {e}")))?;

        match Argon2::default().verify_password(input, &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AccessError::PasswordHash(format!("verify error: {e}"))),
        }
    }
}
