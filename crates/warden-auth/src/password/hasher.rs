//! Argon2id password hashing and verification.

use argon2::{
    Argon2,
    password_hash::{
        PasswordHash, PasswordHasher as ArgonHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

use warden_core::error::{AppError, ErrorKind};

/// Well-formed Argon2id hash with default parameters that no password
/// matches. Verifying against it costs the same as a real verification.
const DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$d2FyZGVuLWR1bW15c2FsdA$AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8";

/// One-way salted credential hashing using Argon2id.
#[derive(Debug, Clone, Default)]
pub struct PasswordHasher;

impl PasswordHasher {
    /// Creates a new password hasher instance.
    pub fn new() -> Self {
        Self
    }

    /// Hashes a plaintext password with a fresh random salt. The salt and
    /// parameters are embedded in the returned PHC string.
    pub fn hash_password(&self, password: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))?;

        Ok(hash.to_string())
    }

    /// Verifies a plaintext password against a stored hash.
    ///
    /// Returns `Ok(false)` on mismatch. A stored hash that cannot be parsed
    /// is an internal error, not a mismatch.
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AppError::internal(format!("Invalid password hash format: {e}")))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AppError::internal(format!(
                "Password verification failed: {e}"
            ))),
        }
    }

    /// Verifies `password` on the blocking pool.
    ///
    /// With no stored hash (unknown account) the password is checked
    /// against a dummy hash and `Ok(false)` is returned, so the caller pays
    /// the same cost either way.
    pub async fn verify_password_blocking(
        &self,
        password: &str,
        hash: Option<&str>,
    ) -> Result<bool, AppError> {
        let known = hash.is_some();
        let password = password.to_string();
        let hash = hash.unwrap_or(DUMMY_HASH).to_string();

        let matches = tokio::task::spawn_blocking(move || {
            Self::new().verify_password(&password, &hash)
        })
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Internal, "Password task panicked", e))??;

        Ok(known && matches)
    }
}
