//! Argon2id password hashing.

use super::{ServiceError, ServiceResult};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

/// Hashes `plain` into a PHC string with a fresh random salt.
///
/// # Errors
/// - [`ServiceError::InvalidInput`] for an empty password.
/// - [`ServiceError::PasswordHash`] when hashing fails.
pub fn hash_password(plain: &str) -> ServiceResult<String> {
    if plain.is_empty() {
        return Err(ServiceError::InvalidInput(
            "password must not be empty".to_string(),
        ));
    }

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|err| ServiceError::PasswordHash(err.to_string()))?;
    Ok(hash.to_string())
}

/// Checks `plain` against a stored PHC hash.
///
/// Returns `Ok(false)` on mismatch.
pub fn verify_password(plain: &str, hash: &str) -> ServiceResult<bool> {
    let parsed =
        PasswordHash::new(hash).map_err(|err| ServiceError::PasswordHash(err.to_string()))?;
    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(err) => Err(ServiceError::PasswordHash(err.to_string())),
    }
}
