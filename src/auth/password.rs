use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::AuthError;

/// Hash a plaintext password using Argon2 with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Crypto(format!("failed to hash password: {}", e)))
}

/// Verify a plaintext password against a stored PHC hash string.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AuthError::Crypto(format!("invalid password hash: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Verification target for nonexistent accounts. Any well-formed Argon2
/// PHC string works; no real password ever hashes to it.
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$MDEyMzQ1Njc4OWFiY2RlZg$GpZ3sK/oWzmTYyfZvFkwJRYEXfkX1XjJ2Z1WAsGjQ6Y";

/// Burn roughly the same time as a real verification. Called when the
/// username does not exist, so response timing cannot be used to probe
/// which accounts are registered.
pub fn burn_verification(password: &str) {
    let _ = verify_password(password, DUMMY_HASH);
}
