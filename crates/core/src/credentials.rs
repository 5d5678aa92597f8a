//! Credential validation and password hashes
//!
//! Stored hashes are Argon2id PHC strings (`$argon2id$v=19$m=...$<salt>$<hash>`).
//! The salt is supplied by the caller so that hashing stays deterministic.

use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

pub const USERNAME_MAX_LEN: usize = 50;

/// Salts shorter than this are rejected by Argon2
pub const SALT_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("username must not be empty")]
    EmptyUsername,

    #[error("username must be at most {USERNAME_MAX_LEN} characters, got {0}")]
    UsernameTooLong(usize),

    #[error("password must not be empty")]
    EmptyPassword,

    #[error("stored password hash is malformed")]
    MalformedHash,

    #[error("failed to hash password: {0}")]
    Hashing(String),
}

/// Check a login form before touching the user store
pub fn validate_login(username: &str, password: &str) -> Result<(), CredentialError> {
    validate_username(username)?;

    if password.is_empty() {
        return Err(CredentialError::EmptyPassword);
    }

    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), CredentialError> {
    let len = username.chars().count();

    if len == 0 {
        return Err(CredentialError::EmptyUsername);
    }

    if len > USERNAME_MAX_LEN {
        return Err(CredentialError::UsernameTooLong(len));
    }

    Ok(())
}

/// Hash `password` with `salt` into an Argon2id PHC string
pub fn hash_password(password: &str, salt: &[u8]) -> Result<String, CredentialError> {
    let salt = SaltString::encode_b64(salt).map_err(|e| CredentialError::Hashing(e.to_string()))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CredentialError::Hashing(e.to_string()))
}

/// Check `candidate` against a stored hash
pub fn verify_password(stored: &str, candidate: &str) -> Result<bool, CredentialError> {
    let parsed = PasswordHash::new(stored).map_err(|_| CredentialError::MalformedHash)?;

    match Argon2::default().verify_password(candidate.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(_) => Err(CredentialError::MalformedHash),
    }
}
