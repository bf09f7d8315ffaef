//! bcrypt password hashing.
//!
//! Hashing is CPU bound, so the async entry points hand the work to the
//! blocking thread pool.

use thiserror::Error;

pub use bcrypt::DEFAULT_COST;

/// Password hashing errors
#[derive(Debug, Error, PartialEq)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("Password hashing task failed: {0}")]
    Task(String),
}

/// Hash a password on the calling thread
pub fn hash_blocking(password: &str, cost: u32) -> Result<String, PasswordError> {
    bcrypt::hash(password, cost).map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Check a password on the calling thread. Malformed hashes never verify.
pub fn verify_blocking(password: &str, stored: &str) -> bool {
    bcrypt::verify(password, stored).unwrap_or(false)
}

/// Hash a password without stalling the async workers
pub async fn hash_password(password: String, cost: u32) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hash_blocking(&password, cost))
        .await
        .map_err(|e| PasswordError::Task(e.to_string()))?
}

/// Check a password against a stored hash without stalling the async workers
pub async fn verify_password(password: String, stored: String) -> Result<bool, PasswordError> {
    tokio::task::spawn_blocking(move || verify_blocking(&password, &stored))
        .await
        .map_err(|e| PasswordError::Task(e.to_string()))
}
