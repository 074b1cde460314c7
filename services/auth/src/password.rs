//! Password hashing and verification using Argon2id
//!
//! Hashes are PHC strings with a per-hash random salt. Verification never
//! errors: anything other than a successful match, including an unreadable
//! stored hash, is reported as `false`.

use std::sync::OnceLock;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand::{Rng, distributions::Alphanumeric};
use thiserror::Error;
use tracing::warn;

/// Length of generated temporary passwords
pub const TEMPORARY_PASSWORD_LENGTH: usize = 12;

static DUMMY_HASH: OnceLock<String> = OnceLock::new();

/// Hash of a random password nobody knows, built on first use
fn dummy_hash() -> &'static str {
    DUMMY_HASH.get_or_init(|| {
        hash_password(&generate_temporary_password()).unwrap_or_else(|e| {
            warn!("Could not prepare dummy password hash: {}", e);
            String::new()
        })
    })
}

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hash(String),

    #[error("hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Hash a plaintext password
pub fn hash_password(plaintext: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Verify a plaintext password against a stored hash
pub fn verify_password(plaintext: &str, stored_hash: &str) -> bool {
    let parsed = match PasswordHash::new(stored_hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Stored password hash is unreadable: {}", e);
            return false;
        }
    };

    Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok()
}

/// [`hash_password`] on the blocking pool
pub async fn hash_password_async(plaintext: String) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hash_password(&plaintext)).await?
}

/// [`verify_password`] on the blocking pool; a failed task counts as a mismatch
pub async fn verify_password_async(plaintext: String, stored_hash: String) -> bool {
    match tokio::task::spawn_blocking(move || verify_password(&plaintext, &stored_hash)).await {
        Ok(matched) => matched,
        Err(e) => {
            warn!("Password verification task failed: {}", e);
            false
        }
    }
}

/// Burn the cost of one verification for a login with no matching account,
/// so unknown emails take as long as wrong passwords
pub async fn verify_against_dummy(plaintext: String) {
    if let Err(e) =
        tokio::task::spawn_blocking(move || verify_password(&plaintext, dummy_hash())).await
    {
        warn!("Password verification task failed: {}", e);
    }
}

/// Generate a random temporary password for provisioned accounts
pub fn generate_temporary_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TEMPORARY_PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}
