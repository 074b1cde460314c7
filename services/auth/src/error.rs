//! Account operation error taxonomy

use common::error::DatabaseError;
use thiserror::Error;

use crate::jwt::TokenError;
use crate::password::PasswordError;

#[derive(Debug, Error)]
pub enum AccountError {
    /// Missing or malformed input
    #[error("{0}")]
    Validation(String),

    /// Missing, invalid or expired credentials
    #[error("{0}")]
    Authentication(String),

    /// Valid identity without the required role or status
    #[error("{0}")]
    Authorization(String),

    /// Uniqueness violation
    #[error("{0}")]
    Conflict(String),

    /// Referenced entity is absent
    #[error("{0}")]
    NotFound(String),

    #[error("database failure: {0}")]
    Database(#[from] DatabaseError),

    #[error("password hashing failure: {0}")]
    Password(#[from] PasswordError),

    #[error("token failure: {0}")]
    Token(#[from] TokenError),
}

impl AccountError {
    pub fn validation(message: impl Into<String>) -> Self {
        AccountError::Validation(message.into())
    }

    pub fn not_found() -> Self {
        AccountError::NotFound("User not found".to_string())
    }

    /// Whether this error is unexpected (maps to an internal server error)
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AccountError::Database(_) | AccountError::Password(_) | AccountError::Token(_)
        )
    }
}

pub type AccountResult<T> = Result<T, AccountError>;
