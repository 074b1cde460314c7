//! Storage error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid file type: {0}")]
    UnsupportedType(String),

    #[error("File exceeds the maximum size of {limit} bytes")]
    TooLarge { limit: usize },

    #[error("File not found")]
    NotFound(String),

    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object storage error: {0}")]
    S3(String),

    #[error("Storage configuration error: {0}")]
    Configuration(String),
}

impl StorageError {
    /// Caller mistakes, as opposed to failures of the backend
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            StorageError::UnsupportedType(_)
                | StorageError::TooLarge { .. }
                | StorageError::NotFound(_)
                | StorageError::InvalidName(_)
        )
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
