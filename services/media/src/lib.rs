//! File upload storage
//!
//! Uploads are checked against a MIME whitelist and a size limit, then
//! written to local disk (development) or an S3 bucket (production) under
//! a generated unique name.

pub mod config;
pub mod error;
pub mod mime;
pub mod storage;

pub use config::{MAX_FILES_PER_UPLOAD, StorageConfig, StorageMode};
pub use error::{StorageError, StorageResult};
pub use storage::{Location, Storage, StoredFile, UploadedFile};
