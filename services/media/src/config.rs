//! Storage configuration

use std::path::PathBuf;

use crate::error::{StorageError, StorageResult};

/// Default upload size limit: 50 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;
/// Maximum number of files in one multi-file upload
pub const MAX_FILES_PER_UPLOAD: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    /// Files on local disk, served by the API
    Local,
    /// Objects in an S3 bucket, served by redirect
    S3,
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub mode: StorageMode,
    /// Directory for local mode
    pub upload_path: PathBuf,
    pub bucket: String,
    pub region: String,
    pub max_upload_bytes: usize,
    /// Public path prefix under which local files are served
    pub public_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mode: StorageMode::Local,
            upload_path: PathBuf::from("./uploads"),
            bucket: String::new(),
            region: "ap-south-1".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            public_prefix: "/api/v1/file".to_string(),
        }
    }
}

impl StorageConfig {
    /// Create a new StorageConfig from environment variables
    ///
    /// # Environment Variables
    /// - `STORAGE_MODE`: `local` or `s3` (default: local)
    /// - `UPLOAD_PATH`: Directory for local mode (default: ./uploads)
    /// - `AWS_S3_BUCKET_NAME`: Bucket for s3 mode (required there)
    /// - `AWS_REGION`: Bucket region (default: ap-south-1)
    /// - `MAX_UPLOAD_BYTES`: Per-file size limit (default: 52428800)
    pub fn from_env() -> StorageResult<Self> {
        let defaults = Self::default();

        let mode = match std::env::var("STORAGE_MODE")
            .unwrap_or_else(|_| "local".to_string())
            .to_lowercase()
            .as_str()
        {
            "local" => StorageMode::Local,
            "s3" => StorageMode::S3,
            other => {
                return Err(StorageError::Configuration(format!(
                    "unknown STORAGE_MODE: {}",
                    other
                )));
            }
        };

        let bucket = std::env::var("AWS_S3_BUCKET_NAME").unwrap_or_default();
        if mode == StorageMode::S3 && bucket.trim().is_empty() {
            return Err(StorageError::Configuration(
                "AWS_S3_BUCKET_NAME must be set in s3 mode".to_string(),
            ));
        }

        Ok(StorageConfig {
            mode,
            upload_path: std::env::var("UPLOAD_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_path),
            bucket,
            region: std::env::var("AWS_REGION").unwrap_or(defaults.region),
            max_upload_bytes: std::env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_upload_bytes),
            public_prefix: defaults.public_prefix,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear() {
        unsafe {
            std::env::remove_var("STORAGE_MODE");
            std::env::remove_var("UPLOAD_PATH");
            std::env::remove_var("AWS_S3_BUCKET_NAME");
            std::env::remove_var("AWS_REGION");
            std::env::remove_var("MAX_UPLOAD_BYTES");
        }
    }

    #[test]
    #[serial]
    fn defaults_to_local_disk() {
        clear();
        let config = StorageConfig::from_env().unwrap();
        assert_eq!(config.mode, StorageMode::Local);
        assert_eq!(config.upload_path, PathBuf::from("./uploads"));
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    }

    #[test]
    #[serial]
    fn s3_mode_requires_bucket() {
        clear();
        unsafe {
            std::env::set_var("STORAGE_MODE", "S3");
        }
        assert!(StorageConfig::from_env().is_err());

        unsafe {
            std::env::set_var("AWS_S3_BUCKET_NAME", "bakery-uploads");
        }
        let config = StorageConfig::from_env().unwrap();
        assert_eq!(config.mode, StorageMode::S3);
        assert_eq!(config.region, "ap-south-1");
        clear();
    }
}
