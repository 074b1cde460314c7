//! Upload storage backends

use std::path::PathBuf;

use aws_config::BehaviorVersion;
use aws_sdk_s3::{Client, config::Region, primitives::ByteStream};
use chrono::Utc;
use rand::{Rng, distributions::Alphanumeric};
use serde::Serialize;
use tracing::{error, info};

use crate::config::{StorageConfig, StorageMode};
use crate::error::{StorageError, StorageResult};
use crate::mime;

/// An upload as received from the client
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Description of a stored file, as returned to clients
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub name: String,
    pub original_name: String,
    pub mimetype: String,
    pub extension: String,
    /// Upload directory or bucket name
    pub destination: String,
    /// Public reference: an API path in local mode, an object URL in S3 mode
    pub path: String,
    pub size: usize,
}

/// Where a stored file can be fetched from
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    Local(PathBuf),
    Remote(String),
}

#[derive(Clone)]
enum Backend {
    Local,
    S3(Client),
}

/// Upload storage
#[derive(Clone)]
pub struct Storage {
    config: StorageConfig,
    backend: Backend,
}

/// `{millis}-{7 random chars}{ext}`
fn unique_name(extension: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(7)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{}-{}{}", Utc::now().timestamp_millis(), suffix, extension)
}

/// Reject names that could escape the upload directory
fn check_name(name: &str) -> StorageResult<()> {
    if name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0'])
        || name.contains("..")
    {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}

impl Storage {
    /// Build the backend selected by the configuration
    pub async fn from_config(config: StorageConfig) -> StorageResult<Self> {
        match config.mode {
            StorageMode::Local => Self::local(config).await,
            StorageMode::S3 => {
                let sdk_config = aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(config.region.clone()))
                    .load()
                    .await;
                let client = Client::new(&sdk_config);
                Ok(Self::s3(config, client))
            }
        }
    }

    /// Local-disk storage; creates the upload directory if needed
    pub async fn local(config: StorageConfig) -> StorageResult<Self> {
        tokio::fs::create_dir_all(&config.upload_path).await?;
        info!("Storing uploads under {}", config.upload_path.display());
        Ok(Self {
            config,
            backend: Backend::Local,
        })
    }

    pub fn s3(config: StorageConfig, client: Client) -> Self {
        info!("Storing uploads in bucket {}", config.bucket);
        Self {
            config,
            backend: Backend::S3(client),
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.config.max_upload_bytes
    }

    /// Check type and size before anything is written
    pub fn validate(&self, content_type: &str, size: usize) -> StorageResult<()> {
        if !mime::is_allowed(content_type) {
            return Err(StorageError::UnsupportedType(content_type.to_string()));
        }
        if size > self.config.max_upload_bytes {
            return Err(StorageError::TooLarge {
                limit: self.config.max_upload_bytes,
            });
        }
        Ok(())
    }

    fn object_url(&self, name: &str) -> String {
        format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            self.config.bucket, self.config.region, name
        )
    }

    /// Persist an upload under a fresh unique name
    pub async fn store(&self, file: UploadedFile) -> StorageResult<StoredFile> {
        self.validate(&file.content_type, file.bytes.len())?;

        let extension = mime::extension_of(&file.original_name);
        let name = unique_name(&extension);
        let size = file.bytes.len();

        let (destination, path) = match &self.backend {
            Backend::Local => {
                let target = self.config.upload_path.join(&name);
                tokio::fs::write(&target, &file.bytes).await?;
                (
                    self.config.upload_path.display().to_string(),
                    format!("{}/{}", self.config.public_prefix, name),
                )
            }
            Backend::S3(client) => {
                client
                    .put_object()
                    .bucket(&self.config.bucket)
                    .key(&name)
                    .body(ByteStream::from(file.bytes))
                    .content_type(&file.content_type)
                    .send()
                    .await
                    .map_err(|e| {
                        error!("Failed to upload {} to S3: {}", name, e);
                        StorageError::S3(e.to_string())
                    })?;
                (self.config.bucket.clone(), self.object_url(&name))
            }
        };

        info!("Stored upload {} ({} bytes)", name, size);
        Ok(StoredFile {
            name,
            original_name: file.original_name,
            mimetype: file.content_type,
            extension,
            destination,
            path,
            size,
        })
    }

    /// Resolve a stored file name
    pub async fn locate(&self, name: &str) -> StorageResult<Location> {
        check_name(name)?;

        match &self.backend {
            Backend::Local => {
                let path = self.config.upload_path.join(name);
                if tokio::fs::try_exists(&path).await? {
                    Ok(Location::Local(path))
                } else {
                    Err(StorageError::NotFound(name.to_string()))
                }
            }
            Backend::S3(_) => Ok(Location::Remote(self.object_url(name))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn local_storage(dir: &TempDir) -> Storage {
        Storage::local(StorageConfig {
            upload_path: dir.path().join("uploads"),
            max_upload_bytes: 16,
            ..Default::default()
        })
        .await
        .unwrap()
    }

    fn png(bytes: &[u8]) -> UploadedFile {
        UploadedFile {
            original_name: "cake.png".into(),
            content_type: "image/png".into(),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn unique_names_keep_extension() {
        let a = unique_name(".png");
        let b = unique_name(".png");
        assert!(a.ends_with(".png"));
        assert_ne!(a, b);
        let (millis, rest) = a.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(rest.len(), 7 + 4);
    }

    #[test]
    fn traversal_names_are_rejected() {
        assert!(check_name("../etc/passwd").is_err());
        assert!(check_name("a/b.png").is_err());
        assert!(check_name(".env").is_err());
        assert!(check_name("").is_err());
        assert!(check_name("1700000000000-abc1234.png").is_ok());
    }

    #[tokio::test]
    async fn stores_and_locates_local_files() {
        let dir = TempDir::new().unwrap();
        let storage = local_storage(&dir).await;

        let stored = storage.store(png(b"\x89PNG")).await.unwrap();
        assert_eq!(stored.original_name, "cake.png");
        assert_eq!(stored.extension, ".png");
        assert_eq!(stored.size, 4);
        assert_eq!(stored.path, format!("/api/v1/file/{}", stored.name));

        match storage.locate(&stored.name).await.unwrap() {
            Location::Local(path) => {
                assert_eq!(tokio::fs::read(path).await.unwrap(), b"\x89PNG");
            }
            other => panic!("unexpected location {:?}", other),
        }

        assert!(matches!(
            storage.locate("missing.png").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn rejects_type_and_size() {
        let dir = TempDir::new().unwrap();
        let storage = local_storage(&dir).await;

        let err = storage
            .store(UploadedFile {
                content_type: "application/x-sh".into(),
                ..png(b"#!/bin/sh")
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::UnsupportedType(_)));

        let err = storage.store(png(&[0u8; 17])).await.unwrap_err();
        assert!(matches!(err, StorageError::TooLarge { limit: 16 }));
    }

    #[tokio::test]
    async fn s3_locations_are_object_urls() {
        let client = Client::from_conf(
            aws_sdk_s3::Config::builder()
                .behavior_version(BehaviorVersion::latest())
                .region(Region::new("ap-south-1"))
                .build(),
        );
        let storage = Storage::s3(
            StorageConfig {
                mode: StorageMode::S3,
                bucket: "bakery-uploads".into(),
                ..Default::default()
            },
            client,
        );

        assert_eq!(
            storage.locate("1-abc.png").await.unwrap(),
            Location::Remote(
                "https://bakery-uploads.s3.ap-south-1.amazonaws.com/1-abc.png".to_string()
            )
        );
    }
}
