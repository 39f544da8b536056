//! Image object storage.
//!
//! Images live under a shared public prefix. Todo records store only the
//! generated object name (`<epoch-millis>-<original-filename>`); the prefix is
//! re-applied with [`public_path`] whenever storage is called.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Default prefix shared by every authenticated identity.
pub const DEFAULT_PUBLIC_PREFIX: &str = "public/";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("invalid object path: {0}")]
    InvalidPath(String),

    #[error("storage I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Object storage operations used for todo images.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` at `path`, replacing any existing object.
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<(), StorageError>;

    /// URL for downloading `path`. With `validate`, fails if the object is missing.
    async fn download_url(&self, path: &str, validate: bool) -> Result<String, StorageError>;

    async fn remove(&self, path: &str) -> Result<(), StorageError>;
}

/// Generate the object name for an uploaded file.
pub fn image_key(original_filename: &str, now_ms: i64) -> String {
    let base = Path::new(original_filename)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    format!("{}-{}", now_ms, base)
}

/// Full storage path for a stored object name.
pub fn public_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() || prefix.ends_with('/') {
        format!("{}{}", prefix, key)
    } else {
        format!("{}/{}", prefix, key)
    }
}

/// Filesystem-backed storage rooted at a directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStorage {
    root: PathBuf,
}

impl LocalObjectStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map an object path onto the filesystem, refusing anything that could
    /// escape the root.
    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        let safe = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }

    fn io_error(path: &str, source: std::io::Error) -> StorageError {
        if source.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(path.to_string())
        } else {
            StorageError::Io {
                path: path.to_string(),
                source,
            }
        }
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Self::io_error(path, e))?;
        }
        let size = bytes.len();
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|e| Self::io_error(path, e))?;
        debug!(path = %path, size, "Uploaded object");
        Ok(())
    }

    async fn download_url(&self, path: &str, validate: bool) -> Result<String, StorageError> {
        let target = self.resolve(path)?;
        if validate {
            tokio::fs::metadata(&target)
                .await
                .map_err(|e| Self::io_error(path, e))?;
        }
        let absolute = if target.is_absolute() {
            target
        } else {
            std::env::current_dir()
                .map_err(|e| Self::io_error(path, e))?
                .join(target)
        };
        Ok(format!("file://{}", absolute.display()))
    }

    async fn remove(&self, path: &str) -> Result<(), StorageError> {
        let target = self.resolve(path)?;
        tokio::fs::remove_file(&target)
            .await
            .map_err(|e| Self::io_error(path, e))?;
        debug!(path = %path, "Removed object");
        Ok(())
    }
}
