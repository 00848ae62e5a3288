use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::traits::{bounded, Storage, StorageError, StorageResult};
use docvault_core::models::{BackendKind, StorageLocation};

/// Local filesystem storage implementation
///
/// Used for development and tests; keys map onto paths below a base
/// directory with traversal validation.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    op_timeout: Duration,
}

impl LocalStorage {
    /// Create a new LocalStorage instance rooted at `base_path`.
    pub async fn new(base_path: impl Into<PathBuf>, op_timeout: Duration) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            op_timeout,
        })
    }

    /// Convert a storage key to a filesystem path with traversal validation.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        if storage_key.is_empty()
            || storage_key.contains("..")
            || storage_key.starts_with('/')
            || storage_key.contains('\\')
        {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }
        Ok(self.base_path.join(storage_key))
    }

    fn location(&self, key: &str) -> StorageLocation {
        StorageLocation {
            backend: BackendKind::Local,
            bucket: self.base_path.display().to_string(),
            key: key.to_string(),
            region: "local".to_string(),
            endpoint: None,
        }
    }

    async fn ensure_parent_dir(path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    fn classify_io(key: &str, err: std::io::Error) -> StorageError {
        match err.kind() {
            ErrorKind::NotFound => StorageError::NotFound(key.to_string()),
            ErrorKind::StorageFull => StorageError::QuotaExceeded(err.to_string()),
            _ => StorageError::Io(err),
        }
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put(
        &self,
        key: &str,
        _content_type: &str,
        data: Bytes,
    ) -> StorageResult<StorageLocation> {
        let path = self.key_to_path(key)?;
        let size = data.len() as u64;

        bounded("put", self.op_timeout, async {
            Self::ensure_parent_dir(&path).await?;
            let mut file = fs::File::create(&path)
                .await
                .map_err(|e| Self::classify_io(key, e))?;
            file.write_all(&data)
                .await
                .map_err(|e| Self::classify_io(key, e))?;
            file.flush().await.map_err(|e| Self::classify_io(key, e))?;
            Ok(())
        })
        .await?;

        tracing::debug!(key = %key, size_bytes = size, "Local put successful");
        Ok(self.location(key))
    }

    async fn get(&self, location: &StorageLocation) -> StorageResult<Bytes> {
        let key = location.key.as_str();
        let path = self.key_to_path(key)?;

        bounded("get", self.op_timeout, async {
            let data = fs::read(&path)
                .await
                .map_err(|e| Self::classify_io(key, e))?;
            Ok(Bytes::from(data))
        })
        .await
    }

    async fn delete(&self, location: &StorageLocation) -> StorageResult<()> {
        let key = location.key.as_str();
        let path = self.key_to_path(key)?;

        bounded("delete", self.op_timeout, async {
            fs::remove_file(&path)
                .await
                .map_err(|e| Self::classify_io(key, e))
        })
        .await?;

        tracing::debug!(key = %key, "Local delete successful");
        Ok(())
    }

    async fn exists(&self, location: &StorageLocation) -> StorageResult<bool> {
        let path = self.key_to_path(&location.key)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn stat(&self, location: &StorageLocation) -> StorageResult<u64> {
        let key = location.key.as_str();
        let path = self.key_to_path(key)?;
        let meta = fs::metadata(&path)
            .await
            .map_err(|e| Self::classify_io(key, e))?;
        Ok(meta.len())
    }

    fn backend_kind(&self) -> BackendKind {
        BackendKind::Local
    }
}
