//! Storage abstraction trait
//!
//! This module defines the `Storage` trait that all storage backends must
//! implement, and the error taxonomy storage operations surface.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use docvault_core::models::{BackendKind, StorageLocation};

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Transient backend failure (network, 5xx, timeout). Safe to retry.
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),

    /// Backend refused the write for capacity reasons. Fatal to this upload.
    #[error("Storage quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Object missing on get/delete/stat. Signals metadata/storage
    /// divergence and must be surfaced, never swallowed.
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Unavailable(_))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// All storage backends (S3-compatible, local filesystem) must implement
/// this trait. The lifecycle coordinator works against it without coupling
/// to provider details.
///
/// **Key format:** Keys are tenant-scoped:
/// `documents/{tenant_id}/{document_id}/{upload_session}`. See the crate
/// root documentation.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write an object and return its location.
    ///
    /// Idempotent per key: a repeated put for the same key overwrites the
    /// same object rather than creating a new one.
    async fn put(&self, key: &str, content_type: &str, data: Bytes)
        -> StorageResult<StorageLocation>;

    /// Read an object's content.
    async fn get(&self, location: &StorageLocation) -> StorageResult<Bytes>;

    /// Delete an object. Missing objects surface as `NotFound`.
    async fn delete(&self, location: &StorageLocation) -> StorageResult<()>;

    /// Check whether an object exists.
    async fn exists(&self, location: &StorageLocation) -> StorageResult<bool>;

    /// Size in bytes of an object, if it exists.
    async fn stat(&self, location: &StorageLocation) -> StorageResult<u64>;

    /// The storage backend kind.
    fn backend_kind(&self) -> BackendKind;
}

/// Run a storage operation under a deadline.
///
/// A timeout is treated as `Unavailable`: the caller may retry, and the
/// idempotent key layout prevents duplicate objects.
pub(crate) async fn bounded<T, F>(op: &'static str, limit: Duration, fut: F) -> StorageResult<T>
where
    F: Future<Output = StorageResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(StorageError::Unavailable(format!(
            "{} timed out after {:?}",
            op, limit
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unavailable_is_retryable() {
        assert!(StorageError::Unavailable("timeout".into()).is_retryable());
        assert!(!StorageError::QuotaExceeded("full".into()).is_retryable());
        assert!(!StorageError::NotFound("gone".into()).is_retryable());
        assert!(!StorageError::InvalidKey("..".into()).is_retryable());
    }

    #[tokio::test]
    async fn bounded_maps_timeout_to_unavailable() {
        let result: StorageResult<()> = bounded("put", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(StorageError::Unavailable(_))));
    }
}
