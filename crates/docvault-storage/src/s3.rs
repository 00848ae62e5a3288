use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStoreExt, PutPayload, Result as ObjectResult};

use crate::traits::{bounded, Storage, StorageError, StorageResult};
use docvault_core::models::{BackendKind, StorageLocation};

/// S3-compatible storage implementation
///
/// Covers both AWS S3 and S3-compatible providers (MinIO, DigitalOcean
/// Spaces) through an optional custom endpoint.
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    kind: BackendKind,
    bucket: String,
    region: String,
    endpoint_url: Option<String>,
    op_timeout: Duration,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `kind` - `BackendKind::S3` or `BackendKind::Minio`
    /// * `bucket` - bucket name
    /// * `region` - AWS region (or region identifier for compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL
    ///   (e.g., "http://localhost:9000" for MinIO)
    /// * `op_timeout` - Deadline applied to every storage operation
    pub async fn new(
        kind: BackendKind,
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
        op_timeout: Duration,
    ) -> StorageResult<Self> {
        // Build the object store from environment credentials plus explicit settings.
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage {
            store,
            kind,
            bucket,
            region,
            endpoint_url,
            op_timeout,
        })
    }

    fn location(&self, key: &str) -> StorageLocation {
        StorageLocation {
            backend: self.kind,
            bucket: self.bucket.clone(),
            key: key.to_string(),
            region: self.region.clone(),
            endpoint: self.endpoint_url.clone(),
        }
    }

    /// Map object_store failures onto the storage taxonomy.
    fn classify(key: &str, err: ObjectStoreError) -> StorageError {
        match err {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.to_string()),
            other => {
                let msg = other.to_string();
                if msg.contains("QuotaExceeded") || msg.contains("InsufficientStorage") {
                    StorageError::QuotaExceeded(msg)
                } else {
                    StorageError::Unavailable(msg)
                }
            }
        }
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn put(
        &self,
        key: &str,
        _content_type: &str,
        data: Bytes,
    ) -> StorageResult<StorageLocation> {
        let size = data.len() as u64;
        let path = Path::from(key.to_string());
        let start = std::time::Instant::now();

        bounded("put", self.op_timeout, async {
            let result: ObjectResult<_> = self.store.put(&path, PutPayload::from(data)).await;
            result.map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 put failed"
                );
                Self::classify(key, e)
            })?;
            Ok(())
        })
        .await?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 put successful"
        );

        Ok(self.location(key))
    }

    async fn get(&self, location: &StorageLocation) -> StorageResult<Bytes> {
        let key = location.key.as_str();
        let path = Path::from(key.to_string());
        let start = std::time::Instant::now();

        let bytes = bounded("get", self.op_timeout, async {
            let result: ObjectResult<_> = self.store.get(&path).await;
            let result = result.map_err(|e| match e {
                ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.to_string()),
                other => {
                    tracing::error!(
                        error = %other,
                        bucket = %self.bucket,
                        key = %key,
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "S3 get failed"
                    );
                    StorageError::Unavailable(other.to_string())
                }
            })?;

            result
                .bytes()
                .await
                .map_err(|e| StorageError::Unavailable(e.to_string()))
        })
        .await?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = bytes.len() as u64,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 get successful"
        );

        Ok(bytes)
    }

    async fn delete(&self, location: &StorageLocation) -> StorageResult<()> {
        let key = location.key.as_str();
        let path = Path::from(key.to_string());
        let start = std::time::Instant::now();

        bounded("delete", self.op_timeout, async {
            let result: ObjectResult<_> = self.store.delete(&path).await;
            result.map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                Self::classify(key, e)
            })
        })
        .await?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    async fn exists(&self, location: &StorageLocation) -> StorageResult<bool> {
        let key = location.key.as_str();
        let path = Path::from(key.to_string());

        bounded("head", self.op_timeout, async {
            match self.store.head(&path).await {
                Ok(_) => Ok(true),
                Err(ObjectStoreError::NotFound { .. }) => Ok(false),
                Err(e) => Err(StorageError::Unavailable(e.to_string())),
            }
        })
        .await
    }

    async fn stat(&self, location: &StorageLocation) -> StorageResult<u64> {
        let key = location.key.as_str();
        let path = Path::from(key.to_string());

        bounded("head", self.op_timeout, async {
            match self.store.head(&path).await {
                Ok(meta) => Ok(meta.size),
                Err(ObjectStoreError::NotFound { .. }) => {
                    Err(StorageError::NotFound(key.to_string()))
                }
                Err(e) => Err(StorageError::Unavailable(e.to_string())),
            }
        })
        .await
    }

    fn backend_kind(&self) -> BackendKind {
        self.kind
    }
}
