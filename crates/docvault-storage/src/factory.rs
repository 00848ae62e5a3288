use std::sync::Arc;
use std::time::Duration;

use crate::{LocalStorage, S3Storage, Storage, StorageError, StorageResult};
use docvault_core::models::BackendKind;
use docvault_core::EngineConfig;

/// Create a storage backend based on configuration.
///
/// The backend kind is the single dispatch point; business logic only ever
/// sees `Arc<dyn Storage>`.
pub async fn create_storage(config: &EngineConfig) -> StorageResult<Arc<dyn Storage>> {
    let op_timeout = Duration::from_secs(config.storage_op_timeout_secs);

    match config.storage_backend {
        kind @ (BackendKind::S3 | BackendKind::Minio) => {
            let bucket = config
                .s3_bucket
                .clone()
                .ok_or_else(|| StorageError::ConfigError("S3_BUCKET not configured".to_string()))?;
            let region = config.s3_region.clone().ok_or_else(|| {
                StorageError::ConfigError("S3_REGION or AWS_REGION not configured".to_string())
            })?;
            let endpoint = config.s3_endpoint.clone();
            if kind == BackendKind::Minio && endpoint.is_none() {
                return Err(StorageError::ConfigError(
                    "S3_ENDPOINT_URL required for the minio backend".to_string(),
                ));
            }

            let storage = S3Storage::new(kind, bucket, region, endpoint, op_timeout).await?;
            Ok(Arc::new(storage))
        }

        BackendKind::Local => {
            let base_path = config.local_storage_path.clone().ok_or_else(|| {
                StorageError::ConfigError("LOCAL_STORAGE_PATH not configured".to_string())
            })?;

            let storage = LocalStorage::new(base_path, op_timeout).await?;
            Ok(Arc::new(storage))
        }

        BackendKind::Gcs => Err(StorageError::ConfigError(
            "GCS storage backend not yet implemented".to_string(),
        )),

        BackendKind::Azure => Err(StorageError::ConfigError(
            "Azure storage backend not yet implemented".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_backend_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig {
            local_storage_path: Some(dir.path().display().to_string()),
            ..Default::default()
        };
        let storage = create_storage(&config).await.unwrap();
        assert_eq!(storage.backend_kind(), BackendKind::Local);
    }

    #[tokio::test]
    async fn unimplemented_backends_rejected() {
        let config = EngineConfig {
            storage_backend: BackendKind::Gcs,
            ..Default::default()
        };
        assert!(matches!(
            create_storage(&config).await,
            Err(StorageError::ConfigError(_))
        ));
    }
}
