//! Document lifecycle coordination.
//!
//! The coordinator owns all document state transitions. An upload is one
//! logical unit: persist bytes, verify the checksum, append the version
//! record, and upsert the document row — readers never observe a partial
//! result. The potentially slow storage put runs before the per-document
//! lock is taken; only the version-append and status-update unit is
//! serialized. Scan waits are never held under the lock: results come back
//! through `ScanSink` and re-acquire it briefly.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::io::AsyncRead;
use uuid::Uuid;

use docvault_core::models::{
    Document, DocumentCreate, DocumentStatus, LifecycleEvent, ScanRecord, ScanVerdict,
    StorageLocation, VersionRecord,
};
use docvault_core::{
    validation, DigestingReader, EngineConfig, EngineError, EngineResult, IntegrityError,
    StreamDigest,
};
use docvault_events::OutboxEntry;
use docvault_scan::{ScanOrchestrator, ScanRequest, ScanSink};
use docvault_storage::{document_key, Storage, StorageError};

use crate::ledger::VersionLedger;
use crate::locks::LockTable;
use crate::store::{DocumentFilter, DocumentPage, MetadataStore, PageRequest, UploadReceipt};

/// Caller access level, forwarded by the transport layer from validated
/// credentials. Admin scopes may read quarantined content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    Standard,
    Admin,
}

/// One upload submission.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub tenant_id: Uuid,
    pub owner_id: String,
    /// Existing document to append a version to. When absent, a new
    /// document id is derived from the idempotency key so concurrent
    /// retries converge on the same document.
    pub document_id: Option<Uuid>,
    pub metadata: DocumentCreate,
    /// Hex SHA-256 the caller computed over the content, if any.
    pub expected_checksum: Option<String>,
    /// Caller-supplied idempotency key; doubles as the upload-session
    /// segment of the object key, so a retried put overwrites in place.
    pub idempotency_key: String,
    pub version_description: Option<String>,
}

pub struct DocumentCoordinator {
    store: Arc<dyn MetadataStore>,
    storage: Arc<dyn Storage>,
    scans: Arc<ScanOrchestrator>,
    ledger: VersionLedger,
    locks: LockTable,
    config: EngineConfig,
}

impl DocumentCoordinator {
    pub fn new(
        store: Arc<dyn MetadataStore>,
        storage: Arc<dyn Storage>,
        scans: Arc<ScanOrchestrator>,
        config: EngineConfig,
    ) -> Arc<Self> {
        let coordinator = Arc::new(Self {
            ledger: VersionLedger::new(store.clone()),
            store,
            storage,
            scans: scans.clone(),
            locks: LockTable::new(),
            config,
        });
        scans.attach_sink(Arc::downgrade(&coordinator) as Weak<dyn ScanSink>);
        coordinator
    }

    /// The scan orchestrator, for callers needing `await_result` semantics.
    pub fn scans(&self) -> &Arc<ScanOrchestrator> {
        &self.scans
    }

    /// Accept an upload: persist the content, verify integrity, append a
    /// version, and submit the scan. Returns with the document in
    /// `processing`; scanning completes out of band.
    #[tracing::instrument(skip(self, request, content), fields(tenant_id = %request.tenant_id))]
    pub async fn upload<R>(&self, mut request: UploadRequest, content: R) -> EngineResult<UploadReceipt>
    where
        R: AsyncRead + Send + Unpin,
    {
        validation::validate_create(&mut request.metadata, &self.config.allowed_extensions)
            .map_err(|e| EngineError::Validation(e.to_string()))?;
        request.idempotency_key = request.idempotency_key.trim().to_string();
        if request.idempotency_key.is_empty() {
            return Err(EngineError::Validation(
                "Idempotency key cannot be empty".to_string(),
            ));
        }
        let expected_checksum = request
            .expected_checksum
            .as_deref()
            .map(normalize_checksum)
            .transpose()?;

        let tenant_id = request.tenant_id;
        let document_id = request
            .document_id
            .unwrap_or_else(|| Uuid::new_v5(&tenant_id, request.idempotency_key.as_bytes()));

        // Single pass over the caller's stream: buffer, hash, count.
        let (data, digest) = DigestingReader::new(content, self.config.max_file_size_bytes)
            .drain()
            .await
            .map_err(|e| match e {
                IntegrityError::TooLarge {
                    bytes_seen,
                    limit_bytes,
                } => EngineError::FileTooLarge {
                    size_bytes: bytes_seen,
                    limit_bytes,
                },
                IntegrityError::Io(e) => {
                    EngineError::Validation(format!("Failed to read upload content: {}", e))
                }
            })?;

        // Idempotent replay before doing any storage work.
        if let Some(receipt) = self
            .store
            .find_upload_session(tenant_id, document_id, &request.idempotency_key)
            .await
            .map_err(internal)?
        {
            return replay_receipt(receipt, &digest);
        }

        let key = document_key(tenant_id, document_id, &request.idempotency_key)
            .map_err(|e| EngineError::Validation(e.to_string()))?;
        let location = self
            .storage
            .put(&key, &request.metadata.content_type, data)
            .await
            .map_err(map_storage_error)?;
        let mut guard = CleanupGuard::new(self.storage.clone(), location.clone());

        if let Some(expected) = expected_checksum {
            if expected != digest.checksum {
                guard.cleanup_now().await;
                return Err(EngineError::IntegrityMismatch {
                    expected,
                    actual: digest.checksum,
                });
            }
        }

        let doc_lock = self.locks.lock(tenant_id, document_id).await;

        // A concurrent retry with the same key may have committed while we
        // were writing; its version owns this object key now.
        if let Some(receipt) = self
            .store
            .find_upload_session(tenant_id, document_id, &request.idempotency_key)
            .await
            .map_err(internal)?
        {
            guard.disarm();
            return replay_receipt(receipt, &digest);
        }

        let existing = self
            .store
            .get_document(tenant_id, document_id)
            .await
            .map_err(internal)?;
        if let Some(ref doc) = existing {
            match doc.status {
                DocumentStatus::Deleted => {
                    guard.cleanup_now().await;
                    return Err(not_found(document_id));
                }
                DocumentStatus::Archived => {
                    guard.cleanup_now().await;
                    return Err(EngineError::Validation(format!(
                        "Document {} is archived and cannot accept new versions",
                        document_id
                    )));
                }
                _ => {}
            }
        }

        let version = self
            .ledger
            .next_version(tenant_id, document_id)
            .await
            .map_err(internal)?;
        let now = Utc::now();
        let document = build_document(existing, &request, document_id, version, &digest, now);
        let version_record = VersionRecord {
            document_id,
            version,
            location: location.clone(),
            size_bytes: digest.size_bytes as i64,
            checksum: digest.checksum.clone(),
            created_by: request.owner_id.clone(),
            description: request.version_description.clone(),
            created_at: now,
        };
        let receipt = UploadReceipt {
            document_id,
            version,
            status: DocumentStatus::Processing,
            checksum: digest.checksum.clone(),
        };
        let outbox = OutboxEntry::new(LifecycleEvent::uploaded(&document));

        if let Err(e) = self
            .ledger
            .append(
                document,
                version_record,
                request.idempotency_key.clone(),
                receipt.clone(),
                outbox,
            )
            .await
        {
            guard.cleanup_now().await;
            return Err(EngineError::Internal(format!(
                "Failed to commit upload: {}",
                e
            )));
        }
        guard.disarm();
        drop(doc_lock);

        self.scans.submit(ScanRequest {
            tenant_id,
            document_id,
            version,
            location,
        });

        tracing::info!(
            document_id = %document_id,
            version,
            size_bytes = digest.size_bytes,
            "Document uploaded"
        );

        Ok(receipt)
    }

    /// Fetch a document, optionally with its current content.
    ///
    /// A tenant mismatch is indistinguishable from a missing document.
    /// Quarantined content is readable only with admin access.
    #[tracing::instrument(skip(self))]
    pub async fn get(
        &self,
        tenant_id: Uuid,
        document_id: Uuid,
        include_content: bool,
        access: AccessLevel,
    ) -> EngineResult<(Document, Option<Bytes>)> {
        let doc = self.fetch_live(tenant_id, document_id).await?;
        if !include_content {
            return Ok((doc, None));
        }

        if doc.status == DocumentStatus::Quarantined && access != AccessLevel::Admin {
            return Err(EngineError::Quarantined(format!(
                "Document {} is quarantined",
                document_id
            )));
        }

        let latest = self
            .store
            .latest_version(tenant_id, document_id)
            .await
            .map_err(internal)?
            .ok_or_else(|| {
                EngineError::Internal(format!(
                    "Document {} has no version records",
                    document_id
                ))
            })?;

        let content = self.storage.get(&latest.location).await.map_err(|e| {
            if let StorageError::NotFound(ref key) = e {
                tracing::error!(
                    document_id = %document_id,
                    key = %key,
                    "Stored object missing: metadata and storage have diverged"
                );
            }
            map_storage_error(e)
        })?;

        Ok((doc, Some(content)))
    }

    /// Soft delete: archive the document. Idempotent — re-deleting an
    /// archived document succeeds without effect or event.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, tenant_id: Uuid, document_id: Uuid) -> EngineResult<()> {
        let _doc_lock = self.locks.lock(tenant_id, document_id).await;

        let mut doc = self.fetch_live(tenant_id, document_id).await?;
        if doc.status == DocumentStatus::Archived {
            return Ok(());
        }

        doc.status = DocumentStatus::Archived;
        doc.updated_at = Utc::now();
        let outbox = OutboxEntry::new(LifecycleEvent::deleted(&doc));
        self.store
            .commit_status(doc, None, Some(outbox))
            .await
            .map_err(internal)?;

        tracing::info!(document_id = %document_id, "Document archived");
        Ok(())
    }

    /// Trigger a rescan of the current version. Does not block on the
    /// result; callers can race `scans().await_result` against a timeout.
    #[tracing::instrument(skip(self))]
    pub async fn trigger_scan(&self, tenant_id: Uuid, document_id: Uuid) -> EngineResult<Uuid> {
        let _doc = self.fetch_live(tenant_id, document_id).await?;
        let latest = self
            .store
            .latest_version(tenant_id, document_id)
            .await
            .map_err(internal)?
            .ok_or_else(|| {
                EngineError::Internal(format!(
                    "Document {} has no version records",
                    document_id
                ))
            })?;

        Ok(self.scans.submit(ScanRequest {
            tenant_id,
            document_id,
            version: latest.version,
            location: latest.location,
        }))
    }

    /// List documents matching the filter, offset/limit paginated.
    pub async fn list(
        &self,
        tenant_id: Uuid,
        filter: DocumentFilter,
        page: PageRequest,
    ) -> EngineResult<DocumentPage> {
        if page.limit == 0 || page.limit > 1000 {
            return Err(EngineError::Validation(
                "Page limit must be between 1 and 1000".to_string(),
            ));
        }
        let filter = DocumentFilter {
            tags: validation::normalize_tags(&filter.tags),
            ..filter
        };
        self.store
            .list_documents(tenant_id, &filter, &page)
            .await
            .map_err(internal)
    }

    /// Ordered version history, oldest to newest.
    pub async fn list_versions(
        &self,
        tenant_id: Uuid,
        document_id: Uuid,
    ) -> EngineResult<Vec<VersionRecord>> {
        let _doc = self.fetch_live(tenant_id, document_id).await?;
        self.ledger
            .list_versions(tenant_id, document_id)
            .await
            .map_err(internal)
    }

    /// Retention sweep: archived documents older than the retention window
    /// move to terminal `deleted`. Version records are retained for audit;
    /// content objects are removed best-effort.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> EngineResult<usize> {
        let cutoff = now - ChronoDuration::days(self.config.retention_days);
        let expired = self.store.archived_before(cutoff).await.map_err(internal)?;

        let mut purged = 0;
        for doc in expired {
            let _doc_lock = self.locks.lock(doc.tenant_id, doc.id).await;
            let Some(mut current) = self
                .store
                .get_document(doc.tenant_id, doc.id)
                .await
                .map_err(internal)?
            else {
                continue;
            };
            if current.status != DocumentStatus::Archived || current.updated_at >= cutoff {
                continue;
            }

            for version in self
                .store
                .list_versions(doc.tenant_id, doc.id)
                .await
                .map_err(internal)?
            {
                if let Err(e) = self.storage.delete(&version.location).await {
                    tracing::warn!(
                        error = %e,
                        document_id = %doc.id,
                        version = version.version,
                        "Failed to delete content during retention purge"
                    );
                }
            }

            current.status = DocumentStatus::Deleted;
            current.updated_at = now;
            self.store
                .commit_status(current, None, None)
                .await
                .map_err(internal)?;
            purged += 1;
            tracing::info!(document_id = %doc.id, "Archived document purged");
        }

        Ok(purged)
    }

    async fn fetch_live(&self, tenant_id: Uuid, document_id: Uuid) -> EngineResult<Document> {
        match self
            .store
            .get_document(tenant_id, document_id)
            .await
            .map_err(internal)?
        {
            Some(doc) if doc.status != DocumentStatus::Deleted => Ok(doc),
            _ => Err(not_found(document_id)),
        }
    }

    async fn apply_scan(&self, record: ScanRecord) -> EngineResult<()> {
        let _doc_lock = self.locks.lock(record.tenant_id, record.document_id).await;

        let Some(mut doc) = self
            .store
            .get_document(record.tenant_id, record.document_id)
            .await
            .map_err(internal)?
        else {
            tracing::warn!(
                scan_id = %record.scan_id,
                document_id = %record.document_id,
                "Scan finalized for unknown document, discarding"
            );
            return Ok(());
        };

        // Only a scan of the current version governs status; results for
        // superseded versions are recorded but do not transition.
        let stale = record.version != doc.current_version;
        if !stale && !doc.status.is_terminal() {
            match record.verdict {
                Some(ScanVerdict::Clean)
                    if matches!(
                        doc.status,
                        DocumentStatus::Processing | DocumentStatus::Quarantined
                    ) =>
                {
                    doc.status = DocumentStatus::Active;
                    doc.scan_failed = false;
                }
                Some(ScanVerdict::Clean) => {
                    doc.scan_failed = false;
                }
                Some(ScanVerdict::Infected) | Some(ScanVerdict::Suspicious)
                    if matches!(
                        doc.status,
                        DocumentStatus::Processing
                            | DocumentStatus::Active
                            | DocumentStatus::Quarantined
                    ) =>
                {
                    doc.status = DocumentStatus::Quarantined;
                }
                Some(ScanVerdict::Error) | None => {
                    // Fail-closed: the document keeps its status and the
                    // flag surfaces to operators; it is never auto-promoted.
                    doc.scan_failed = true;
                }
                _ => {}
            }
            doc.updated_at = Utc::now();
        }

        tracing::info!(
            scan_id = %record.scan_id,
            document_id = %record.document_id,
            verdict = ?record.verdict,
            stale,
            document_status = %doc.status,
            "Scan result applied"
        );

        let outbox = OutboxEntry::new(LifecycleEvent::scanned(&doc, &record));
        self.store
            .commit_status(doc, Some(record), Some(outbox))
            .await
            .map_err(internal)
    }
}

#[async_trait]
impl ScanSink for DocumentCoordinator {
    async fn scan_finalized(&self, record: ScanRecord) {
        let scan_id = record.scan_id;
        if let Err(e) = self.apply_scan(record).await {
            tracing::error!(scan_id = %scan_id, error = %e, "Failed to apply scan result");
        }
    }
}

fn build_document(
    existing: Option<Document>,
    request: &UploadRequest,
    document_id: Uuid,
    version: i32,
    digest: &StreamDigest,
    now: DateTime<Utc>,
) -> Document {
    match existing {
        Some(mut doc) => {
            doc.filename = request.metadata.filename.clone();
            doc.content_type = request.metadata.content_type.clone();
            doc.size_bytes = digest.size_bytes as i64;
            doc.title = request.metadata.title.clone();
            doc.description = request.metadata.description.clone();
            doc.tags = request.metadata.tags.clone();
            doc.attributes = request.metadata.attributes.clone();
            doc.status = DocumentStatus::Processing;
            doc.current_version = version;
            doc.checksum = digest.checksum.clone();
            doc.scan_failed = false;
            doc.updated_at = now;
            doc
        }
        None => Document {
            id: document_id,
            tenant_id: request.tenant_id,
            owner_id: request.owner_id.clone(),
            filename: request.metadata.filename.clone(),
            content_type: request.metadata.content_type.clone(),
            size_bytes: digest.size_bytes as i64,
            title: request.metadata.title.clone(),
            description: request.metadata.description.clone(),
            tags: request.metadata.tags.clone(),
            attributes: request.metadata.attributes.clone(),
            status: DocumentStatus::Processing,
            current_version: version,
            checksum: digest.checksum.clone(),
            scan_failed: false,
            created_at: now,
            updated_at: now,
        },
    }
}

/// A recorded receipt satisfies a replayed upload only when the content is
/// byte-identical; a reused key with different content is a caller bug.
fn replay_receipt(receipt: UploadReceipt, digest: &StreamDigest) -> EngineResult<UploadReceipt> {
    if receipt.checksum != digest.checksum {
        return Err(EngineError::Validation(
            "Idempotency key was already used with different content".to_string(),
        ));
    }
    Ok(receipt)
}

fn normalize_checksum(raw: &str) -> EngineResult<String> {
    let checksum = raw.trim().to_lowercase();
    if checksum.len() != 64 || !checksum.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(EngineError::Validation(
            "Expected checksum must be a 64-character hex SHA-256 digest".to_string(),
        ));
    }
    Ok(checksum)
}

fn not_found(document_id: Uuid) -> EngineError {
    EngineError::NotFound(format!("Document not found: {}", document_id))
}

fn internal(e: anyhow::Error) -> EngineError {
    EngineError::Internal(e.to_string())
}

fn map_storage_error(e: StorageError) -> EngineError {
    match e {
        StorageError::Unavailable(msg) => EngineError::Unavailable(msg),
        StorageError::QuotaExceeded(msg) => EngineError::QuotaExceeded(msg),
        StorageError::NotFound(key) => {
            EngineError::Internal(format!("Stored object missing: {}", key))
        }
        StorageError::InvalidKey(msg) => EngineError::Validation(msg),
        StorageError::ConfigError(msg) => EngineError::Internal(msg),
        StorageError::Io(e) => EngineError::Internal(format!("Storage IO error: {}", e)),
    }
}

/// Deletes a written object unless disarmed, compensating for failures and
/// caller cancellation between the storage put and the metadata commit.
struct CleanupGuard {
    storage: Arc<dyn Storage>,
    location: Option<StorageLocation>,
}

impl CleanupGuard {
    fn new(storage: Arc<dyn Storage>, location: StorageLocation) -> Self {
        Self {
            storage,
            location: Some(location),
        }
    }

    fn disarm(&mut self) {
        self.location = None;
    }

    /// Delete the object before returning an error to the caller.
    async fn cleanup_now(&mut self) {
        if let Some(location) = self.location.take() {
            if let Err(e) = self.storage.delete(&location).await {
                tracing::error!(
                    error = %e,
                    key = %location.key,
                    "Failed to delete orphaned object"
                );
            }
        }
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        // Reached only when the upload future is dropped mid-flight
        // (caller disconnect); the error paths clean up explicitly.
        if let Some(location) = self.location.take() {
            let storage = self.storage.clone();
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(async move {
                        if let Err(e) = storage.delete(&location).await {
                            tracing::error!(
                                error = %e,
                                key = %location.key,
                                "Failed to delete orphaned object after cancelled upload"
                            );
                        }
                    });
                }
                Err(_) => {
                    tracing::error!(
                        key = %location.key,
                        "Runtime gone, orphaned object left behind"
                    );
                }
            }
        }
    }
}
