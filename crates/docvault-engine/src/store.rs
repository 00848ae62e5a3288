//! Metadata store seam.
//!
//! The coordinator requires a store with transactional read-modify-write on
//! a document row plus appends to the version, scan, and outbox tables,
//! keyed by `(tenant_id, document_id)`. Any relational or document store
//! providing this transaction boundary suffices; `MemoryMetadataStore` is
//! the in-process reference implementation.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use docvault_core::models::{Document, DocumentStatus, ScanRecord, VersionRecord};
use docvault_events::OutboxEntry;

/// Outcome of a committed upload, recorded against the upload session so a
/// retried request with the same idempotency key returns the same result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub document_id: Uuid,
    pub version: i32,
    pub status: DocumentStatus,
    pub checksum: String,
}

/// Filters for document listing. All present filters must match (AND).
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    pub owner_id: Option<String>,
    /// Every listed tag must be present on the document.
    pub tags: Vec<String>,
    pub status: Option<DocumentStatus>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    CreatedAt,
    UpdatedAt,
    Filename,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Offset/limit pagination with sorting.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
            sort_by: SortBy::CreatedAt,
            sort_order: SortOrder::Desc,
        }
    }
}

/// One page of document summaries.
///
/// `total_count` is computed against the filtered set, not the unfiltered
/// table; `has_more` is derived from it.
#[derive(Debug, Clone)]
pub struct DocumentPage {
    pub documents: Vec<Document>,
    pub total_count: usize,
    pub has_more: bool,
}

/// Transactional metadata store.
///
/// The `commit_*` methods are atomic units: either every write in the call
/// lands or none does, and no partial state is observable to readers.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get_document(&self, tenant_id: Uuid, document_id: Uuid) -> Result<Option<Document>>;

    /// Commit one successful upload: upsert the document row, append the
    /// version record, record the upload-session receipt, and append the
    /// outbox entry — as one unit.
    ///
    /// Fails if `version.version` is not exactly one past the latest
    /// recorded version for the document (gapless append).
    async fn commit_upload(
        &self,
        document: Document,
        version: VersionRecord,
        session_key: String,
        receipt: UploadReceipt,
        outbox: OutboxEntry,
    ) -> Result<()>;

    /// Commit a document update, optionally with a finalized scan record
    /// and an outbox entry, as one unit.
    async fn commit_status(
        &self,
        document: Document,
        scan: Option<ScanRecord>,
        outbox: Option<OutboxEntry>,
    ) -> Result<()>;

    /// Receipt previously recorded for this upload session, if any.
    async fn find_upload_session(
        &self,
        tenant_id: Uuid,
        document_id: Uuid,
        session_key: &str,
    ) -> Result<Option<UploadReceipt>>;

    /// Ordered version history, oldest to newest.
    async fn list_versions(&self, tenant_id: Uuid, document_id: Uuid)
        -> Result<Vec<VersionRecord>>;

    /// The most recent version record, if any.
    async fn latest_version(
        &self,
        tenant_id: Uuid,
        document_id: Uuid,
    ) -> Result<Option<VersionRecord>>;

    /// The most recent scan record that reached `completed`, if any.
    async fn latest_completed_scan(
        &self,
        tenant_id: Uuid,
        document_id: Uuid,
    ) -> Result<Option<ScanRecord>>;

    async fn list_documents(
        &self,
        tenant_id: Uuid,
        filter: &DocumentFilter,
        page: &PageRequest,
    ) -> Result<DocumentPage>;

    /// Archived documents whose archival predates `cutoff` (retention sweep
    /// input). Spans tenants; maintenance only.
    async fn archived_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Document>>;
}
