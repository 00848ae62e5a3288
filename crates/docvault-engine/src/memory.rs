//! In-memory reference implementation of the metadata store.
//!
//! All maps live behind one mutex, so every `commit_*` call is a true
//! atomic unit: readers never observe a document row without its version
//! record or outbox entry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use docvault_core::models::{Document, DocumentStatus, ScanRecord, ScanStatus, VersionRecord};
use docvault_events::{OutboxEntry, OutboxStore};

use crate::store::{
    DocumentFilter, DocumentPage, MetadataStore, PageRequest, SortBy, SortOrder, UploadReceipt,
};

#[derive(Default)]
struct Inner {
    documents: HashMap<(Uuid, Uuid), Document>,
    versions: HashMap<(Uuid, Uuid), Vec<VersionRecord>>,
    scans: HashMap<(Uuid, Uuid), Vec<ScanRecord>>,
    sessions: HashMap<(Uuid, Uuid, String), UploadReceipt>,
    outbox: Vec<OutboxEntry>,
}

#[derive(Clone, Default)]
pub struct MemoryMetadataStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("metadata store poisoned")
    }

    /// Pending outbox entries (including parked); test and operator surface.
    pub fn outbox_entries(&self) -> Vec<OutboxEntry> {
        self.lock().outbox.clone()
    }
}

fn matches_filter(doc: &Document, filter: &DocumentFilter) -> bool {
    if let Some(ref owner) = filter.owner_id {
        if &doc.owner_id != owner {
            return false;
        }
    }
    if !filter.tags.iter().all(|tag| doc.tags.contains(tag)) {
        return false;
    }
    if let Some(status) = filter.status {
        if doc.status != status {
            return false;
        }
    }
    if let Some(after) = filter.created_after {
        if doc.created_at < after {
            return false;
        }
    }
    if let Some(before) = filter.created_before {
        if doc.created_at > before {
            return false;
        }
    }
    true
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn get_document(&self, tenant_id: Uuid, document_id: Uuid) -> Result<Option<Document>> {
        Ok(self.lock().documents.get(&(tenant_id, document_id)).cloned())
    }

    async fn commit_upload(
        &self,
        document: Document,
        version: VersionRecord,
        session_key: String,
        receipt: UploadReceipt,
        outbox: OutboxEntry,
    ) -> Result<()> {
        let mut inner = self.lock();
        let doc_key = (document.tenant_id, document.id);

        let versions = inner.versions.entry(doc_key).or_default();
        let expected = versions.last().map(|v| v.version).unwrap_or(0) + 1;
        if version.version != expected {
            anyhow::bail!(
                "Version append out of order for document {}: got {}, expected {}",
                document.id,
                version.version,
                expected
            );
        }

        versions.push(version);
        inner
            .sessions
            .insert((document.tenant_id, document.id, session_key), receipt);
        inner.outbox.push(outbox);
        inner.documents.insert(doc_key, document);
        Ok(())
    }

    async fn commit_status(
        &self,
        document: Document,
        scan: Option<ScanRecord>,
        outbox: Option<OutboxEntry>,
    ) -> Result<()> {
        let mut inner = self.lock();
        let doc_key = (document.tenant_id, document.id);

        if let Some(record) = scan {
            inner.scans.entry(doc_key).or_default().push(record);
        }
        if let Some(entry) = outbox {
            inner.outbox.push(entry);
        }
        inner.documents.insert(doc_key, document);
        Ok(())
    }

    async fn find_upload_session(
        &self,
        tenant_id: Uuid,
        document_id: Uuid,
        session_key: &str,
    ) -> Result<Option<UploadReceipt>> {
        Ok(self
            .lock()
            .sessions
            .get(&(tenant_id, document_id, session_key.to_string()))
            .cloned())
    }

    async fn list_versions(
        &self,
        tenant_id: Uuid,
        document_id: Uuid,
    ) -> Result<Vec<VersionRecord>> {
        Ok(self
            .lock()
            .versions
            .get(&(tenant_id, document_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn latest_version(
        &self,
        tenant_id: Uuid,
        document_id: Uuid,
    ) -> Result<Option<VersionRecord>> {
        Ok(self
            .lock()
            .versions
            .get(&(tenant_id, document_id))
            .and_then(|versions| versions.last().cloned()))
    }

    async fn latest_completed_scan(
        &self,
        tenant_id: Uuid,
        document_id: Uuid,
    ) -> Result<Option<ScanRecord>> {
        Ok(self
            .lock()
            .scans
            .get(&(tenant_id, document_id))
            .and_then(|scans| {
                scans
                    .iter()
                    .rev()
                    .find(|s| s.status == ScanStatus::Completed)
                    .cloned()
            }))
    }

    async fn list_documents(
        &self,
        tenant_id: Uuid,
        filter: &DocumentFilter,
        page: &PageRequest,
    ) -> Result<DocumentPage> {
        let inner = self.lock();
        let mut matched: Vec<Document> = inner
            .documents
            .values()
            .filter(|doc| doc.tenant_id == tenant_id)
            .filter(|doc| doc.status != DocumentStatus::Deleted)
            .filter(|doc| matches_filter(doc, filter))
            .cloned()
            .collect();

        match (page.sort_by, page.sort_order) {
            (SortBy::CreatedAt, SortOrder::Asc) => matched.sort_by_key(|d| d.created_at),
            (SortBy::CreatedAt, SortOrder::Desc) => {
                matched.sort_by_key(|d| std::cmp::Reverse(d.created_at))
            }
            (SortBy::UpdatedAt, SortOrder::Asc) => matched.sort_by_key(|d| d.updated_at),
            (SortBy::UpdatedAt, SortOrder::Desc) => {
                matched.sort_by_key(|d| std::cmp::Reverse(d.updated_at))
            }
            (SortBy::Filename, SortOrder::Asc) => {
                matched.sort_by(|a, b| a.filename.cmp(&b.filename))
            }
            (SortBy::Filename, SortOrder::Desc) => {
                matched.sort_by(|a, b| b.filename.cmp(&a.filename))
            }
        }

        let total_count = matched.len();
        let documents: Vec<Document> = matched
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .collect();
        let has_more = page.offset + documents.len() < total_count;

        Ok(DocumentPage {
            documents,
            total_count,
            has_more,
        })
    }

    async fn archived_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Document>> {
        Ok(self
            .lock()
            .documents
            .values()
            .filter(|doc| doc.status == DocumentStatus::Archived && doc.updated_at < cutoff)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OutboxStore for MemoryMetadataStore {
    async fn due_entries(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<OutboxEntry>> {
        let inner = self.lock();
        let mut due: Vec<OutboxEntry> = inner
            .outbox
            .iter()
            .filter(|e| !e.parked && e.next_attempt_at <= now)
            .cloned()
            .collect();
        due.sort_by_key(|e| e.event.occurred_at);
        due.truncate(limit);
        Ok(due)
    }

    async fn mark_published(&self, event_id: Uuid) -> Result<()> {
        self.lock().outbox.retain(|e| e.event.event_id != event_id);
        Ok(())
    }

    async fn reschedule(
        &self,
        event_id: Uuid,
        attempts: u32,
        next_attempt_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut inner = self.lock();
        if let Some(entry) = inner
            .outbox
            .iter_mut()
            .find(|e| e.event.event_id == event_id)
        {
            entry.attempts = attempts;
            entry.next_attempt_at = next_attempt_at;
        }
        Ok(())
    }

    async fn park(&self, event_id: Uuid) -> Result<()> {
        let mut inner = self.lock();
        if let Some(entry) = inner
            .outbox
            .iter_mut()
            .find(|e| e.event.event_id == event_id)
        {
            entry.parked = true;
        }
        Ok(())
    }
}
