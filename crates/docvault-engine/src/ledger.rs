//! Version ledger: append-only history of document versions.
//!
//! Every successful upload appends exactly one record; records are never
//! mutated or removed. Appends happen only through the coordinator, under
//! its per-document lock, and are validated to be gapless both here and in
//! the store's atomic commit.

use std::sync::Arc;

use anyhow::Result;
use uuid::Uuid;

use docvault_core::models::{Document, VersionRecord};
use docvault_events::OutboxEntry;

use crate::store::{MetadataStore, UploadReceipt};

pub struct VersionLedger {
    store: Arc<dyn MetadataStore>,
}

impl VersionLedger {
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self { store }
    }

    /// The version number the next append must carry: latest + 1, starting
    /// at 1 for a document with no history.
    pub async fn next_version(&self, tenant_id: Uuid, document_id: Uuid) -> Result<i32> {
        let latest = self.store.latest_version(tenant_id, document_id).await?;
        Ok(latest.map(|v| v.version).unwrap_or(0) + 1)
    }

    /// Append one version record together with its document upsert, session
    /// receipt, and outbox entry, as one atomic unit.
    ///
    /// Must be called under the coordinator's per-document lock; the store
    /// re-validates the gapless rule as a safety net.
    pub async fn append(
        &self,
        document: Document,
        version: VersionRecord,
        session_key: String,
        receipt: UploadReceipt,
        outbox: OutboxEntry,
    ) -> Result<()> {
        if version.version < 1 {
            anyhow::bail!("Version numbers start at 1, got {}", version.version);
        }
        self.store
            .commit_upload(document, version, session_key, receipt, outbox)
            .await
    }

    /// Ordered history, oldest to newest.
    pub async fn list_versions(
        &self,
        tenant_id: Uuid,
        document_id: Uuid,
    ) -> Result<Vec<VersionRecord>> {
        self.store.list_versions(tenant_id, document_id).await
    }
}
