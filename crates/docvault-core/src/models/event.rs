use std::fmt::{Display, Formatter, Result as FmtResult};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::document::Document;
use super::scan::ScanRecord;

/// Lifecycle event kinds published to the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Uploaded,
    Scanned,
    Deleted,
}

impl EventKind {
    /// Routing key on the external bus (`document.<event>`).
    pub fn routing_key(&self) -> &'static str {
        match self {
            EventKind::Uploaded => "document.uploaded",
            EventKind::Scanned => "document.scanned",
            EventKind::Deleted => "document.deleted",
        }
    }
}

impl Display for EventKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.routing_key())
    }
}

/// One lifecycle event.
///
/// Delivery is at-least-once; `event_id` is unique per event so consumers
/// can de-duplicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub event_id: Uuid,
    pub kind: EventKind,
    pub tenant_id: Uuid,
    pub document_id: Uuid,
    pub version: i32,
    pub occurred_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl LifecycleEvent {
    fn new(kind: EventKind, doc: &Document, payload: serde_json::Value) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            kind,
            tenant_id: doc.tenant_id,
            document_id: doc.id,
            version: doc.current_version,
            occurred_at: Utc::now(),
            payload,
        }
    }

    pub fn uploaded(doc: &Document) -> Self {
        Self::new(
            EventKind::Uploaded,
            doc,
            json!({
                "filename": doc.filename,
                "content_type": doc.content_type,
                "size_bytes": doc.size_bytes,
                "checksum": doc.checksum,
                "owner_id": doc.owner_id,
            }),
        )
    }

    pub fn scanned(doc: &Document, scan: &ScanRecord) -> Self {
        Self::new(
            EventKind::Scanned,
            doc,
            json!({
                "scan_id": scan.scan_id,
                "status": scan.status,
                "result": scan.verdict,
                "threats": scan.threats,
                "document_status": doc.status,
            }),
        )
    }

    pub fn deleted(doc: &Document) -> Self {
        Self::new(
            EventKind::Deleted,
            doc,
            json!({
                "filename": doc.filename,
                "owner_id": doc.owner_id,
            }),
        )
    }
}
