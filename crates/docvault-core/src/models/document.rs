use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Document lifecycle status.
///
/// `pending` and `processing` are upload-pipeline states; `active` and
/// `quarantined` are the readable end states of a scan; `archived` is the
/// soft-deleted state retained for the retention window; `deleted` and
/// `failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Active,
    Quarantined,
    Archived,
    Deleted,
    Failed,
}

impl DocumentStatus {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DocumentStatus::Deleted | DocumentStatus::Failed)
    }
}

impl FromStr for DocumentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(DocumentStatus::Pending),
            "processing" => Ok(DocumentStatus::Processing),
            "active" => Ok(DocumentStatus::Active),
            "quarantined" => Ok(DocumentStatus::Quarantined),
            "archived" => Ok(DocumentStatus::Archived),
            "deleted" => Ok(DocumentStatus::Deleted),
            "failed" => Ok(DocumentStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid document status: {}", s)),
        }
    }
}

impl Display for DocumentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let s = match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Active => "active",
            DocumentStatus::Quarantined => "quarantined",
            DocumentStatus::Archived => "archived",
            DocumentStatus::Deleted => "deleted",
            DocumentStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// A document record: the current head of a version history.
///
/// `current_version` always equals the version number of the most recent
/// entry in the document's version ledger, and `checksum` always matches
/// the stored bytes at that version's location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub owner_id: String,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub attributes: HashMap<String, String>,
    pub status: DocumentStatus,
    pub current_version: i32,
    pub checksum: String,
    /// Set when the scan subsystem exhausted its retries for the latest
    /// version. The document stays in its current status and is never
    /// auto-promoted to active while this is set.
    pub scan_failed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied metadata for an upload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentCreate {
    pub filename: String,
    pub content_type: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}
