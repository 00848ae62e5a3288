use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::storage::StorageLocation;

/// One immutable entry in a document's version history.
///
/// Created atomically with a successful upload; never updated or physically
/// deleted afterwards. Versions are sequential starting at 1 with no gaps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionRecord {
    pub document_id: Uuid,
    pub version: i32,
    pub location: StorageLocation,
    pub size_bytes: i64,
    pub checksum: String,
    pub created_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}
