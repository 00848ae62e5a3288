use std::fmt::{Display, Formatter, Result as FmtResult};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Scan lifecycle status: `pending -> scanning -> completed | failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Pending,
    Scanning,
    Completed,
    Failed,
}

impl Display for ScanStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let s = match self {
            ScanStatus::Pending => "pending",
            ScanStatus::Scanning => "scanning",
            ScanStatus::Completed => "completed",
            ScanStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Verdict of a completed scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanVerdict {
    Clean,
    Infected,
    Suspicious,
    Error,
}

impl Display for ScanVerdict {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let s = match self {
            ScanVerdict::Clean => "clean",
            ScanVerdict::Infected => "infected",
            ScanVerdict::Suspicious => "suspicious",
            ScanVerdict::Error => "error",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// One detected threat within a scan result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatDetail {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: ThreatSeverity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Result of one scan attempt against one document version.
///
/// Finalized exactly once; the latest completed record governs the owning
/// document's quarantine state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    pub scan_id: Uuid,
    pub document_id: Uuid,
    pub tenant_id: Uuid,
    pub version: i32,
    pub status: ScanStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<ScanVerdict>,
    pub threats: Vec<ThreatDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanner_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanned_at: Option<DateTime<Utc>>,
    pub duration_ms: i64,
    /// Engine attempts consumed, including retries after scanner errors.
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScanRecord {
    /// A record that reached `completed` with a verdict that blocks reads.
    pub fn blocks_access(&self) -> bool {
        self.status == ScanStatus::Completed
            && matches!(
                self.verdict,
                Some(ScanVerdict::Infected) | Some(ScanVerdict::Suspicious)
            )
    }
}
