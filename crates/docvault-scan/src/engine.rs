//! Scan engine seam.
//!
//! A `ScanEngine` is the network-addressable scanning service behind the
//! orchestrator. The on-wire protocol to that service is the engine's own
//! concern; the orchestrator only sees outcomes.

use async_trait::async_trait;
use bytes::Bytes;

use docvault_core::models::ThreatDetail;

/// Outcome of a single engine scan attempt.
#[derive(Debug, Clone)]
pub enum ScanOutcome {
    Clean,
    Infected(Vec<ThreatDetail>),
    Suspicious(Vec<ThreatDetail>),
    /// Scanner internal failure. Retried by the orchestrator; never treated
    /// as clean.
    Error(String),
}

#[async_trait]
pub trait ScanEngine: Send + Sync {
    /// Scan in-memory content.
    async fn scan(&self, data: Bytes) -> ScanOutcome;

    /// Identifier of the scanner recorded on scan results.
    fn version(&self) -> String;
}

/// Engine used when scanning is disabled by configuration.
///
/// Always reports clean, so development deployments without a scanner
/// daemon still move documents through the pipeline.
pub struct NoopScanEngine;

#[async_trait]
impl ScanEngine for NoopScanEngine {
    async fn scan(&self, _data: Bytes) -> ScanOutcome {
        tracing::debug!("Threat scanning disabled, returning clean result");
        ScanOutcome::Clean
    }

    fn version(&self) -> String {
        "disabled".to_string()
    }
}
