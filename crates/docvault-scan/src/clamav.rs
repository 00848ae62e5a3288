//! ClamAV scan engine over the daemon's TCP INSTREAM protocol.

use std::str;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use clamav_client::{clean, Tcp};

use crate::engine::{ScanEngine, ScanOutcome};
use docvault_core::models::{ThreatDetail, ThreatSeverity};

/// Detections under this prefix are heuristic matches, not signature hits.
const HEURISTIC_PREFIX: &str = "Heuristics.";

#[derive(Clone)]
pub struct ClamAvEngine {
    host: String,
    port: u16,
    /// Timeout in seconds for each scan operation (default: 30)
    timeout_secs: u64,
}

impl ClamAvEngine {
    /// Create a new ClamAvEngine.
    ///
    /// # Arguments
    /// * `host` - ClamAV daemon hostname
    /// * `port` - ClamAV daemon port (typically 3310)
    pub fn new(host: String, port: u16) -> Self {
        Self::with_timeout(host, port, 30)
    }

    /// Create with a custom scan timeout (for large files or slow daemons).
    pub fn with_timeout(host: String, port: u16, timeout_secs: u64) -> Self {
        Self {
            host,
            port,
            timeout_secs,
        }
    }

    /// Parse the threat name out of a `... : <name> FOUND` daemon response.
    fn parse_threat(response_bytes: &[u8]) -> ThreatDetail {
        let response_str = match str::from_utf8(response_bytes) {
            Ok(s) => s.trim(),
            Err(_) => "unknown",
        };
        let name = if response_str.contains("FOUND") {
            response_str
                .split(':')
                .nth(1)
                .unwrap_or("unknown")
                .trim()
                .trim_end_matches(" FOUND")
                .trim_end_matches("FOUND")
                .trim()
                .to_string()
        } else {
            "unknown".to_string()
        };

        let (kind, severity) = if name.starts_with(HEURISTIC_PREFIX) {
            ("heuristic".to_string(), ThreatSeverity::Medium)
        } else {
            ("virus".to_string(), ThreatSeverity::High)
        };

        ThreatDetail {
            description: Some(format!("Threat detected: {}", name)),
            name,
            kind,
            severity,
        }
    }
}

#[async_trait]
impl ScanEngine for ClamAvEngine {
    /// Scan in-memory data using the sync API inside spawn_blocking to avoid
    /// !Send tokio futures.
    async fn scan(&self, data: Bytes) -> ScanOutcome {
        let start = Instant::now();
        tracing::debug!(host = %self.host, port = %self.port, "Starting ClamAV scan");
        let host = self.host.clone();
        let port = self.port;
        let timeout_secs = self.timeout_secs;

        let result = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            tokio::task::spawn_blocking(move || {
                let address = format!("{}:{}", host, port);
                let connection = Tcp {
                    host_address: address.as_str(),
                };
                match clamav_client::scan_buffer(data.as_ref(), connection, None) {
                    Ok(response_bytes) => match clean(&response_bytes) {
                        Ok(true) => {
                            tracing::info!(
                                duration_ms = start.elapsed().as_millis(),
                                "File scan completed: clean"
                            );
                            ScanOutcome::Clean
                        }
                        Ok(false) => {
                            let threat = Self::parse_threat(&response_bytes);
                            tracing::warn!(
                                duration_ms = start.elapsed().as_millis(),
                                threat = %threat.name,
                                "File scan detected threat"
                            );
                            if threat.kind == "heuristic" {
                                ScanOutcome::Suspicious(vec![threat])
                            } else {
                                ScanOutcome::Infected(vec![threat])
                            }
                        }
                        Err(e) => {
                            let error_msg = format!("Failed to parse ClamAV response: {}", e);
                            tracing::error!(error = %error_msg, "Failed to parse ClamAV response");
                            ScanOutcome::Error(error_msg)
                        }
                    },
                    Err(e) => {
                        let error_msg = format!("ClamAV scan error: {}", e);
                        tracing::error!(error = %error_msg, "ClamAV scan failed");
                        ScanOutcome::Error(error_msg)
                    }
                }
            }),
        )
        .await;

        match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                let error_msg = format!("ClamAV scan task join error: {}", e);
                tracing::error!(error = %error_msg, "ClamAV scan panicked");
                ScanOutcome::Error(error_msg)
            }
            Err(_) => {
                let error_msg = format!("ClamAV scan timeout (exceeded {} seconds)", timeout_secs);
                tracing::error!(error = %error_msg, "ClamAV scan timeout");
                ScanOutcome::Error(error_msg)
            }
        }
    }

    fn version(&self) -> String {
        "clamav".to_string()
    }
}
