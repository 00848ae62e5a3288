//! Scan orchestration: lifecycle of one scan from submission to finalization.
//!
//! `submit` returns immediately; scanning happens out of band. Engine errors
//! are retried with exponential backoff up to a configured attempt budget;
//! exhaustion finalizes the scan as failed. The finalized record is handed
//! to the `ScanSink` (the lifecycle coordinator) exactly once, and callers
//! needing synchronous semantics race `await_result` against a timeout.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;
use uuid::Uuid;

use docvault_core::models::{ScanRecord, ScanStatus, ScanVerdict, StorageLocation};
use docvault_core::{EngineError, EngineResult};
use docvault_storage::Storage;

use crate::engine::{ScanEngine, ScanOutcome};

/// How long finalized scan entries stay addressable by `await_result`.
const FINISHED_RETENTION: Duration = Duration::from_secs(300);

/// Receiver of finalized scan records.
///
/// Held as `Weak` so a dropped coordinator does not keep scan tasks alive;
/// results arriving after teardown are logged and discarded.
#[async_trait]
pub trait ScanSink: Send + Sync {
    async fn scan_finalized(&self, record: ScanRecord);
}

/// One scan submission.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub tenant_id: Uuid,
    pub document_id: Uuid,
    pub version: i32,
    pub location: StorageLocation,
}

#[derive(Clone)]
pub struct ScanOrchestratorConfig {
    /// Engine attempts per scan before finalizing as failed.
    pub max_attempts: u32,
    /// Base delay for exponential backoff between attempts.
    pub backoff_base_ms: u64,
    /// Cap on the backoff delay.
    pub backoff_cap_ms: u64,
}

impl Default for ScanOrchestratorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_ms: 2_000,
            backoff_cap_ms: 300_000,
        }
    }
}

struct ScanEntry {
    tx: watch::Sender<Option<ScanRecord>>,
    finished_at: Option<Instant>,
}

pub struct ScanOrchestrator {
    engine: Arc<dyn ScanEngine>,
    storage: Arc<dyn Storage>,
    config: ScanOrchestratorConfig,
    sink: RwLock<Weak<dyn ScanSink>>,
    scans: Mutex<HashMap<Uuid, ScanEntry>>,
}

impl ScanOrchestrator {
    pub fn new(
        engine: Arc<dyn ScanEngine>,
        storage: Arc<dyn Storage>,
        config: ScanOrchestratorConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            engine,
            storage,
            config,
            sink: RwLock::new(Weak::<NullSink>::new() as Weak<dyn ScanSink>),
            scans: Mutex::new(HashMap::new()),
        })
    }

    /// Attach the coordinator that receives finalized records.
    pub fn attach_sink(&self, sink: Weak<dyn ScanSink>) {
        *self.sink.write().expect("sink lock poisoned") = sink;
    }

    /// Submit a scan. Returns the scan id immediately; the scan runs out of
    /// band and the finalized record is delivered to the attached sink.
    pub fn submit(self: &Arc<Self>, request: ScanRequest) -> Uuid {
        let scan_id = Uuid::new_v4();
        let (tx, _rx) = watch::channel(None);

        {
            let mut scans = self.scans.lock().expect("scan table poisoned");
            scans.retain(|_, entry| match entry.finished_at {
                Some(at) => at.elapsed() < FINISHED_RETENTION,
                None => true,
            });
            scans.insert(
                scan_id,
                ScanEntry {
                    tx,
                    finished_at: None,
                },
            );
        }

        tracing::info!(
            scan_id = %scan_id,
            document_id = %request.document_id,
            version = request.version,
            "Scan submitted"
        );

        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            orchestrator.run_scan(scan_id, request).await;
        });

        scan_id
    }

    /// Wait for a scan to finalize, racing the per-scan channel against the
    /// given timeout.
    pub async fn await_result(&self, scan_id: Uuid, timeout: Duration) -> EngineResult<ScanRecord> {
        let mut rx = {
            let scans = self.scans.lock().expect("scan table poisoned");
            let entry = scans
                .get(&scan_id)
                .ok_or_else(|| EngineError::NotFound(format!("Scan not found: {}", scan_id)))?;
            entry.tx.subscribe()
        };

        let wait = async move {
            loop {
                if let Some(record) = rx.borrow_and_update().clone() {
                    return Ok(record);
                }
                if rx.changed().await.is_err() {
                    return Err(EngineError::ScanFailed(format!(
                        "Scan {} aborted before finalizing",
                        scan_id
                    )));
                }
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::ScanFailed(format!(
                "Scan {} did not complete within {:?}",
                scan_id, timeout
            ))),
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let ms = self
            .config
            .backoff_base_ms
            .saturating_mul(2_u64.saturating_pow(attempt))
            .min(self.config.backoff_cap_ms);
        Duration::from_millis(ms)
    }

    async fn run_scan(self: Arc<Self>, scan_id: Uuid, request: ScanRequest) {
        let start = Instant::now();
        let mut record = ScanRecord {
            scan_id,
            document_id: request.document_id,
            tenant_id: request.tenant_id,
            version: request.version,
            status: ScanStatus::Scanning,
            verdict: None,
            threats: Vec::new(),
            scanner_version: Some(self.engine.version()),
            scanned_at: None,
            duration_ms: 0,
            attempts: 0,
            error: None,
        };

        let mut last_error = String::new();
        while record.attempts < self.config.max_attempts {
            record.attempts += 1;

            let outcome = match self.storage.get(&request.location).await {
                Ok(data) => self.engine.scan(data).await,
                Err(e) => {
                    // A vanished object would never scan; surface it as a
                    // scanner error so it lands operator-visible.
                    ScanOutcome::Error(format!("Failed to fetch content for scan: {}", e))
                }
            };

            match outcome {
                ScanOutcome::Clean => {
                    record.status = ScanStatus::Completed;
                    record.verdict = Some(ScanVerdict::Clean);
                    break;
                }
                ScanOutcome::Infected(threats) => {
                    record.status = ScanStatus::Completed;
                    record.verdict = Some(ScanVerdict::Infected);
                    record.threats = threats;
                    break;
                }
                ScanOutcome::Suspicious(threats) => {
                    record.status = ScanStatus::Completed;
                    record.verdict = Some(ScanVerdict::Suspicious);
                    record.threats = threats;
                    break;
                }
                ScanOutcome::Error(message) => {
                    tracing::warn!(
                        scan_id = %scan_id,
                        document_id = %request.document_id,
                        attempt = record.attempts,
                        max_attempts = self.config.max_attempts,
                        error = %message,
                        "Scan attempt failed"
                    );
                    last_error = message;
                    if record.attempts < self.config.max_attempts {
                        tokio::time::sleep(self.backoff(record.attempts)).await;
                    }
                }
            }
        }

        if record.verdict.is_none() {
            record.status = ScanStatus::Failed;
            record.verdict = Some(ScanVerdict::Error);
            record.error = Some(last_error);
        }

        record.scanned_at = Some(Utc::now());
        record.duration_ms = start.elapsed().as_millis() as i64;

        tracing::info!(
            scan_id = %scan_id,
            document_id = %request.document_id,
            status = %record.status,
            verdict = ?record.verdict,
            attempts = record.attempts,
            duration_ms = record.duration_ms,
            "Scan finalized"
        );

        let sink = self.sink.read().expect("sink lock poisoned").upgrade();
        match sink {
            Some(sink) => sink.scan_finalized(record.clone()).await,
            None => {
                tracing::warn!(scan_id = %scan_id, "No scan sink attached, result discarded")
            }
        }

        let mut scans = self.scans.lock().expect("scan table poisoned");
        if let Some(entry) = scans.get_mut(&scan_id) {
            entry.finished_at = Some(Instant::now());
            let _ = entry.tx.send(Some(record));
        }
    }
}

/// Placeholder for the unattached sink slot.
struct NullSink;

#[async_trait]
impl ScanSink for NullSink {
    async fn scan_finalized(&self, _record: ScanRecord) {}
}
