//! Docvault Scan Library
//!
//! Threat scanning for uploaded content: the `ScanEngine` seam to an
//! external scanning service (ClamAV provided), and the `ScanOrchestrator`
//! that drives scan lifecycle, retries, and result delivery back to the
//! lifecycle coordinator.

pub mod clamav;
pub mod engine;
pub mod orchestrator;

use std::sync::Arc;

use docvault_core::EngineConfig;

// Re-export commonly used types
pub use clamav::ClamAvEngine;
pub use engine::{NoopScanEngine, ScanEngine, ScanOutcome};
pub use orchestrator::{ScanOrchestrator, ScanOrchestratorConfig, ScanRequest, ScanSink};

/// Create the scan engine selected by configuration.
///
/// With scanning disabled every upload is reported clean; the pipeline
/// shape stays identical so development setups need no scanner daemon.
pub fn create_scan_engine(config: &EngineConfig) -> Arc<dyn ScanEngine> {
    if config.scan_enabled {
        Arc::new(ClamAvEngine::with_timeout(
            config.clamav_host.clone(),
            config.clamav_port,
            config.clamav_timeout_secs,
        ))
    } else {
        Arc::new(NoopScanEngine)
    }
}
