//! Docvault Core Library
//!
//! This crate provides the domain models, error types, configuration,
//! validation, and content-integrity primitives shared across all Docvault
//! components.

pub mod config;
pub mod error;
pub mod integrity;
pub mod models;
pub mod telemetry;
pub mod validation;

// Re-export commonly used types
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult, ErrorMetadata, LogLevel};
pub use integrity::{digest_bytes, DigestingReader, IntegrityError, StreamDigest};
pub use models::{
    BackendKind, Document, DocumentCreate, DocumentStatus, EventKind, LifecycleEvent, ScanRecord,
    ScanStatus, ScanVerdict, StorageLocation, ThreatDetail, ThreatSeverity, VersionRecord,
};
