//! Docvault Engine Library
//!
//! The document lifecycle coordinator: the state machine that turns a raw
//! upload into a durable, scanned, versioned, tenant-isolated document
//! record. It drives the storage gateway, integrity module, scan
//! orchestrator, and version ledger, and emits lifecycle events through the
//! outbox.

pub mod coordinator;
pub mod ledger;
pub mod locks;
pub mod memory;
pub mod store;

// Re-export commonly used types
pub use coordinator::{AccessLevel, DocumentCoordinator, UploadRequest};
pub use ledger::VersionLedger;
pub use locks::LockTable;
pub use memory::MemoryMetadataStore;
pub use store::{
    DocumentFilter, DocumentPage, MetadataStore, PageRequest, SortBy, SortOrder, UploadReceipt,
};
