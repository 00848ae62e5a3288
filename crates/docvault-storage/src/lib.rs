//! Docvault Storage Library
//!
//! This crate provides the storage abstraction and backend implementations
//! for document content. It includes the `Storage` trait and backends for
//! S3-compatible object stores and the local filesystem.
//!
//! # Storage key format
//!
//! Object keys are tenant-scoped so tenant isolation holds at the storage
//! layer independent of metadata-store correctness:
//!
//! ```text
//! documents/{tenant_id}/{document_id}/{upload_session}
//! ```
//!
//! The upload-session segment is the caller's idempotency key: a retried
//! put for the same session overwrites the same object key instead of
//! creating orphans. Keys must not contain `..` or a leading `/`. Key
//! generation is centralized in the `keys` module so all backends stay
//! consistent.

pub mod factory;
pub mod keys;
pub mod local;
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use docvault_core::models::{BackendKind, StorageLocation};
pub use factory::create_storage;
pub use keys::document_key;
pub use local::LocalStorage;
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
