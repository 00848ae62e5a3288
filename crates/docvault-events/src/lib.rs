//! Docvault Events Library
//!
//! At-least-once delivery of lifecycle events. The coordinator appends an
//! outbox entry atomically with the state transition that produced it; the
//! dispatcher here drains the outbox and publishes to an `EventBus`,
//! removing entries only after a confirmed publish.

pub mod outbox;
pub mod publisher;

// Re-export commonly used types
pub use outbox::{OutboxDispatcher, OutboxDispatcherConfig, OutboxEntry, OutboxStore};
pub use publisher::{EventBus, HttpEventBus, InMemoryEventBus};
