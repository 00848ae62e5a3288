//! Keyed lock arena for per-document mutual exclusion.
//!
//! Locks are created lazily per `(tenant_id, document_id)` and evicted
//! opportunistically once idle, so the table stays proportional to the
//! number of documents with in-flight operations rather than the corpus.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// Sweep the table for idle entries once it grows past this size.
const EVICT_THRESHOLD: usize = 1024;

#[derive(Default)]
pub struct LockTable {
    locks: Mutex<HashMap<(Uuid, Uuid), Arc<AsyncMutex<()>>>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for one document. Operations on the same document
    /// queue in arrival order; different documents proceed in parallel.
    pub async fn lock(&self, tenant_id: Uuid, document_id: Uuid) -> OwnedMutexGuard<()> {
        let entry = {
            let mut locks = self.locks.lock().expect("lock table poisoned");
            if locks.len() > EVICT_THRESHOLD {
                // An Arc only referenced by the table belongs to no waiter.
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            locks
                .entry((tenant_id, document_id))
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        entry.lock_owned().await
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap().len()
    }
}
