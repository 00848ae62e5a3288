//! Outbox dispatch: drain pending event entries and publish them.
//!
//! Entries are appended to the outbox by the metadata store transactionally
//! with the state transition that produced them. The dispatcher removes an
//! entry only after a confirmed publish; failures are rescheduled with
//! exponential backoff and parked once the attempt budget is exhausted so
//! they stay operator-visible instead of being dropped.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::interval;
use uuid::Uuid;

use docvault_core::models::LifecycleEvent;

use crate::publisher::EventBus;

/// One durable outbox row awaiting publication.
#[derive(Debug, Clone)]
pub struct OutboxEntry {
    pub event: LifecycleEvent,
    pub attempts: u32,
    pub next_attempt_at: DateTime<Utc>,
    /// Exhausted the attempt budget; excluded from dispatch until an
    /// operator intervenes.
    pub parked: bool,
}

impl OutboxEntry {
    pub fn new(event: LifecycleEvent) -> Self {
        Self {
            event,
            attempts: 0,
            next_attempt_at: Utc::now(),
            parked: false,
        }
    }
}

/// Store-side surface the dispatcher drains. Implemented by the metadata
/// store so outbox rows share its transaction boundary.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Entries due for publication (not parked, `next_attempt_at <= now`),
    /// oldest first, up to `limit`.
    async fn due_entries(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<OutboxEntry>>;

    /// Remove an entry after a confirmed publish.
    async fn mark_published(&self, event_id: Uuid) -> Result<()>;

    /// Record a failed attempt and schedule the next one.
    async fn reschedule(
        &self,
        event_id: Uuid,
        attempts: u32,
        next_attempt_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Park an entry whose attempt budget is exhausted.
    async fn park(&self, event_id: Uuid) -> Result<()>;
}

/// Configuration for the outbox dispatcher
#[derive(Clone)]
pub struct OutboxDispatcherConfig {
    pub poll_interval_secs: u64,
    pub batch_size: usize,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_cap_ms: u64,
}

impl Default for OutboxDispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            batch_size: 100,
            max_attempts: 8,
            backoff_base_ms: 2_000,
            backoff_cap_ms: 300_000,
        }
    }
}

/// Background service that drains the outbox.
///
/// Never blocks the coordinator's synchronous path: publication runs on its
/// own poll loop.
pub struct OutboxDispatcher {
    store: Arc<dyn OutboxStore>,
    bus: Arc<dyn EventBus>,
    config: OutboxDispatcherConfig,
    shutdown_tx: mpsc::Sender<()>,
}

impl OutboxDispatcher {
    /// Create the dispatcher and spawn its worker loop.
    pub fn start(
        store: Arc<dyn OutboxStore>,
        bus: Arc<dyn EventBus>,
        config: OutboxDispatcherConfig,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let store_clone = store.clone();
        let bus_clone = bus.clone();
        let config_clone = config.clone();

        tokio::spawn(async move {
            Self::worker_loop(store_clone, bus_clone, config_clone, shutdown_rx).await;
        });

        Self {
            store,
            bus,
            config,
            shutdown_tx,
        }
    }

    async fn worker_loop(
        store: Arc<dyn OutboxStore>,
        bus: Arc<dyn EventBus>,
        config: OutboxDispatcherConfig,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        let mut poll_interval = interval(Duration::from_secs(config.poll_interval_secs));
        // The first tick completes immediately; consume it so draining
        // starts one full interval after startup.
        poll_interval.tick().await;

        tracing::info!(
            poll_interval_secs = config.poll_interval_secs,
            batch_size = config.batch_size,
            "Outbox dispatcher started"
        );

        loop {
            tokio::select! {
                _ = poll_interval.tick() => {
                    if let Err(e) = Self::process_batch(&store, &bus, &config).await {
                        tracing::error!(error = %e, "Error processing outbox batch");
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Outbox dispatcher shutting down");
                    break;
                }
            }
        }
    }

    /// Process one batch of due entries. Also exposed for embedders that
    /// want deterministic draining (tests, shutdown flushes).
    pub async fn drain(&self) -> Result<usize> {
        Self::process_batch(&self.store, &self.bus, &self.config).await
    }

    async fn process_batch(
        store: &Arc<dyn OutboxStore>,
        bus: &Arc<dyn EventBus>,
        config: &OutboxDispatcherConfig,
    ) -> Result<usize> {
        let due = store
            .due_entries(Utc::now(), config.batch_size)
            .await
            .context("Failed to fetch due outbox entries")?;

        if due.is_empty() {
            return Ok(0);
        }

        tracing::debug!(entry_count = due.len(), "Dispatching outbox entries");

        let mut published = 0;
        for entry in due {
            let event_id = entry.event.event_id;
            match bus.publish(&entry.event).await {
                Ok(()) => {
                    store
                        .mark_published(event_id)
                        .await
                        .context("Failed to remove published outbox entry")?;
                    published += 1;
                }
                Err(e) => {
                    let attempts = entry.attempts + 1;
                    if attempts >= config.max_attempts {
                        tracing::error!(
                            event_id = %event_id,
                            event_type = %entry.event.kind,
                            attempts,
                            error = %e,
                            "Outbox entry exhausted attempts, parking"
                        );
                        store.park(event_id).await?;
                    } else {
                        let delay = backoff(config, attempts);
                        tracing::warn!(
                            event_id = %event_id,
                            attempts,
                            retry_in_ms = delay.as_millis() as u64,
                            error = %e,
                            "Event publish failed, rescheduling"
                        );
                        store
                            .reschedule(
                                event_id,
                                attempts,
                                Utc::now() + chrono::Duration::from_std(delay)?,
                            )
                            .await?;
                    }
                }
            }
        }

        Ok(published)
    }

    /// Gracefully shut down the dispatcher loop.
    pub async fn shutdown(&self) {
        if let Err(e) = self.shutdown_tx.send(()).await {
            tracing::warn!(error = %e, "Failed to send shutdown signal to outbox dispatcher");
        }
    }
}

/// Exponential backoff with a cap.
fn backoff(config: &OutboxDispatcherConfig, attempts: u32) -> Duration {
    let ms = config
        .backoff_base_ms
        .saturating_mul(2_u64.saturating_pow(attempts))
        .min(config.backoff_cap_ms);
    Duration::from_millis(ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::InMemoryEventBus;
    use docvault_core::models::EventKind;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Minimal in-memory outbox for dispatcher tests.
    #[derive(Default)]
    struct TestOutbox {
        entries: Mutex<HashMap<Uuid, OutboxEntry>>,
    }

    impl TestOutbox {
        fn push(&self, event: LifecycleEvent) {
            let entry = OutboxEntry::new(event);
            self.entries
                .lock()
                .unwrap()
                .insert(entry.event.event_id, entry);
        }

        fn len(&self) -> usize {
            self.entries.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl OutboxStore for TestOutbox {
        async fn due_entries(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<OutboxEntry>> {
            let entries = self.entries.lock().unwrap();
            let mut due: Vec<_> = entries
                .values()
                .filter(|e| !e.parked && e.next_attempt_at <= now)
                .cloned()
                .collect();
            due.sort_by_key(|e| e.event.occurred_at);
            due.truncate(limit);
            Ok(due)
        }

        async fn mark_published(&self, event_id: Uuid) -> Result<()> {
            self.entries.lock().unwrap().remove(&event_id);
            Ok(())
        }

        async fn reschedule(
            &self,
            event_id: Uuid,
            attempts: u32,
            next_attempt_at: DateTime<Utc>,
        ) -> Result<()> {
            if let Some(entry) = self.entries.lock().unwrap().get_mut(&event_id) {
                entry.attempts = attempts;
                entry.next_attempt_at = next_attempt_at;
            }
            Ok(())
        }

        async fn park(&self, event_id: Uuid) -> Result<()> {
            if let Some(entry) = self.entries.lock().unwrap().get_mut(&event_id) {
                entry.parked = true;
            }
            Ok(())
        }
    }

    struct FailingBus;

    #[async_trait]
    impl EventBus for FailingBus {
        async fn publish(&self, _event: &LifecycleEvent) -> Result<()> {
            anyhow::bail!("bus unreachable")
        }
    }

    fn test_event() -> LifecycleEvent {
        LifecycleEvent {
            event_id: Uuid::new_v4(),
            kind: EventKind::Uploaded,
            tenant_id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            version: 1,
            occurred_at: Utc::now(),
            payload: serde_json::json!({}),
        }
    }

    fn fast_config(max_attempts: u32) -> OutboxDispatcherConfig {
        OutboxDispatcherConfig {
            poll_interval_secs: 3600,
            batch_size: 10,
            max_attempts,
            backoff_base_ms: 0,
            backoff_cap_ms: 0,
        }
    }

    #[tokio::test]
    async fn drain_publishes_and_removes() {
        let store = Arc::new(TestOutbox::default());
        let bus = Arc::new(InMemoryEventBus::new());
        store.push(test_event());
        store.push(test_event());

        let dispatcher = OutboxDispatcher::start(
            store.clone() as Arc<dyn OutboxStore>,
            bus.clone() as Arc<dyn EventBus>,
            fast_config(3),
        );

        let published = dispatcher.drain().await.unwrap();
        assert_eq!(published, 2);
        assert_eq!(bus.published().len(), 2);
        assert_eq!(store.len(), 0);

        dispatcher.shutdown().await;
    }

    #[tokio::test]
    async fn failures_reschedule_then_park() {
        let store = Arc::new(TestOutbox::default());
        let event = test_event();
        let event_id = event.event_id;
        store.push(event);

        let dispatcher = OutboxDispatcher::start(
            store.clone() as Arc<dyn OutboxStore>,
            Arc::new(FailingBus) as Arc<dyn EventBus>,
            fast_config(2),
        );

        // First failure reschedules.
        assert_eq!(dispatcher.drain().await.unwrap(), 0);
        {
            let entries = store.entries.lock().unwrap();
            let entry = entries.get(&event_id).unwrap();
            assert_eq!(entry.attempts, 1);
            assert!(!entry.parked);
        }

        // Second failure exhausts the budget and parks the entry.
        assert_eq!(dispatcher.drain().await.unwrap(), 0);
        {
            let entries = store.entries.lock().unwrap();
            let entry = entries.get(&event_id).unwrap();
            assert!(entry.parked);
        }

        // Parked entries are no longer dispatched.
        assert_eq!(dispatcher.drain().await.unwrap(), 0);

        dispatcher.shutdown().await;
    }

    #[test]
    fn backoff_curve_is_capped() {
        let config = OutboxDispatcherConfig::default();
        assert_eq!(backoff(&config, 1), Duration::from_millis(4_000));
        assert_eq!(backoff(&config, 2), Duration::from_millis(8_000));
        assert_eq!(backoff(&config, 30), Duration::from_millis(300_000));
    }
}
