//! Shared fixtures for engine integration tests: an in-memory metadata
//! store, tempdir-backed local storage, a scripted scan engine, and an
//! in-memory event bus wired to the outbox dispatcher.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::TempDir;
use uuid::Uuid;

use docvault_core::models::{Document, DocumentCreate, DocumentStatus};
use docvault_core::EngineConfig;
use docvault_engine::{
    AccessLevel, DocumentCoordinator, MemoryMetadataStore, UploadRequest,
};
use docvault_events::{EventBus, InMemoryEventBus, OutboxDispatcher, OutboxDispatcherConfig, OutboxStore};
use docvault_scan::{ScanEngine, ScanOutcome, ScanOrchestrator, ScanOrchestratorConfig};
use docvault_storage::{LocalStorage, Storage};

/// Scan engine returning scripted outcomes, defaulting to clean once the
/// script is exhausted.
pub struct ScriptedEngine {
    outcomes: Mutex<VecDeque<ScanOutcome>>,
}

impl ScriptedEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(VecDeque::new()),
        })
    }

    pub fn push(&self, outcome: ScanOutcome) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }
}

#[async_trait]
impl ScanEngine for ScriptedEngine {
    async fn scan(&self, _data: Bytes) -> ScanOutcome {
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ScanOutcome::Clean)
    }

    fn version(&self) -> String {
        "scripted".to_string()
    }
}

pub struct TestApp {
    pub coordinator: Arc<DocumentCoordinator>,
    pub store: MemoryMetadataStore,
    pub storage: Arc<dyn Storage>,
    pub bus: Arc<InMemoryEventBus>,
    pub dispatcher: OutboxDispatcher,
    pub scan_engine: Arc<ScriptedEngine>,
    _dir: TempDir,
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(EngineConfig::default()).await
}

pub async fn setup_test_app_with(config: EngineConfig) -> TestApp {
    let dir = TempDir::new().expect("tempdir");
    let storage: Arc<dyn Storage> = Arc::new(
        LocalStorage::new(dir.path(), Duration::from_secs(5))
            .await
            .expect("local storage"),
    );
    let store = MemoryMetadataStore::new();
    let scan_engine = ScriptedEngine::new();

    let orchestrator = ScanOrchestrator::new(
        scan_engine.clone(),
        storage.clone(),
        ScanOrchestratorConfig {
            max_attempts: 3,
            backoff_base_ms: 1,
            backoff_cap_ms: 10,
        },
    );

    let coordinator = DocumentCoordinator::new(
        Arc::new(store.clone()),
        storage.clone(),
        orchestrator,
        config,
    );

    let bus = Arc::new(InMemoryEventBus::new());
    let dispatcher = OutboxDispatcher::start(
        Arc::new(store.clone()) as Arc<dyn OutboxStore>,
        bus.clone() as Arc<dyn EventBus>,
        OutboxDispatcherConfig {
            // Tests drain explicitly; keep the poll loop out of the way.
            poll_interval_secs: 3600,
            batch_size: 100,
            max_attempts: 3,
            backoff_base_ms: 0,
            backoff_cap_ms: 0,
        },
    );

    TestApp {
        coordinator,
        store,
        storage,
        bus,
        dispatcher,
        scan_engine,
        _dir: dir,
    }
}

pub fn upload_request(tenant_id: Uuid, idempotency_key: &str) -> UploadRequest {
    UploadRequest {
        tenant_id,
        owner_id: "user-1".to_string(),
        document_id: None,
        metadata: DocumentCreate {
            filename: "report.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            title: Some("Quarterly report".to_string()),
            description: None,
            tags: vec!["Finance".to_string(), "q3".to_string()],
            attributes: Default::default(),
        },
        expected_checksum: None,
        idempotency_key: idempotency_key.to_string(),
        version_description: None,
    }
}

/// Poll a document until it reaches the expected status.
pub async fn wait_for_status(
    app: &TestApp,
    tenant_id: Uuid,
    document_id: Uuid,
    status: DocumentStatus,
) -> Document {
    for _ in 0..200 {
        let (doc, _) = app
            .coordinator
            .get(tenant_id, document_id, false, AccessLevel::Standard)
            .await
            .expect("document should exist");
        if doc.status == status {
            return doc;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("document never reached status {}", status);
}

/// Poll a document until the scan-failed flag is raised.
pub async fn wait_for_scan_failed(app: &TestApp, tenant_id: Uuid, document_id: Uuid) -> Document {
    for _ in 0..200 {
        let (doc, _) = app
            .coordinator
            .get(tenant_id, document_id, false, AccessLevel::Standard)
            .await
            .expect("document should exist");
        if doc.scan_failed {
            return doc;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("scan-failed flag never raised");
}
