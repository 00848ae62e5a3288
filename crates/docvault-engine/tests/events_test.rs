mod helpers;

use helpers::{setup_test_app, upload_request, wait_for_status};
use uuid::Uuid;

use docvault_core::models::{DocumentStatus, EventKind};

/// The outbox is appended atomically with the transition and drained by the
/// dispatcher; entries disappear only after a confirmed publish.
#[tokio::test]
async fn lifecycle_events_flow_through_the_outbox() {
    let app = setup_test_app().await;
    let tenant = Uuid::new_v4();

    let receipt = app
        .coordinator
        .upload(upload_request(tenant, "upload-events"), &b"event content"[..])
        .await
        .unwrap();
    wait_for_status(&app, tenant, receipt.document_id, DocumentStatus::Active).await;
    app.coordinator.delete(tenant, receipt.document_id).await.unwrap();

    // Everything is still staged durably before the dispatcher runs.
    assert!(app.bus.published().is_empty());
    assert!(app.store.outbox_entries().len() >= 3);

    app.dispatcher.drain().await.unwrap();
    assert!(app.store.outbox_entries().is_empty());

    let events = app.bus.published();
    let kinds: Vec<EventKind> = events.iter().map(|e| e.kind).collect();
    assert!(kinds.contains(&EventKind::Uploaded));
    assert!(kinds.contains(&EventKind::Scanned));
    assert!(kinds.contains(&EventKind::Deleted));

    // Every event is uniquely identified for consumer-side de-duplication.
    let mut event_ids: Vec<Uuid> = events.iter().map(|e| e.event_id).collect();
    event_ids.sort_unstable();
    event_ids.dedup();
    assert_eq!(event_ids.len(), events.len());

    for event in &events {
        assert_eq!(event.tenant_id, tenant);
        assert_eq!(event.document_id, receipt.document_id);
    }
}

#[tokio::test]
async fn uploaded_event_carries_document_payload() {
    let app = setup_test_app().await;
    let tenant = Uuid::new_v4();

    let receipt = app
        .coordinator
        .upload(upload_request(tenant, "upload-payload"), &b"payload"[..])
        .await
        .unwrap();
    app.dispatcher.drain().await.unwrap();

    let events = app.bus.published();
    let uploaded = events
        .iter()
        .find(|e| e.kind == EventKind::Uploaded)
        .expect("uploaded event published");
    assert_eq!(uploaded.version, 1);
    assert_eq!(uploaded.payload["filename"], "report.pdf");
    assert_eq!(uploaded.payload["content_type"], "application/pdf");
    assert_eq!(uploaded.payload["checksum"], receipt.checksum.as_str());
}

#[tokio::test]
async fn scanned_event_fires_on_every_finalization() {
    let app = setup_test_app().await;
    let tenant = Uuid::new_v4();

    let receipt = app
        .coordinator
        .upload(upload_request(tenant, "upload-rescans"), &b"content"[..])
        .await
        .unwrap();
    wait_for_status(&app, tenant, receipt.document_id, DocumentStatus::Active).await;

    // Rescan the now-active document.
    let scan_id = app
        .coordinator
        .trigger_scan(tenant, receipt.document_id)
        .await
        .unwrap();
    app.coordinator
        .scans()
        .await_result(scan_id, std::time::Duration::from_secs(5))
        .await
        .unwrap();

    app.dispatcher.drain().await.unwrap();
    let scanned_count = app
        .bus
        .published()
        .iter()
        .filter(|e| e.kind == EventKind::Scanned)
        .count();
    assert_eq!(scanned_count, 2);
}
