mod helpers;

use std::collections::HashSet;

use futures::future::join_all;
use helpers::{setup_test_app, upload_request, wait_for_status};
use uuid::Uuid;

use docvault_core::models::DocumentStatus;

/// N concurrent uploads to the same document id must yield exactly N
/// sequential, gapless version numbers with no duplicates.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_uploads_version_gaplessly() {
    let app = setup_test_app().await;
    let tenant = Uuid::new_v4();
    let document_id = Uuid::new_v4();
    let n = 8;

    let uploads = (0..n).map(|i| {
        let coordinator = app.coordinator.clone();
        let mut request = upload_request(tenant, &format!("concurrent-{}", i));
        request.document_id = Some(document_id);
        let content = format!("content for upload {}", i).into_bytes();
        async move { coordinator.upload(request, &content[..]).await }
    });

    let receipts: Vec<_> = join_all(uploads)
        .await
        .into_iter()
        .collect::<Result<_, _>>()
        .expect("all uploads should succeed");

    let mut versions: Vec<i32> = receipts.iter().map(|r| r.version).collect();
    versions.sort_unstable();
    assert_eq!(versions, (1..=n as i32).collect::<Vec<_>>());

    let unique: HashSet<i32> = versions.iter().copied().collect();
    assert_eq!(unique.len(), n);

    let ledger: Vec<i32> = app
        .coordinator
        .list_versions(tenant, document_id)
        .await
        .unwrap()
        .iter()
        .map(|v| v.version)
        .collect();
    assert_eq!(ledger, (1..=n as i32).collect::<Vec<_>>());

    let doc = wait_for_status(&app, tenant, document_id, DocumentStatus::Active).await;
    assert_eq!(doc.current_version, n as i32);
}

/// Concurrent retries carrying the same idempotency key must converge on a
/// single document and a single version, never fork.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_retries_converge_on_one_version() {
    let app = setup_test_app().await;
    let tenant = Uuid::new_v4();
    let content = b"retried content".to_vec();

    let uploads = (0..6).map(|_| {
        let coordinator = app.coordinator.clone();
        let request = upload_request(tenant, "same-session");
        let content = content.clone();
        async move { coordinator.upload(request, &content[..]).await }
    });

    let receipts: Vec<_> = join_all(uploads)
        .await
        .into_iter()
        .collect::<Result<_, _>>()
        .expect("all retries should succeed");

    let document_ids: HashSet<Uuid> = receipts.iter().map(|r| r.document_id).collect();
    assert_eq!(document_ids.len(), 1);
    assert!(receipts.iter().all(|r| r.version == 1));

    let document_id = *document_ids.iter().next().unwrap();
    let versions = app
        .coordinator
        .list_versions(tenant, document_id)
        .await
        .unwrap();
    assert_eq!(versions.len(), 1);
}

/// Uploads to unrelated documents are not serialized behind each other.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unrelated_documents_upload_in_parallel() {
    let app = setup_test_app().await;
    let tenant = Uuid::new_v4();

    let uploads = (0..8).map(|i| {
        let coordinator = app.coordinator.clone();
        let request = upload_request(tenant, &format!("parallel-{}", i));
        async move { coordinator.upload(request, &b"independent"[..]).await }
    });

    let receipts: Vec<_> = join_all(uploads)
        .await
        .into_iter()
        .collect::<Result<_, _>>()
        .expect("all uploads should succeed");

    let ids: HashSet<Uuid> = receipts.iter().map(|r| r.document_id).collect();
    assert_eq!(ids.len(), 8);
    assert!(receipts.iter().all(|r| r.version == 1));
}
