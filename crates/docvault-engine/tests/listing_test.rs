mod helpers;

use helpers::{setup_test_app, upload_request, wait_for_status};
use uuid::Uuid;

use docvault_core::models::DocumentStatus;
use docvault_core::EngineError;
use docvault_engine::{DocumentFilter, PageRequest, SortBy, SortOrder};

async fn seed_documents(app: &helpers::TestApp, tenant: Uuid) -> Vec<Uuid> {
    let mut ids = Vec::new();
    for (i, (owner, tags)) in [
        ("alice", vec!["finance", "q3"]),
        ("alice", vec!["finance"]),
        ("bob", vec!["legal", "q3"]),
    ]
    .into_iter()
    .enumerate()
    {
        let mut request = upload_request(tenant, &format!("seed-{}", i));
        request.owner_id = owner.to_string();
        request.metadata.filename = format!("doc-{}.pdf", i);
        request.metadata.tags = tags.into_iter().map(String::from).collect();
        let receipt = app
            .coordinator
            .upload(request, format!("content {}", i).as_bytes())
            .await
            .unwrap();
        wait_for_status(app, tenant, receipt.document_id, DocumentStatus::Active).await;
        ids.push(receipt.document_id);
    }
    ids
}

#[tokio::test]
async fn filter_by_owner() {
    let app = setup_test_app().await;
    let tenant = Uuid::new_v4();
    seed_documents(&app, tenant).await;

    let page = app
        .coordinator
        .list(
            tenant,
            DocumentFilter {
                owner_id: Some("alice".to_string()),
                ..Default::default()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(page.total_count, 2);
    assert!(page.documents.iter().all(|d| d.owner_id == "alice"));
}

#[tokio::test]
async fn tag_filters_use_and_semantics() {
    let app = setup_test_app().await;
    let tenant = Uuid::new_v4();
    seed_documents(&app, tenant).await;

    // Both tags must match; only the first seeded document has both.
    let page = app
        .coordinator
        .list(
            tenant,
            DocumentFilter {
                tags: vec!["finance".to_string(), "q3".to_string()],
                ..Default::default()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(page.documents[0].filename, "doc-0.pdf");

    // Filter tags are normalized like stored tags.
    let page = app
        .coordinator
        .list(
            tenant,
            DocumentFilter {
                tags: vec![" Q3 ".to_string()],
                ..Default::default()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(page.total_count, 2);
}

#[tokio::test]
async fn filter_by_status() {
    let app = setup_test_app().await;
    let tenant = Uuid::new_v4();
    let ids = seed_documents(&app, tenant).await;

    // Quarantine one document through a rescan.
    app.scan_engine.push(docvault_scan::ScanOutcome::Infected(vec![]));
    let scan_id = app.coordinator.trigger_scan(tenant, ids[0]).await.unwrap();
    app.coordinator
        .scans()
        .await_result(scan_id, std::time::Duration::from_secs(5))
        .await
        .unwrap();
    wait_for_status(&app, tenant, ids[0], DocumentStatus::Quarantined).await;

    let page = app
        .coordinator
        .list(
            tenant,
            DocumentFilter {
                status: Some(DocumentStatus::Quarantined),
                ..Default::default()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(page.documents[0].id, ids[0]);
}

#[tokio::test]
async fn pagination_counts_the_filtered_set() {
    let app = setup_test_app().await;
    let tenant = Uuid::new_v4();
    seed_documents(&app, tenant).await;

    let filter = DocumentFilter {
        owner_id: Some("alice".to_string()),
        ..Default::default()
    };
    let page = app
        .coordinator
        .list(
            tenant,
            filter.clone(),
            PageRequest {
                offset: 0,
                limit: 1,
                sort_by: SortBy::Filename,
                sort_order: SortOrder::Asc,
            },
        )
        .await
        .unwrap();

    // Total reflects the filtered set (2 alice docs), not the table (3).
    assert_eq!(page.total_count, 2);
    assert_eq!(page.documents.len(), 1);
    assert!(page.has_more);
    assert_eq!(page.documents[0].filename, "doc-0.pdf");

    let page = app
        .coordinator
        .list(
            tenant,
            filter,
            PageRequest {
                offset: 1,
                limit: 1,
                sort_by: SortBy::Filename,
                sort_order: SortOrder::Asc,
            },
        )
        .await
        .unwrap();
    assert_eq!(page.documents.len(), 1);
    assert!(!page.has_more);
    assert_eq!(page.documents[0].filename, "doc-1.pdf");
}

#[tokio::test]
async fn archived_documents_remain_listed_deleted_do_not() {
    let app = setup_test_app().await;
    let tenant = Uuid::new_v4();
    let ids = seed_documents(&app, tenant).await;

    app.coordinator.delete(tenant, ids[2]).await.unwrap();

    let page = app
        .coordinator
        .list(tenant, DocumentFilter::default(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total_count, 3);
    assert!(page
        .documents
        .iter()
        .any(|d| d.status == DocumentStatus::Archived));
}

#[tokio::test]
async fn absurd_page_limits_are_rejected() {
    let app = setup_test_app().await;
    let tenant = Uuid::new_v4();

    let err = app
        .coordinator
        .list(
            tenant,
            DocumentFilter::default(),
            PageRequest {
                limit: 0,
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}
