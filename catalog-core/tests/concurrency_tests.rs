// concurrency_tests.rs
// Concurrent callers, deadlines and store outages
//
// These tests verify:
// 1. Concurrent review appends to one item are all retained
// 2. Reads running beside appends see whole documents only
// 3. Slow or offline stores surface Timeout / StoreUnavailable

use catalog_core::{CatalogConfig, CatalogError, CatalogQueryService, DocumentId, MemoryStore};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn setup_service(config: CatalogConfig) -> CatalogQueryService<MemoryStore> {
    let store = MemoryStore::new();
    store
        .create_text_index(&config.collection, config.text_index())
        .unwrap();
    store
        .insert_many(
            &config.collection,
            vec![
                json!({
                    "_id": 1,
                    "title": "Coffee Mug",
                    "category": "Kitchen",
                    "price": 12.5,
                    "reviews": []
                }),
                json!({
                    "_id": 2,
                    "title": "Tea Cup",
                    "category": "Kitchen",
                    "price": 7.0,
                    "reviews": []
                }),
            ],
        )
        .unwrap();
    CatalogQueryService::new(Arc::new(store), config)
}

// =============================================================================
// CONCURRENT APPENDS
// =============================================================================

/// Test: Many tasks append reviews to the same item
/// Expected: Every review is stored exactly once
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reviews_all_retained() {
    const NUM_TASKS: usize = 16;
    const REVIEWS_PER_TASK: usize = 25;

    let svc = setup_service(CatalogConfig::default());

    let handles: Vec<_> = (0..NUM_TASKS)
        .map(|task| {
            let svc = svc.clone();
            tokio::spawn(async move {
                for n in 0..REVIEWS_PER_TASK {
                    svc.add_review(&DocumentId::Int(1), &format!("t{}_{}", task, n), "load", 3.0)
                        .await
                        .expect("append should succeed");
                }
            })
        })
        .collect();

    for handle in handles {
        handle.await.expect("task should not panic");
    }

    let reviews = svc.get_item(&DocumentId::Int(1)).await.unwrap().reviews;
    assert_eq!(reviews.len(), NUM_TASKS * REVIEWS_PER_TASK);

    let mut comments: Vec<String> = reviews.into_iter().map(|r| r.comment).collect();
    comments.sort();
    comments.dedup();
    assert_eq!(comments.len(), NUM_TASKS * REVIEWS_PER_TASK);

    // the other item is untouched
    assert!(svc
        .get_item(&DocumentId::Int(2))
        .await
        .unwrap()
        .reviews
        .is_empty());
}

/// Test: Reads interleaved with appends
/// Expected: Every read decodes, review count never decreases
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reads_during_appends() {
    let svc = setup_service(CatalogConfig::default());

    let writer = {
        let svc = svc.clone();
        tokio::spawn(async move {
            for n in 0..200 {
                svc.add_review(&DocumentId::Int(2), &format!("r{}", n), "w", 5.0)
                    .await
                    .unwrap();
            }
        })
    };

    let reader = {
        let svc = svc.clone();
        tokio::spawn(async move {
            let mut last_seen = 0;
            for _ in 0..200 {
                let page = svc.list_items("Kitchen", 0, 10).await.unwrap();
                assert_eq!(page.len(), 2);
                let seen = page[1].reviews.len();
                assert!(seen >= last_seen);
                last_seen = seen;
                assert_eq!(svc.count_items("All").await.unwrap(), 2);
            }
        })
    };

    writer.await.unwrap();
    reader.await.unwrap();
    assert_eq!(
        svc.get_item(&DocumentId::Int(2)).await.unwrap().reviews.len(),
        200
    );
}

// =============================================================================
// DEADLINES AND OUTAGES
// =============================================================================

#[tokio::test]
async fn test_slow_store_times_out() {
    let config = CatalogConfig {
        request_timeout_ms: 20,
        ..CatalogConfig::default()
    };
    let svc = setup_service(config);
    svc.store().set_latency(Some(Duration::from_millis(500)));

    let err = svc.list_categories().await.unwrap_err();
    assert!(matches!(err, CatalogError::Timeout(d) if d == Duration::from_millis(20)));

    let err = svc.get_item(&DocumentId::Int(1)).await.unwrap_err();
    assert!(matches!(err, CatalogError::Timeout(_)));

    svc.store().set_latency(None);
    assert_eq!(svc.count_items("All").await.unwrap(), 2);
}

#[tokio::test]
async fn test_timed_out_append_is_not_applied() {
    let config = CatalogConfig {
        request_timeout_ms: 20,
        ..CatalogConfig::default()
    };
    let svc = setup_service(config);
    svc.store().set_latency(Some(Duration::from_millis(500)));

    let err = svc
        .add_review(&DocumentId::Int(1), "late", "Ann", 2.0)
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Timeout(_)));

    svc.store().set_latency(None);
    assert!(svc
        .get_item(&DocumentId::Int(1))
        .await
        .unwrap()
        .reviews
        .is_empty());
}

#[tokio::test]
async fn test_offline_store_is_unavailable_everywhere() {
    let svc = setup_service(CatalogConfig::default());
    svc.store().set_offline(true);

    assert!(matches!(
        svc.list_categories().await,
        Err(CatalogError::StoreUnavailable(_))
    ));
    assert!(matches!(
        svc.list_items("All", 0, 5).await,
        Err(CatalogError::StoreUnavailable(_))
    ));
    assert!(matches!(
        svc.count_items("All").await,
        Err(CatalogError::StoreUnavailable(_))
    ));
    assert!(matches!(
        svc.search_items("mug", 0, 5).await,
        Err(CatalogError::StoreUnavailable(_))
    ));
    assert!(matches!(
        svc.count_search_items("mug").await,
        Err(CatalogError::StoreUnavailable(_))
    ));
    assert!(matches!(
        svc.get_item(&DocumentId::Int(1)).await,
        Err(CatalogError::StoreUnavailable(_))
    ));
    assert!(matches!(
        svc.get_related_items().await,
        Err(CatalogError::StoreUnavailable(_))
    ));
    assert!(matches!(
        svc.add_review(&DocumentId::Int(1), "x", "y", 1.0).await,
        Err(CatalogError::StoreUnavailable(_))
    ));
}

#[tokio::test]
async fn test_invalid_arguments_checked_before_store() {
    let svc = setup_service(CatalogConfig::default());
    svc.store().set_offline(true);

    assert!(matches!(
        svc.list_items("All", 0, 0).await,
        Err(CatalogError::InvalidArgument(_))
    ));
    assert!(matches!(
        svc.count_search_items("   ").await,
        Err(CatalogError::InvalidArgument(_))
    ));
}
