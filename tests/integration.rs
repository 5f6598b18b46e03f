//! Integration tests for the index-sync engine.
//!
//! These run against the in-memory store implementations, wiring the full
//! engine the way an embedding service would: admission gate on the request
//! path, reconciler dispatches after relational mutations.
//!
//! # Test Organization
//! - `admission_*` - request gating: quotas, windows, idle sweep
//! - `reconcile_*` - propagation: dispatch paths, execution-time resolution
//! - `lifecycle_*` - engine start/shutdown behavior

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Notify;

use index_sync::store::memory::{InMemoryCatalog, InMemoryIndex};
use index_sync::{
    ArticleRecord, Document, EngineState, IndexSyncConfig, IndexSyncEngine, RelationalStore,
    SearchIndex, StoreError,
};

fn record(id: i64, title: &str) -> ArticleRecord {
    ArticleRecord {
        id,
        title: title.to_string(),
        body: format!("body of {}", title),
        author_name: "Grace".to_string(),
        tag_labels: vec!["golang".to_string()],
    }
}

fn config(json: &str) -> IndexSyncConfig {
    serde_json::from_str(json).expect("test config should parse")
}

fn engine_with(
    config: IndexSyncConfig,
    catalog: Arc<dyn RelationalStore>,
    index: Arc<dyn SearchIndex>,
) -> IndexSyncEngine {
    IndexSyncEngine::new(config, catalog, index)
}

// =============================================================================
// Admission
// =============================================================================

#[tokio::test]
async fn admission_burst_of_four_then_refill() {
    let engine = engine_with(
        config(r#"{"admit_capacity": 3, "admit_window_ms": 1000}"#),
        Arc::new(InMemoryCatalog::new()),
        Arc::new(InMemoryIndex::new()),
    );

    // four requests inside a few milliseconds
    let outcomes: Vec<bool> = (0..4).map(|_| engine.admit("A")).collect();
    assert_eq!(outcomes, vec![true, true, true, false]);

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert!(engine.admit("A"), "fifth request after the window should pass");
}

#[tokio::test]
async fn admission_budgets_are_per_client() {
    let engine = engine_with(
        config(r#"{"admit_capacity": 2, "admit_window_ms": 60000}"#),
        Arc::new(InMemoryCatalog::new()),
        Arc::new(InMemoryIndex::new()),
    );

    assert!(engine.admit("192.168.1.1"));
    assert!(engine.admit("192.168.1.2"));
    assert!(engine.admit("192.168.1.1"));
    assert!(engine.admit("192.168.1.2"));

    assert!(!engine.admit("192.168.1.1"));
    assert!(!engine.admit("192.168.1.2"));
}

#[tokio::test]
async fn admission_sweeper_forgets_idle_clients() {
    // 20ms window, swept after 2 windows, sweeper every 10ms
    let engine = engine_with(
        config(
            r#"{
                "admit_capacity": 1,
                "admit_window_ms": 20,
                "idle_window_multiple": 2,
                "sweep_interval_ms": 10
            }"#,
        ),
        Arc::new(InMemoryCatalog::new()),
        Arc::new(InMemoryIndex::new()),
    );
    engine.start();

    assert!(engine.admit("client"));
    assert!(!engine.admit("client"), "capacity 1 is spent");

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(
        engine.admission().tracked_clients(),
        0,
        "idle bucket should have been swept"
    );

    // brand-new client again: full capacity, no persisted penalty
    assert!(engine.admit("client"));

    engine.shutdown().await;
}

// =============================================================================
// Reconciliation
// =============================================================================

#[tokio::test]
async fn reconcile_tag_change_indexes_current_members_in_one_call() {
    let catalog = Arc::new(InMemoryCatalog::new());
    catalog.insert_article(record(1, "concurrency patterns"));
    catalog.insert_article(record(2, "error handling"));
    catalog.set_tag_members(7, vec![1, 2]);

    let index = Arc::new(InMemoryIndex::new());
    let engine = engine_with(IndexSyncConfig::default(), catalog, index.clone());

    engine
        .reconciler()
        .dispatch_tag_changed(7)
        .await
        .expect("reconciliation task should not panic");

    assert_eq!(index.write_calls(), 1, "one batched index write");
    assert_eq!(index.last_batch_len(), 2);
    assert_eq!(index.get(1).unwrap().title, "concurrency patterns");
    assert_eq!(index.get(2).unwrap().title, "error handling");
}

#[tokio::test]
async fn reconcile_articles_change_never_queries_catalog() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let index = Arc::new(InMemoryIndex::new());
    let engine = engine_with(IndexSyncConfig::default(), catalog.clone(), index.clone());

    let docs = vec![Document::from(record(9, "already resolved"))];
    engine
        .reconciler()
        .dispatch_articles_changed(docs)
        .await
        .unwrap();

    assert_eq!(index.len(), 1);
    assert_eq!(catalog.query_count(), 0, "caller-supplied documents are pushed as-is");
}

/// Catalog wrapper that holds every membership query at a gate until the test
/// releases it, so the test can interleave an association update between
/// dispatch and execution.
struct GatedCatalog {
    inner: InMemoryCatalog,
    gate: Notify,
}

#[async_trait]
impl RelationalStore for GatedCatalog {
    async fn find_articles_by_tag(&self, tag_id: i64) -> Result<Vec<ArticleRecord>, StoreError> {
        self.gate.notified().await;
        self.inner.find_articles_by_tag(tag_id).await
    }
}

#[tokio::test]
async fn reconcile_tag_membership_is_resolved_at_execution_time() {
    let catalog = Arc::new(GatedCatalog {
        inner: InMemoryCatalog::new(),
        gate: Notify::new(),
    });
    catalog.inner.insert_article(record(1, "original member"));
    catalog.inner.insert_article(record(2, "added later"));
    catalog.inner.set_tag_members(5, vec![1]);

    let index = Arc::new(InMemoryIndex::new());
    let engine = engine_with(IndexSyncConfig::default(), catalog.clone(), index.clone());

    // dispatch while membership is still {1}
    let handle = engine.reconciler().dispatch_tag_changed(5);

    // association changes after dispatch but before the query runs
    catalog.inner.set_tag_members(5, vec![1, 2]);
    catalog.gate.notify_one();

    handle.await.unwrap();

    assert_eq!(
        index.last_batch_len(),
        2,
        "indexed set reflects membership at execution time, not dispatch time"
    );
    assert!(index.get(2).is_some());
}

#[tokio::test]
async fn reconcile_dispatch_returns_before_work_completes() {
    let catalog = Arc::new(GatedCatalog {
        inner: InMemoryCatalog::new(),
        gate: Notify::new(),
    });
    catalog.inner.set_tag_members(3, vec![]);

    let index = Arc::new(InMemoryIndex::new());
    let engine = engine_with(IndexSyncConfig::default(), catalog.clone(), index.clone());

    let started = Instant::now();
    let handle = engine.reconciler().dispatch_tag_changed(3);
    assert!(
        started.elapsed() < Duration::from_millis(50),
        "dispatch must not wait for the reconciliation"
    );
    assert_eq!(index.write_calls(), 0, "work has not run yet");

    catalog.gate.notify_one();
    handle.await.unwrap();
    assert_eq!(index.write_calls(), 1);
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn lifecycle_shutdown_cancels_backoff_wait() {
    /// An index that always fails, forcing the dispatch into backoff.
    struct DownIndex;

    #[async_trait]
    impl SearchIndex for DownIndex {
        async fn index_documents(&self, _documents: &[Document]) -> Result<(), StoreError> {
            Err(StoreError::Index("connection refused".to_string()))
        }
    }

    // an hour of retry budget: only cancellation can end this quickly
    let engine = engine_with(
        config(
            r#"{
                "retry_initial_ms": 3600000,
                "retry_max_interval_ms": 3600000,
                "retry_max_elapsed_ms": 7200000
            }"#,
        ),
        Arc::new(InMemoryCatalog::new()),
        Arc::new(DownIndex),
    );
    engine.start();

    let handle = engine
        .reconciler()
        .dispatch_articles_changed(vec![Document::from(record(1, "doomed"))]);

    // let the first attempt fail and enter the backoff wait
    tokio::time::sleep(Duration::from_millis(50)).await;

    let started = Instant::now();
    engine.shutdown().await;
    handle.await.unwrap();

    assert!(
        started.elapsed() < Duration::from_secs(5),
        "shutdown should interrupt the hour-long backoff"
    );
    assert_eq!(engine.state(), EngineState::Stopped);
}

#[tokio::test]
async fn lifecycle_stores_stay_independent_of_reconciliation_outcome() {
    // relational "write" happened (records exist); index write gives up fast
    let catalog = Arc::new(InMemoryCatalog::new());
    catalog.insert_article(record(1, "durable"));
    catalog.set_tag_members(1, vec![1]);

    struct DownIndex;

    #[async_trait]
    impl SearchIndex for DownIndex {
        async fn index_documents(&self, _documents: &[Document]) -> Result<(), StoreError> {
            Err(StoreError::Index("write timeout".to_string()))
        }
    }

    let engine = engine_with(
        config(r#"{"retry_initial_ms": 1, "retry_max_elapsed_ms": 20}"#),
        catalog.clone(),
        Arc::new(DownIndex),
    );

    engine.reconciler().dispatch_tag_changed(1).await.unwrap();

    // the give-up was swallowed; the relational state is untouched and a
    // later dispatch can still converge
    assert_eq!(catalog.find_articles_by_tag(1).await.unwrap().len(), 1);
}
