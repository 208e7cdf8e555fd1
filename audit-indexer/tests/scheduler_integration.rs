//! Integration tests for the ingestion scheduler.
//!
//! These tests use the real scheduler, resolver, transformer and writer but
//! mock the two external boundaries: the event feed and the search index
//! provider.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::json;

use audit_indexer::resolver::{CursorResolver, LookbackWindow};
use audit_indexer::scheduler::{IngestionScheduler, SchedulerConfig};
use audit_indexer::transformer::EventTransformer;
use audit_indexer::writer::{SinkWriter, WriterConfig};
use audit_indexer_repository::{LastDocument, SearchIndexError, SearchIndexProvider};
use audit_indexer_shared::{AuditDocument, AuditEvent, EventActor, EventBatch};
use box_events::MockEventFeed;

/// Mock provider with a scripted checkpoint query and recorded writes.
struct ScriptedProvider {
    checkpoints: Mutex<VecDeque<Result<Option<LastDocument>, SearchIndexError>>>,
    created: Mutex<Vec<AuditDocument>>,
}

impl ScriptedProvider {
    fn new(checkpoints: Vec<Result<Option<LastDocument>, SearchIndexError>>) -> Self {
        Self {
            checkpoints: Mutex::new(checkpoints.into()),
            created: Mutex::new(Vec::new()),
        }
    }

    fn created_documents(&self) -> Vec<AuditDocument> {
        self.created.lock().unwrap().clone()
    }

    fn created_ids(&self) -> Vec<String> {
        self.created_documents()
            .iter()
            .map(|d| d.id.clone())
            .collect()
    }
}

#[async_trait]
impl SearchIndexProvider for ScriptedProvider {
    async fn ensure_index_exists(&self) -> Result<(), SearchIndexError> {
        Ok(())
    }

    async fn create_document(&self, doc: &AuditDocument) -> Result<(), SearchIndexError> {
        self.created.lock().unwrap().push(doc.clone());
        Ok(())
    }

    async fn latest_document(&self) -> Result<Option<LastDocument>, SearchIndexError> {
        self.checkpoints
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(None))
    }
}

fn checkpoint_doc(cursor: &str, created_at: &str) -> Result<Option<LastDocument>, SearchIndexError> {
    Ok(Some(LastDocument {
        next_stream_position: cursor.to_string(),
        created_at: created_at.to_string(),
    }))
}

fn event(id: &str) -> AuditEvent {
    AuditEvent {
        id: id.to_string(),
        event_type: "UPLOAD".to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
        created_by: EventActor {
            login: Some("test@example.com".to_string()),
            name: Some("Test User".to_string()),
        },
        ip_address: None,
        source: Some(json!({"item_type": "file"})),
        additional_details: None,
    }
}

fn batch(events: Vec<AuditEvent>, current: &str, next: &str) -> EventBatch {
    EventBatch {
        size: events.len(),
        events,
        current_cursor: current.to_string(),
        next_cursor: next.to_string(),
    }
}

fn scheduler(
    feed: Arc<MockEventFeed>,
    provider: Arc<ScriptedProvider>,
    lookback: LookbackWindow,
) -> IngestionScheduler {
    let provider_dyn: Arc<dyn SearchIndexProvider> = provider;
    IngestionScheduler::new(
        feed,
        CursorResolver::new(Arc::clone(&provider_dyn), lookback),
        EventTransformer::new(),
        SinkWriter::new(provider_dyn, WriterConfig::default()),
        SchedulerConfig {
            poll_interval: Duration::from_secs(60),
            call_timeout: Duration::from_secs(5),
        },
    )
}

#[tokio::test]
async fn test_writes_preserve_source_order() {
    let feed = Arc::new(MockEventFeed::with_batches(vec![batch(
        vec![event("e1"), event("e2"), event("e3")],
        "0",
        "100",
    )]));
    let provider = Arc::new(ScriptedProvider::new(vec![Ok(None)]));

    let mut sched = scheduler(feed, provider.clone(), LookbackWindow::default());
    sched.tick().await;
    sched.shutdown().await;

    assert_eq!(provider.created_ids(), vec!["e1", "e2", "e3"]);
}

#[tokio::test]
async fn test_documents_are_stamped_with_batch_next_cursor() {
    let feed = Arc::new(MockEventFeed::with_batches(vec![batch(
        vec![event("e1"), event("e2")],
        "0",
        "4242",
    )]));
    let provider = Arc::new(ScriptedProvider::new(vec![Ok(None)]));

    let mut sched = scheduler(feed, provider.clone(), LookbackWindow::default());
    sched.tick().await;
    sched.shutdown().await;

    let docs = provider.created_documents();
    assert_eq!(docs.len(), 2);
    assert!(docs.iter().all(|d| d.next_stream_position == "4242"));
}

#[tokio::test]
async fn test_checkpoint_continuity_across_ticks() {
    let feed = Arc::new(MockEventFeed::with_batches(vec![
        batch(vec![event("e1")], "0", "100"),
        batch(vec![event("e2")], "100", "200"),
    ]));
    let provider = Arc::new(ScriptedProvider::new(vec![
        Ok(None),
        checkpoint_doc("100", "2024-03-01T10:00:00.000"),
    ]));

    let mut sched = scheduler(feed.clone(), provider.clone(), LookbackWindow::default());
    sched.tick().await;
    sched.tick().await;
    sched.shutdown().await;

    let calls = feed.calls();
    assert_eq!(calls.len(), 2);
    // The second fetch resumes exactly where the first batch ended.
    assert_eq!(calls[1].cursor, "100");
}

#[tokio::test]
async fn test_cursor_sticky_when_resolver_fails_mid_stream() {
    let feed = Arc::new(MockEventFeed::with_batches(vec![
        batch(vec![event("e1")], "A", "B1"),
        batch(vec![event("e2")], "B1", "B2"),
    ]));
    let t3 = "2024-03-02T08:30:00.000";
    let provider = Arc::new(ScriptedProvider::new(vec![
        checkpoint_doc("A", "2024-03-01T10:00:00.000"),
        Err(SearchIndexError::search("sink briefly down")),
        checkpoint_doc("X", t3),
    ]));

    let mut sched = scheduler(feed.clone(), provider.clone(), LookbackWindow::default());
    sched.tick().await; // seeds from "A", advances to "B1"
    sched.tick().await; // resolver fails: no fetch, state untouched
    sched.tick().await; // resolver says "X", but the sticky cursor wins
    sched.shutdown().await;

    let calls = feed.calls();
    assert_eq!(calls.len(), 2, "failing tick must not fetch");
    assert_eq!(calls[0].cursor, "A");
    assert_eq!(calls[1].cursor, "B1");

    // The date bound, unlike the cursor, is refreshed from the sink.
    assert_eq!(
        calls[1].since,
        Utc.with_ymd_and_hms(2024, 3, 2, 8, 30, 0).unwrap()
    );
}

#[tokio::test]
async fn test_empty_index_bootstraps_from_start_of_stream() {
    let feed = Arc::new(MockEventFeed::new());
    let provider = Arc::new(ScriptedProvider::new(vec![Ok(None)]));

    // hours=2 alone: the compounded lookback collapses to 2000 ms.
    let before = Utc::now();
    let mut sched = scheduler(
        feed.clone(),
        provider.clone(),
        LookbackWindow::new(0, 0, 2, 0),
    );
    sched.tick().await;
    sched.shutdown().await;
    let after = Utc::now();

    let calls = feed.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].cursor, "0");

    let lookback = chrono::Duration::milliseconds(2000);
    assert!(calls[0].since >= before - lookback);
    assert!(calls[0].since <= after - lookback);
    assert!(calls[0].until >= calls[0].since);
}

#[tokio::test]
async fn test_one_bad_event_does_not_poison_the_batch() {
    let mut bad = event("e2");
    bad.event_type = "METADATA_INSTANCE_CREATE".to_string();
    bad.additional_details = Some(json!({
        "metadata": {"type": "t", "operationParams": "not valid json"}
    }));

    let feed = Arc::new(MockEventFeed::with_batches(vec![batch(
        vec![event("e1"), bad, event("e3")],
        "0",
        "100",
    )]));
    let provider = Arc::new(ScriptedProvider::new(vec![Ok(None)]));

    let mut sched = scheduler(feed, provider.clone(), LookbackWindow::default());
    sched.tick().await;
    sched.shutdown().await;

    assert_eq!(provider.created_ids(), vec!["e1", "e3"]);
}

#[tokio::test]
async fn test_feed_failure_skips_tick_but_not_the_next() {
    let feed = Arc::new(MockEventFeed::with_batches(vec![batch(
        vec![event("e1")],
        "0",
        "100",
    )]));
    feed.fail_next();
    let provider = Arc::new(ScriptedProvider::new(vec![Ok(None), Ok(None)]));

    let mut sched = scheduler(feed.clone(), provider.clone(), LookbackWindow::default());
    sched.tick().await; // fetch fails, nothing written
    assert!(provider.created_ids().is_empty());

    sched.tick().await; // next tick recovers
    sched.shutdown().await;
    assert_eq!(provider.created_ids(), vec!["e1"]);
}

#[tokio::test]
async fn test_restart_reseeds_cursor_from_sink() {
    // First "process": ingests one batch ending at cursor 100.
    let feed = Arc::new(MockEventFeed::with_batches(vec![batch(
        vec![event("e1")],
        "0",
        "100",
    )]));
    let provider = Arc::new(ScriptedProvider::new(vec![Ok(None)]));
    let mut sched = scheduler(feed, provider.clone(), LookbackWindow::default());
    sched.tick().await;
    sched.shutdown().await;

    // Second "process": in-memory state is gone; the cursor comes back
    // from the last written document.
    let last = provider.created_documents().pop().unwrap();
    let feed2 = Arc::new(MockEventFeed::new());
    let provider2 = Arc::new(ScriptedProvider::new(vec![checkpoint_doc(
        &last.next_stream_position,
        &last.created_at,
    )]));
    let mut sched2 = scheduler(feed2.clone(), provider2, LookbackWindow::default());
    sched2.tick().await;
    sched2.shutdown().await;

    assert_eq!(feed2.calls()[0].cursor, "100");
}
