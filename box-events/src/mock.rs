//! Mock event feed for testing and local development.
//!
//! The `MockEventFeed` is pre-scripted with batches that are handed out one
//! per fetch, and it records every fetch call so tests can assert the cursor
//! and date-window arguments the caller used.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use audit_indexer_shared::EventBatch;

use crate::{BoxEventsError, EventFeed, Result};

/// Arguments of one recorded `fetch_events` call.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchCall {
    pub cursor: String,
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

/// Mock feed that returns pre-scripted batches.
///
/// Once the script is exhausted, further fetches return an empty batch that
/// leaves the cursor unchanged. Use [`MockEventFeed::fail_next`] to make the
/// next fetch return a transport error instead.
pub struct MockEventFeed {
    batches: Mutex<VecDeque<EventBatch>>,
    calls: Mutex<Vec<FetchCall>>,
    fail_next: AtomicBool,
}

impl MockEventFeed {
    /// Create a new empty mock feed.
    pub fn new() -> Self {
        Self {
            batches: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            fail_next: AtomicBool::new(false),
        }
    }

    /// Create a mock feed pre-scripted with the given batches.
    pub fn with_batches(batches: Vec<EventBatch>) -> Self {
        let feed = Self::new();
        feed.batches.lock().unwrap().extend(batches);
        feed
    }

    /// Append one batch to the script.
    pub fn push_batch(&self, batch: EventBatch) {
        self.batches.lock().unwrap().push_back(batch);
    }

    /// Make the next fetch fail with a transport-style error.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// All recorded fetch calls, in order.
    pub fn calls(&self) -> Vec<FetchCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockEventFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventFeed for MockEventFeed {
    async fn fetch_events(
        &self,
        cursor: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<EventBatch> {
        self.calls.lock().unwrap().push(FetchCall {
            cursor: cursor.to_string(),
            since,
            until,
        });

        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(BoxEventsError::ApiStatus {
                status: 503,
                body: "mock feed unavailable".to_string(),
            });
        }

        let batch = self.batches.lock().unwrap().pop_front();
        Ok(batch.unwrap_or_else(|| EventBatch::empty(cursor)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_indexer_shared::{AuditEvent, EventActor};

    fn event(id: &str) -> AuditEvent {
        AuditEvent {
            id: id.to_string(),
            event_type: "LOGIN".to_string(),
            created_at: Utc::now(),
            created_by: EventActor::default(),
            ip_address: None,
            source: None,
            additional_details: None,
        }
    }

    fn batch(ids: &[&str], current: &str, next: &str) -> EventBatch {
        EventBatch {
            events: ids.iter().map(|id| event(id)).collect(),
            current_cursor: current.to_string(),
            next_cursor: next.to_string(),
            size: ids.len(),
        }
    }

    #[tokio::test]
    async fn test_hands_out_batches_in_order() {
        let feed = MockEventFeed::with_batches(vec![
            batch(&["a"], "0", "100"),
            batch(&["b", "c"], "100", "200"),
        ]);

        let first = feed.fetch_events("0", Utc::now(), Utc::now()).await.unwrap();
        assert_eq!(first.next_cursor, "100");

        let second = feed
            .fetch_events("100", Utc::now(), Utc::now())
            .await
            .unwrap();
        assert_eq!(second.events.len(), 2);
        assert_eq!(second.next_cursor, "200");
    }

    #[tokio::test]
    async fn test_exhausted_script_returns_empty_batch() {
        let feed = MockEventFeed::new();
        let batch = feed
            .fetch_events("42", Utc::now(), Utc::now())
            .await
            .unwrap();
        assert!(batch.events.is_empty());
        assert_eq!(batch.next_cursor, "42");
    }

    #[tokio::test]
    async fn test_records_fetch_arguments() {
        let feed = MockEventFeed::new();
        let since = Utc::now();
        let until = Utc::now();
        feed.fetch_events("7", since, until).await.unwrap();

        let calls = feed.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].cursor, "7");
        assert_eq!(calls[0].since, since);
        assert_eq!(calls[0].until, until);
    }

    #[tokio::test]
    async fn test_fail_next_fails_once() {
        let feed = MockEventFeed::new();
        feed.fail_next();

        assert!(feed.fetch_events("0", Utc::now(), Utc::now()).await.is_err());
        assert!(feed.fetch_events("0", Utc::now(), Utc::now()).await.is_ok());
    }
}
