//! Client boundary for the Box enterprise audit event feed.
//!
//! This crate provides:
//! - [`EventFeed`] trait for abstracting access to the upstream event log
//! - [`BoxEventsClient`] production client that polls the admin-logs endpoint
//! - [`MockEventFeed`] mock client for testing with scripted batches
//! - [`FeedSource`] config enum for choosing between mock and live clients
//!
//! The cursor handed to [`EventFeed::fetch_events`] is an opaque stream
//! position; `"0"` means "from the beginning visible within the date window".
//!
//! Authentication lifecycle (token refresh, JWT assertions) is the caller's
//! concern: the live client takes a pre-provisioned bearer token.

mod mock;

pub use mock::{FetchCall, MockEventFeed};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client as ReqwestClient;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use audit_indexer_shared::{AuditEvent, EventBatch};

/// Stream position sentinel for "start of stream within the date window".
pub const START_OF_STREAM: &str = "0";

/// Events returned per fetch, upper-bounded by the API at 500.
const FETCH_LIMIT: usize = 500;

#[derive(Debug, thiserror::Error)]
pub enum BoxEventsError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api returned status {status}: {body}")]
    ApiStatus { status: u16, body: String },
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BoxEventsError>;

/// Trait for fetching enterprise audit events from the upstream feed.
///
/// This trait abstracts the event log client to enable dependency injection
/// and mocking for testing. Production code uses [`BoxEventsClient`], while
/// tests use [`MockEventFeed`].
#[async_trait]
pub trait EventFeed: Send + Sync {
    /// Fetch the next batch of audit events.
    ///
    /// # Arguments
    ///
    /// * `cursor` - Opaque resume token; [`START_OF_STREAM`] starts from the
    ///   beginning visible within the date window
    /// * `since` - Lower bound on event `created_at`
    /// * `until` - Upper bound on event `created_at`
    async fn fetch_events(
        &self,
        cursor: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<EventBatch>;
}

/// Wire shape of the admin-logs event log response.
#[derive(Debug, Deserialize)]
struct EventLogResponse {
    #[serde(default)]
    entries: Vec<AuditEvent>,
    #[serde(default)]
    chunk_size: usize,
    /// Returned as a JSON number by current API versions and as a string by
    /// older ones.
    #[serde(default)]
    next_stream_position: Value,
}

fn position_to_string(position: &Value, fallback: &str) -> String {
    match position {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => fallback.to_string(),
    }
}

/// Production client that polls the enterprise events endpoint.
///
/// # Example
///
/// ```ignore
/// use box_events::{BoxEventsClient, EventFeed, START_OF_STREAM};
///
/// let client = BoxEventsClient::new("https://api.box.com", token);
/// let batch = client.fetch_events(START_OF_STREAM, since, until).await?;
/// ```
pub struct BoxEventsClient {
    base_url: String,
    token: String,
    client: ReqwestClient,
}

impl BoxEventsClient {
    pub fn new(base_url: &str, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            client: ReqwestClient::new(),
        }
    }
}

#[async_trait]
impl EventFeed for BoxEventsClient {
    async fn fetch_events(
        &self,
        cursor: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<EventBatch> {
        let url = format!("{}/2.0/events", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[
                ("stream_type", "admin_logs"),
                ("limit", &FETCH_LIMIT.to_string()),
                ("stream_position", cursor),
                (
                    "created_after",
                    &since.to_rfc3339_opts(SecondsFormat::Secs, true),
                ),
                (
                    "created_before",
                    &until.to_rfc3339_opts(SecondsFormat::Secs, true),
                ),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BoxEventsError::ApiStatus {
                status: status.as_u16(),
                body,
            });
        }

        let event_log: EventLogResponse = response.json().await?;
        let next_cursor = position_to_string(&event_log.next_stream_position, cursor);

        debug!(
            cursor = %cursor,
            next_cursor = %next_cursor,
            chunk_size = event_log.chunk_size,
            entries = event_log.entries.len(),
            "Fetched enterprise event log chunk"
        );

        Ok(EventBatch {
            size: event_log.chunk_size,
            events: event_log.entries,
            current_cursor: cursor.to_string(),
            next_cursor,
        })
    }
}

/// Configuration for the audit event feed source.
///
/// Use this to explicitly choose between mock and live clients, following
/// the same pattern as the other data-source crates in this workspace.
#[derive(Debug, Clone)]
pub enum FeedSource {
    /// Use a mock feed with pre-scripted batches.
    Mock(Vec<EventBatch>),

    /// Connect to the live enterprise events API.
    Live {
        /// API base URL (e.g., "https://api.box.com")
        base_url: String,
        /// Pre-provisioned bearer token.
        token: String,
    },
}

impl FeedSource {
    pub fn mock(batches: Vec<EventBatch>) -> Self {
        Self::Mock(batches)
    }

    pub fn live(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::Live {
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    /// Create the appropriate [`EventFeed`] implementation.
    pub fn into_feed(self) -> std::sync::Arc<dyn EventFeed> {
        match self {
            Self::Mock(batches) => std::sync::Arc::new(MockEventFeed::with_batches(batches)),
            Self::Live { base_url, token } => {
                std::sync::Arc::new(BoxEventsClient::new(&base_url, token))
            }
        }
    }
}
