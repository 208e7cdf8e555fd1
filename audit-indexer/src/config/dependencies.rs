//! Dependency initialization and wiring for the audit indexer.

use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::resolver::{CursorResolver, LookbackWindow};
use crate::scheduler::{IngestionScheduler, SchedulerConfig};
use crate::transformer::EventTransformer;
use crate::writer::{SinkWriter, WriterConfig};
use crate::IndexingError;
use audit_indexer_repository::{IndexConfig, OpenSearchProvider, SearchIndexProvider};
use box_events::FeedSource;

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default audit event index name.
const DEFAULT_INDEX_NAME: &str = "box_enterprise_events";

/// Default enterprise events API base URL.
const DEFAULT_BOX_API_URL: &str = "https://api.box.com";

/// Default delay between poll ticks, in seconds.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Default per-call timeout, in seconds.
const DEFAULT_CALL_TIMEOUT_SECS: u64 = 15;

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured scheduler ready to run.
    pub scheduler: IngestionScheduler,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `AUDIT_INDEX_NAME`: Index name (default: "box_enterprise_events")
    /// - `INDEX_NUM_SHARDS` / `INDEX_NUM_REPLICAS`: Sharding (default: 1 / 1)
    /// - `EVENT_FEED_SOURCE`: "live" or "mock" (default: live)
    /// - `BOX_API_URL`: Events API base URL (default: https://api.box.com)
    /// - `BOX_API_TOKEN`: Bearer token, required for the live feed
    /// - `POLL_INTERVAL_SECS`: Delay between ticks (default: 60)
    /// - `CALL_TIMEOUT_SECS`: Per-call timeout (default: 15)
    /// - `LOOKBACK_SECONDS` / `LOOKBACK_MINUTES` / `LOOKBACK_HOURS` /
    ///   `LOOKBACK_DAYS`: Bootstrap lookback units (default: 0/0/0/1)
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies, index verified
    /// * `Err(IndexingError)` - If configuration or the index bootstrap
    ///   fails; the scheduler is never constructed in that case
    pub async fn new() -> Result<Self, IndexingError> {
        let opensearch_url =
            env::var("OPENSEARCH_URL").unwrap_or_else(|_| DEFAULT_OPENSEARCH_URL.to_string());
        let index_name =
            env::var("AUDIT_INDEX_NAME").unwrap_or_else(|_| DEFAULT_INDEX_NAME.to_string());
        let num_shards = env_or("INDEX_NUM_SHARDS", 1u32);
        let num_replicas = env_or("INDEX_NUM_REPLICAS", 1u32);
        let poll_interval = Duration::from_secs(env_or(
            "POLL_INTERVAL_SECS",
            DEFAULT_POLL_INTERVAL_SECS,
        ));
        let call_timeout =
            Duration::from_secs(env_or("CALL_TIMEOUT_SECS", DEFAULT_CALL_TIMEOUT_SECS));
        let lookback = LookbackWindow::new(
            env_or("LOOKBACK_SECONDS", 0),
            env_or("LOOKBACK_MINUTES", 0),
            env_or("LOOKBACK_HOURS", 0),
            env_or("LOOKBACK_DAYS", 1),
        );

        info!(
            opensearch_url = %opensearch_url,
            index_name = %index_name,
            poll_interval_secs = poll_interval.as_secs(),
            call_timeout_secs = call_timeout.as_secs(),
            lookback = ?lookback,
            "Initializing dependencies"
        );

        let index_config = IndexConfig::new(index_name.as_str(), num_shards, num_replicas);
        let provider = OpenSearchProvider::new(&opensearch_url, index_config).map_err(|e| {
            IndexingError::config(format!("Failed to create OpenSearch provider: {}", e))
        })?;

        // Readiness gate: the scheduler never starts when the index cannot
        // be verified or created.
        provider
            .ensure_index_exists()
            .await
            .map_err(|e| IndexingError::config(format!("Failed to ensure index exists: {}", e)))?;

        info!(index_name = %index_name, "Search index ready");

        let provider: Arc<dyn SearchIndexProvider> = Arc::new(provider);

        let feed = Self::feed_from_env()?.into_feed();
        let resolver = CursorResolver::new(Arc::clone(&provider), lookback);
        let transformer = EventTransformer::new();
        let writer = SinkWriter::new(
            Arc::clone(&provider),
            WriterConfig {
                call_timeout,
                ..WriterConfig::default()
            },
        );
        let scheduler = IngestionScheduler::new(
            feed,
            resolver,
            transformer,
            writer,
            SchedulerConfig {
                poll_interval,
                call_timeout,
            },
        );

        Ok(Self { scheduler })
    }

    /// Build the event feed source from the environment.
    fn feed_from_env() -> Result<FeedSource, IndexingError> {
        let source = env::var("EVENT_FEED_SOURCE")
            .unwrap_or_else(|_| "live".to_string())
            .to_lowercase();

        match source.as_str() {
            "mock" => {
                warn!("Using mock event feed, no events will be ingested");
                Ok(FeedSource::mock(Vec::new()))
            }
            "live" => {
                let base_url =
                    env::var("BOX_API_URL").unwrap_or_else(|_| DEFAULT_BOX_API_URL.to_string());
                let token = env::var("BOX_API_TOKEN").map_err(|_| {
                    IndexingError::config("BOX_API_TOKEN is required for the live event feed")
                })?;
                Ok(FeedSource::live(base_url, token))
            }
            other => Err(IndexingError::config(format!(
                "Invalid EVENT_FEED_SOURCE '{}', expected 'live' or 'mock'",
                other
            ))),
        }
    }
}

/// Read an environment variable, falling back to a default when unset or
/// unparseable.
fn env_or<T: FromStr + Copy>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
