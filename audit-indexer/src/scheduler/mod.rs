//! Ingestion scheduler: the poll-fetch-publish loop.
//!
//! One task drives fixed-delay ticks: the first fires immediately at
//! startup, each subsequent one `poll_interval` after the previous tick
//! finished. Ticks never overlap, and all cursor state lives in a single
//! struct mutated only here.
//!
//! Per tick:
//! 1. **Cursor phase**: always re-resolve against the sink. The stream
//!    cursor is seeded from the resolver exactly once; afterwards it is
//!    carried from batch to batch and only the date bound is refreshed.
//! 2. **Fetch-and-publish phase**: fetch a batch, advance the in-memory
//!    cursor to the batch's `next_cursor`, then transform and submit every
//!    event in source order. One bad event is dropped and logged; the rest
//!    of the batch continues.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::errors::IngestError;
use crate::resolver::CursorResolver;
use crate::transformer::EventTransformer;
use crate::writer::SinkWriter;
use box_events::EventFeed;

/// Configuration for the ingestion scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Delay between the end of one tick and the start of the next.
    pub poll_interval: Duration,
    /// Timeout applied to the resolver query and the feed fetch.
    pub call_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            call_timeout: Duration::from_secs(15),
        }
    }
}

/// Process-local cursor state, owned exclusively by the scheduler.
///
/// Not persisted: a restart re-resolves from the sink.
#[derive(Debug, Default)]
struct CursorState {
    resume_cursor: String,
    seeded: bool,
}

/// Drives the fixed-delay ingestion loop.
pub struct IngestionScheduler {
    feed: Arc<dyn EventFeed>,
    resolver: CursorResolver,
    transformer: EventTransformer,
    writer: SinkWriter,
    config: SchedulerConfig,
    state: CursorState,
    shutdown_tx: broadcast::Sender<()>,
}

impl IngestionScheduler {
    pub fn new(
        feed: Arc<dyn EventFeed>,
        resolver: CursorResolver,
        transformer: EventTransformer,
        writer: SinkWriter,
        config: SchedulerConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            feed,
            resolver,
            transformer,
            writer,
            config,
            state: CursorState::default(),
            shutdown_tx,
        }
    }

    /// A handle that triggers a graceful shutdown when sent to.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Run the poll loop until shutdown.
    ///
    /// The first tick fires immediately; afterwards each tick starts
    /// `poll_interval` after the previous one completed ("do work, then
    /// wait", not an aligned periodic timer). On shutdown the pending delay
    /// is cancelled and queued sink writes are drained.
    pub async fn run(mut self) {
        info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            "Starting audit event ingestion loop"
        );

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        loop {
            self.tick().await;

            tokio::select! {
                _ = sleep(self.config.poll_interval) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }

        self.writer.close().await;
        info!("Ingestion loop stopped");
    }

    /// Run one poll-fetch-publish cycle.
    pub async fn tick(&mut self) {
        // Cursor phase. The date bound is refreshed from the sink on every
        // tick; the stream cursor is only seeded once.
        let resolved = match timeout(self.config.call_timeout, self.resolver.resolve()).await {
            Ok(resolved) => resolved,
            Err(_) => {
                warn!(
                    timeout_secs = self.config.call_timeout.as_secs(),
                    "Cursor resolution timed out"
                );
                None
            }
        };

        let Some(checkpoint) = resolved else {
            warn!("No checkpoint available, skipping this poll");
            return;
        };

        if !self.state.seeded {
            self.state.resume_cursor = checkpoint.resume_cursor.clone();
            self.state.seeded = true;
            info!(cursor = %self.state.resume_cursor, "Seeded resume cursor from sink");
        }

        // Fetch-and-publish phase.
        let since = checkpoint.max_observed_created_at;
        let until = Utc::now();
        let fetch = self
            .feed
            .fetch_events(&self.state.resume_cursor, since, until);

        let batch = match timeout(self.config.call_timeout, fetch).await {
            Ok(Ok(batch)) => batch,
            Ok(Err(e)) => {
                let e = IngestError::from(e);
                error!(error = %e, "Failed to fetch audit events");
                return;
            }
            Err(_) => {
                error!(
                    timeout_secs = self.config.call_timeout.as_secs(),
                    "Audit event fetch timed out"
                );
                return;
            }
        };

        debug!(
            current_cursor = %batch.current_cursor,
            next_cursor = %batch.next_cursor,
            size = batch.size,
            events = batch.events.len(),
            "Fetched event batch"
        );

        self.state.resume_cursor = batch.next_cursor.clone();

        for event in &batch.events {
            match self.transformer.transform(event) {
                Ok(mut document) => {
                    document.next_stream_position = batch.next_cursor.clone();
                    info!(
                        event_id = %event.id,
                        event_type = %event.event_type,
                        "Publishing audit event"
                    );
                    if let Err(e) = self.writer.write(document).await {
                        error!(error = %e, "Sink writer unavailable, ending tick");
                        return;
                    }
                }
                Err(e) => {
                    error!(
                        event_id = %event.id,
                        event_type = %event.event_type,
                        error = %e,
                        "Failed to transform audit event, dropping it"
                    );
                }
            }
        }
    }

    /// Consume the scheduler and drain outstanding sink writes.
    ///
    /// Used where the loop is driven tick-by-tick rather than via [`run`],
    /// e.g. in tests.
    pub async fn shutdown(self) {
        self.writer.close().await;
    }
}
