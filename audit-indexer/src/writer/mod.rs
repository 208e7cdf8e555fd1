//! Sink writer: ordered, fire-and-forget document submission.
//!
//! The scheduler never waits for a write to complete. Documents go onto a
//! bounded channel and a single background drain task issues the create
//! calls strictly in submission order, so the sink sees writes in source
//! order even though the scheduler has already moved on. Write failures are
//! logged and never retried or surfaced.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info};

use crate::errors::IngestError;
use audit_indexer_repository::SearchIndexProvider;
use audit_indexer_shared::AuditDocument;

/// Configuration for the sink writer.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Capacity of the submission channel.
    pub channel_capacity: usize,
    /// Timeout applied to each create call.
    pub call_timeout: Duration,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1000,
            call_timeout: Duration::from_secs(15),
        }
    }
}

/// Writer that submits documents to the search index.
pub struct SinkWriter {
    sender: mpsc::Sender<AuditDocument>,
    drain_handle: JoinHandle<()>,
}

impl SinkWriter {
    /// Create a writer and start its drain task.
    pub fn new(provider: Arc<dyn SearchIndexProvider>, config: WriterConfig) -> Self {
        let (sender, mut receiver) = mpsc::channel::<AuditDocument>(config.channel_capacity);
        let call_timeout = config.call_timeout;

        let drain_handle = tokio::spawn(async move {
            while let Some(document) = receiver.recv().await {
                match timeout(call_timeout, provider.create_document(&document)).await {
                    Ok(Ok(())) => {
                        info!(
                            event_id = %document.id,
                            event_type = %document.event_type,
                            "Indexed audit event document"
                        );
                    }
                    Ok(Err(e)) => {
                        error!(
                            event_id = %document.id,
                            error = %e,
                            "Failed to create search document"
                        );
                    }
                    Err(_) => {
                        error!(
                            event_id = %document.id,
                            timeout_secs = call_timeout.as_secs(),
                            "Search document creation timed out"
                        );
                    }
                }
            }
            debug!("Sink writer drain task finished");
        });

        Self {
            sender,
            drain_handle,
        }
    }

    /// Submit one document for indexing.
    ///
    /// Returns as soon as the document is queued; completion and failure of
    /// the actual create call are the drain task's concern.
    pub async fn write(&self, document: AuditDocument) -> Result<(), IngestError> {
        self.sender
            .send(document)
            .await
            .map_err(|_| IngestError::writer("sink writer channel closed"))
    }

    /// Close the writer and wait for queued writes to drain.
    pub async fn close(self) {
        drop(self.sender);
        let _ = self.drain_handle.await;
    }
}
