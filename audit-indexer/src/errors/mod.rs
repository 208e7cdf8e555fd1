//! Error types for the ingestion path.

use thiserror::Error;

/// Errors that can occur in the ingestion loop.
///
/// None of these terminate the process: per-event failures drop the event,
/// per-tick failures end the tick, and the loop continues at the next
/// scheduled point. Resolver failures are not represented here; the
/// resolver signals "no checkpoint this tick" with `None`.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Fetching from the upstream event feed failed.
    #[error("Feed error: {0}")]
    FeedError(String),

    /// A single event could not be normalized.
    #[error("Transform error: {0}")]
    TransformError(String),

    /// The sink writer could not accept a document.
    #[error("Writer error: {0}")]
    WriterError(String),
}

impl IngestError {
    /// Create a feed error.
    pub fn feed(msg: impl Into<String>) -> Self {
        Self::FeedError(msg.into())
    }

    /// Create a transform error.
    pub fn transform(msg: impl Into<String>) -> Self {
        Self::TransformError(msg.into())
    }

    /// Create a writer error.
    pub fn writer(msg: impl Into<String>) -> Self {
        Self::WriterError(msg.into())
    }
}

impl From<box_events::BoxEventsError> for IngestError {
    fn from(err: box_events::BoxEventsError) -> Self {
        Self::FeedError(err.to_string())
    }
}
