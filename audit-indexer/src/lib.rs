//! # Audit Indexer
//!
//! Continuously ingests the append-only enterprise audit-event feed and
//! republishes each event, transformed, into a search index. The resume
//! position is recovered from the most recently indexed document itself, so
//! no separate durable checkpoint store exists.
//!
//! ## Architecture
//!
//! One scheduler drives a fixed-delay poll loop; per tick it resolves the
//! effective cursor, fetches a batch from the event feed, and runs each
//! event through the transformer and the sink writer, strictly in source
//! order:
//!
//! 1. **Resolver**: recovers `(resume cursor, max observed created_at)`
//!    from the sink, or derives a bootstrap window when the index is empty
//! 2. **Transformer**: normalizes one raw event into an index document
//! 3. **Writer**: submits documents to the sink, ordered, fire-and-forget
//! 4. **Scheduler**: owns the cursor state and the tick loop
//!
//! ## Modules
//!
//! - [`config`]: Configuration and dependency initialization
//! - [`resolver`]: Cursor/checkpoint recovery from the sink
//! - [`transformer`]: Raw event to document normalization
//! - [`writer`]: Ordered asynchronous sink submission
//! - [`scheduler`]: The poll-fetch-publish loop
//! - [`errors`]: Error types for the ingestion path

pub mod config;
pub mod errors;
pub mod resolver;
pub mod scheduler;
pub mod transformer;
pub mod writer;

pub use config::Dependencies;
pub use errors::IngestError;

use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Ingest error.
    #[error("Ingest error: {0}")]
    IngestError(#[from] IngestError),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
