//! Search index provider trait definition.
//!
//! This module defines the abstract interface for search index operations,
//! allowing for different backend implementations (OpenSearch,
//! Elasticsearch, etc.).

use async_trait::async_trait;

use crate::errors::SearchIndexError;
use crate::types::LastDocument;
use audit_indexer_shared::AuditDocument;

/// Abstracts the underlying search index implementation.
///
/// Implementations are injected into the ingestion components to enable
/// dependency injection and easy testing with mock implementations.
///
/// # Note on Document Creation
///
/// `create_document` creates a new document on every call, without a
/// client-side document id and without upsert semantics. Submitting the same
/// logical event twice therefore produces two documents; duplicate
/// re-delivery after a restart is tolerated by design.
///
/// # Index Initialization
///
/// `ensure_index_exists` must be called once during application startup; the
/// ingestion loop is gated on its success.
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// Ensure the search index and its mapping exist, creating them if
    /// necessary. Idempotent.
    async fn ensure_index_exists(&self) -> Result<(), SearchIndexError>;

    /// Create one new document for the given normalized audit event.
    async fn create_document(&self, document: &AuditDocument) -> Result<(), SearchIndexError>;

    /// Fetch the checkpoint fields of the most recently indexed document.
    ///
    /// Queries for a single hit sorted by `created_at` descending.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(LastDocument))` - The top hit's checkpoint fields
    /// * `Ok(None)` - The index holds no documents yet
    /// * `Err(SearchIndexError)` - Transport or response-parse failure
    async fn latest_document(&self) -> Result<Option<LastDocument>, SearchIndexError>;
}
