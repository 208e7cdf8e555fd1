//! OpenSearch provider implementation.
//!
//! This module provides the concrete implementation of `SearchIndexProvider`
//! using the OpenSearch Rust crate.

use async_trait::async_trait;
use opensearch::{
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesExistsParts},
    IndexParts, OpenSearch, SearchParts,
};
use serde_json::{json, Value};
use tracing::{debug, error, info};
use url::Url;

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::opensearch::index_config::{get_index_settings, IndexConfig};
use crate::types::LastDocument;
use audit_indexer_shared::AuditDocument;

/// OpenSearch provider implementation.
///
/// Stores normalized audit event documents and serves the reverse-sorted
/// point query used for cursor recovery.
pub struct OpenSearchProvider {
    client: OpenSearch,
    index_config: IndexConfig,
}

impl OpenSearchProvider {
    /// Create a new OpenSearch provider connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    /// * `index_config` - Index name and sharding configuration
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchProvider)` - A new provider instance
    /// * `Err(SearchIndexError)` - If connection setup fails
    pub fn new(url: &str, index_config: IndexConfig) -> Result<Self, SearchIndexError> {
        let parsed_url =
            Url::parse(url).map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %url,
            index = %index_config.name,
            "Created OpenSearch provider"
        );

        Ok(Self {
            client,
            index_config,
        })
    }

    /// The query body for the reverse-sorted checkpoint lookup.
    fn latest_document_query() -> Value {
        json!({
            "size": 1,
            "sort": [
                { "created_at": { "order": "desc" } }
            ],
            "query": { "match_all": {} }
        })
    }
}

#[async_trait]
impl SearchIndexProvider for OpenSearchProvider {
    /// Ensure the audit event index and its mapping exist.
    ///
    /// Checks for the index first and creates it with the configured
    /// settings and mappings when absent. Safe to call repeatedly.
    async fn ensure_index_exists(&self) -> Result<(), SearchIndexError> {
        let exists_response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[&self.index_config.name]))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        if exists_response.status_code().is_success() {
            debug!(index = %self.index_config.name, "Index already exists");
            return Ok(());
        }

        info!(index = %self.index_config.name, "Index not found, creating");

        let create_response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(&self.index_config.name))
            .body(get_index_settings(&self.index_config))
            .send()
            .await
            .map_err(|e| SearchIndexError::index_creation(e.to_string()))?;

        let status = create_response.status_code();
        if !status.is_success() {
            let error_body = create_response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Index creation failed");
            return Err(SearchIndexError::index_creation(format!(
                "Index creation failed with status {}: {}",
                status, error_body
            )));
        }

        info!(index = %self.index_config.name, "Index created");
        Ok(())
    }

    /// Create one new document for the given audit event.
    ///
    /// The request carries no document id, so the backend assigns one and
    /// every call creates a new document.
    async fn create_document(&self, document: &AuditDocument) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .index(IndexParts::Index(&self.index_config.name))
            .body(document)
            .send()
            .await
            .map_err(|e| SearchIndexError::index(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Document creation failed");
            return Err(SearchIndexError::index(format!(
                "Document creation failed with status {}: {}",
                status, error_body
            )));
        }

        debug!(
            event_id = %document.id,
            event_type = %document.event_type,
            "Audit event document created"
        );
        Ok(())
    }

    /// Fetch the most recently indexed document's checkpoint fields.
    async fn latest_document(&self) -> Result<Option<LastDocument>, SearchIndexError> {
        let response = self
            .client
            .search(SearchParts::Index(&[&self.index_config.name]))
            .body(Self::latest_document_query())
            .send()
            .await
            .map_err(|e| SearchIndexError::search(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Checkpoint search failed");
            return Err(SearchIndexError::search(format!(
                "Checkpoint search failed with status {}: {}",
                status, error_body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;

        let hits = body["hits"]["hits"]
            .as_array()
            .ok_or_else(|| SearchIndexError::parse("response has no hits array"))?;

        let Some(hit) = hits.first() else {
            debug!(index = %self.index_config.name, "Index is empty, no checkpoint");
            return Ok(None);
        };

        let source = hit
            .get("_source")
            .cloned()
            .ok_or_else(|| SearchIndexError::parse("top hit has no _source"))?;

        let last: LastDocument = serde_json::from_value(source)
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;

        debug!(
            next_stream_position = %last.next_stream_position,
            created_at = %last.created_at,
            "Recovered checkpoint from latest document"
        );
        Ok(Some(last))
    }
}
