//! OpenSearch index configuration and mappings.
//!
//! This module defines the index settings and mappings for the audit event
//! search index.

use serde_json::{json, Value};

/// Configuration for the audit event search index.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// The index name (used for all operations).
    pub name: String,
    /// Number of primary shards.
    pub num_shards: u32,
    /// Number of replicas.
    pub num_replicas: u32,
}

impl IndexConfig {
    /// Create a new index configuration.
    pub fn new(name: impl Into<String>, num_shards: u32, num_replicas: u32) -> Self {
        Self {
            name: name.into(),
            num_shards,
            num_replicas,
        }
    }
}

/// Default name of the audit event search index.
pub const INDEX_NAME: &str = "box_enterprise_events";

/// Get the index settings and mappings for the audit event index.
///
/// The mapping mirrors the normalized document shape:
/// - `created_at` is a `date` accepting the millisecond render format and a
///   bare date (documents written by older deployments carried the latter)
/// - ids, event type, stream position and actor login are `keyword` fields
///   for exact lookups; the actor name is analyzed `text`
/// - `source` and `additional_details` stay dynamic objects since their
///   shape is event-type dependent
pub fn get_index_settings(config: &IndexConfig) -> Value {
    json!({
        "settings": {
            "number_of_shards": config.num_shards,
            "number_of_replicas": config.num_replicas
        },
        "mappings": {
            "properties": {
                "id": {
                    "type": "keyword"
                },
                "type": {
                    "type": "keyword"
                },
                "created_at": {
                    "type": "date",
                    "format": "yyyy-MM-dd'T'HH:mm:ss.SSS||yyyy-MM-dd"
                },
                "ip_address": {
                    "type": "keyword"
                },
                "created_by": {
                    "properties": {
                        "login": {
                            "type": "keyword"
                        },
                        "name": {
                            "type": "text"
                        }
                    }
                },
                "source": {
                    "type": "object",
                    "dynamic": true
                },
                "additional_details": {
                    "type": "object",
                    "dynamic": true
                },
                "next_stream_position": {
                    "type": "keyword"
                }
            }
        }
    })
}
