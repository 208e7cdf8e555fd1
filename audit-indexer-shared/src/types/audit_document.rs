//! Normalized document types for the search index.
//!
//! An [`AuditDocument`] is the unit written to the search index and also the
//! unit read back on startup to recover the resume position: the document
//! carries `next_stream_position`, so the most recently indexed document *is*
//! the checkpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Render format for `created_at`: ISO-8601 without a timezone suffix, at
/// millisecond precision. Also used when parsing the field back during
/// cursor recovery.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// The actor subdocument as stored in the index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentActor {
    pub login: Option<String>,
    pub name: Option<String>,
}

/// Flat document representation of one audit event, ready for indexing.
///
/// `source` and `additional_details` are always present as structured
/// objects (empty `{}` when the upstream event omitted them, never null).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditDocument {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub created_at: String,
    pub ip_address: Option<String>,
    pub created_by: DocumentActor,
    pub source: Value,
    pub additional_details: Value,
    /// The feed cursor that resumes strictly after this event. Stamped by
    /// the scheduler from the owning batch before the document is written.
    pub next_stream_position: String,
}
