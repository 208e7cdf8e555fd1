//! Raw audit event types from the upstream enterprise event feed.
//!
//! These records mirror the admin-logs wire shape and are never mutated;
//! the transformer produces a separate [`crate::AuditDocument`] from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The user that triggered an audit event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventActor {
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// One immutable audit event record from the source feed.
///
/// `source` and `additional_details` are opaque structured payloads whose
/// shape depends on `event_type`; they are carried through as raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    #[serde(rename = "event_id")]
    pub id: String,
    pub event_type: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub created_by: EventActor,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub source: Option<Value>,
    #[serde(default)]
    pub additional_details: Option<Value>,
}

/// An ordered chunk of audit events plus the opaque resume tokens around it.
///
/// Cursor ordering is total: `next_cursor` resumes strictly after every
/// event contained in the batch.
#[derive(Debug, Clone, PartialEq)]
pub struct EventBatch {
    pub events: Vec<AuditEvent>,
    pub current_cursor: String,
    pub next_cursor: String,
    pub size: usize,
}

impl EventBatch {
    /// Create an empty batch that leaves the cursor where it was.
    pub fn empty(cursor: impl Into<String>) -> Self {
        let cursor = cursor.into();
        Self {
            events: Vec::new(),
            current_cursor: cursor.clone(),
            next_cursor: cursor,
            size: 0,
        }
    }
}
