//! Event transformer: normalizes raw audit events into index documents.
//!
//! Pure except for logging. The only event-type-specific handling is the
//! metadata-instance quirk: for `METADATA_INSTANCE_CREATE` and
//! `METADATA_INSTANCE_UPDATE` the upstream feed delivers
//! `additional_details.metadata.operationParams` as a string-encoded JSON
//! array, which is parsed back into a structured array here.

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::errors::IngestError;
use audit_indexer_shared::{AuditDocument, AuditEvent, DocumentActor, TIMESTAMP_FORMAT};

/// Event types whose `additional_details` carry the string-encoded
/// `operationParams` payload.
const METADATA_INSTANCE_TYPES: [&str; 2] = ["METADATA_INSTANCE_CREATE", "METADATA_INSTANCE_UPDATE"];

/// Transforms raw audit events into search documents.
pub struct EventTransformer;

impl EventTransformer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize one raw event into an [`AuditDocument`].
    ///
    /// `next_stream_position` is left empty; the scheduler stamps it from
    /// the owning batch before the document is written.
    ///
    /// # Errors
    ///
    /// A malformed metadata payload fails this single event; the caller
    /// drops it and continues with the rest of the batch.
    pub fn transform(&self, event: &AuditEvent) -> Result<AuditDocument, IngestError> {
        debug!(event_id = %event.id, event_type = %event.event_type, "Transforming event");

        let source = event.source.clone().unwrap_or_else(|| json!({}));
        let additional_details = event.additional_details.clone().unwrap_or_else(|| json!({}));

        let additional_details = if is_metadata_instance(&event.event_type) {
            rebuild_metadata_details(&additional_details)?
        } else {
            additional_details
        };

        Ok(AuditDocument {
            id: event.id.clone(),
            event_type: event.event_type.clone(),
            created_at: event.created_at.format(TIMESTAMP_FORMAT).to_string(),
            ip_address: event.ip_address.clone(),
            created_by: DocumentActor {
                login: event.created_by.login.clone(),
                name: event.created_by.name.clone(),
            },
            source,
            additional_details,
            next_stream_position: String::new(),
        })
    }
}

impl Default for EventTransformer {
    fn default() -> Self {
        Self::new()
    }
}

fn is_metadata_instance(event_type: &str) -> bool {
    METADATA_INSTANCE_TYPES
        .iter()
        .any(|t| t.eq_ignore_ascii_case(event_type))
}

/// Rebuild `additional_details` for metadata-instance events.
///
/// The incoming shape is `{ "metadata": { "type": ..., "operationParams":
/// "<json array as string>", ... } }`; the result is `{ "type": ...,
/// "operationParams": [...] }` with every other metadata sibling discarded.
fn rebuild_metadata_details(details: &Value) -> Result<Value, IngestError> {
    let metadata = details
        .get("metadata")
        .ok_or_else(|| IngestError::transform("metadata event without metadata object"))?;

    let raw_params = metadata
        .get("operationParams")
        .and_then(Value::as_str)
        .ok_or_else(|| IngestError::transform("metadata.operationParams is not a string"))?;

    let params: Value = serde_json::from_str(raw_params)
        .map_err(|e| IngestError::transform(format!("unparseable operationParams: {}", e)))?;
    if !params.is_array() {
        return Err(IngestError::transform(
            "operationParams did not decode to an array",
        ));
    }

    let mut rebuilt = Map::new();
    rebuilt.insert(
        "type".to_string(),
        metadata.get("type").cloned().unwrap_or(Value::Null),
    );
    rebuilt.insert("operationParams".to_string(), params);
    Ok(Value::Object(rebuilt))
}
