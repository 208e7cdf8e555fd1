//! Read-back types for cursor recovery.

use serde::Deserialize;

/// The checkpoint-bearing fields of the most recently indexed document.
///
/// Every indexed document carries the stream position that resumes after it,
/// so the top hit of a `created_at`-descending search is the checkpoint.
/// `created_at` is kept as the raw string; interpreting it is the cursor
/// resolver's concern.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LastDocument {
    pub next_stream_position: String,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_from_hit_source() {
        let source = serde_json::json!({
            "id": "evt-9",
            "type": "UPLOAD",
            "created_at": "2024-03-01T10:02:41.588",
            "next_stream_position": "1152922976252290800",
            "additional_details": {}
        });

        let doc: LastDocument = serde_json::from_value(source).unwrap();
        assert_eq!(doc.next_stream_position, "1152922976252290800");
        assert_eq!(doc.created_at, "2024-03-01T10:02:41.588");
    }
}
