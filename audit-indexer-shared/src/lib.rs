//! # Audit Indexer Shared
//!
//! This crate defines shared data structures and types used across the audit
//! event indexer ecosystem: the raw event records pulled from the upstream
//! audit-log feed and the normalized documents written to the search index.

pub mod types;

pub use types::audit_document::{AuditDocument, DocumentActor, TIMESTAMP_FORMAT};
pub use types::audit_event::{AuditEvent, EventActor, EventBatch};
