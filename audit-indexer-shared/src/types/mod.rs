//! Shared type definitions for the audit event indexer.

pub mod audit_document;
pub mod audit_event;
