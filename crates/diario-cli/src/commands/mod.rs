//! Command handlers for diario
//!
//! This module contains handlers for the storage commands:
//! - Ingest: Save crawler output as a new batch
//! - Query: Filter stored articles
//! - Inspect: Read blobs back and count stored files

pub mod ingest;
pub mod inspect;
pub mod query;

// Re-export for convenience
pub use ingest::IngestArgs;
pub use inspect::ContentArgs;
pub use query::QueryArgs;
