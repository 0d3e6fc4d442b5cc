//! Storage Error Types
//!
//! This module defines all error types that can occur during storage operations.
//!
//! ## Error Categories
//!
//! ### Lookup Errors
//! - `NotFound`: Read of a blob or table path that does not exist
//! - `InvalidPath`: Absolute paths or `..` segments that would leave the store
//!
//! ### Write Errors
//! - `WriteFailure`: A table or blob write failed inside a batch. Carries the
//!   table (or blob path) and the batch id. Tables written earlier in the same
//!   batch stay on disk; callers reconcile by batch id.
//! - `BatchExists`: A table file for this batch timestamp is already present
//! - `SchemaMismatch`: A row set does not fit its fixed schema, or a requested
//!   column does not exist. Raised before any bytes of the table are committed.
//!
//! ### Query Errors
//! - `QueryEngineDisabled`: Query requested on a storage without an engine
//! - `Query`: The SQL engine rejected or failed the statement
//!
//! ### Recoverable Errors
//! - `DateParseFailure`: `publication_date` is not `YYYY-MM-DD`. The batch
//!   writer recovers from it by partitioning on the current date.
//!
//! ### Backend Errors
//! - `Io` / `ObjectStore`: Low-level failures, always with the path involved
//! - `Timeout`: A backend or query operation exceeded its deadline
//!
//! ## Usage
//!
//! All storage operations return `Result<T>` which is aliased to
//! `Result<T, Error>`. This allows clean error propagation with `?`.

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not found: {path}")]
    NotFound { path: String },

    #[error("Invalid storage path: '{path}'")]
    InvalidPath { path: String },

    #[error("Write of '{target}' failed in batch {batch_id}: {source}")]
    WriteFailure {
        target: String,
        batch_id: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Batch file already exists: {path}")]
    BatchExists { path: String },

    #[error("Schema mismatch for table '{table}': {reason}")]
    SchemaMismatch { table: String, reason: String },

    #[error("Query engine is not enabled")]
    QueryEngineDisabled,

    #[error("Invalid publication date '{value}' (expected YYYY-MM-DD)")]
    DateParseFailure { value: String },

    #[error("{operation} on '{path}' timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        path: String,
        after: Duration,
    },

    #[error("IO error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Object store error on '{path}': {source}")]
    ObjectStore {
        path: String,
        #[source]
        source: object_store::Error,
    },

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Query error: {0}")]
    Query(#[from] datafusion::error::DataFusionError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound { path }
        } else {
            Error::Io { path, source }
        }
    }

    pub(crate) fn object_store(path: impl Into<String>, source: object_store::Error) -> Self {
        let path = path.into();
        match source {
            object_store::Error::NotFound { .. } => Error::NotFound { path },
            source => Error::ObjectStore { path, source },
        }
    }

    /// Attach batch context to a failed table or blob write.
    pub(crate) fn write_failure(
        target: impl Into<String>,
        batch_id: impl Into<String>,
        source: Error,
    ) -> Self {
        Error::WriteFailure {
            target: target.into(),
            batch_id: batch_id.into(),
            source: Box::new(source),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_not_found_maps_to_not_found() {
        let err = Error::io(
            "content/ab/cd/x.bin",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Not found: content/ab/cd/x.bin");
    }

    #[test]
    fn test_io_other_kept() {
        let err = Error::io(
            "gazettes/batch_1.parquet",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_write_failure_carries_batch_context() {
        let err = Error::write_failure(
            "articles",
            "batch_20240305_101500",
            Error::NotFound {
                path: "x".to_string(),
            },
        );
        let msg = err.to_string();
        assert!(msg.contains("articles"));
        assert!(msg.contains("batch_20240305_101500"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
