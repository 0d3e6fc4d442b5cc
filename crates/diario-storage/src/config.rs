//! Storage Configuration
//!
//! This module defines configuration for [`GazetteStorage`](crate::GazetteStorage).
//!
//! ## StorageConfig
//!
//! - **backend**: Where files live: a local directory, an S3-compatible bucket,
//!   or memory (default: local `data/raw`)
//! - **partition_by**: Date partition granularity used when logging edition
//!   placement (default: day)
//! - **inline_threshold**: Article bodies up to this many characters are kept in
//!   the row; longer bodies go to the content store (default: 2000)
//! - **enable_query_engine**: Create a DataFusion session for SQL queries
//!   (default: true)
//! - **operation_timeout_ms**: Deadline for each object store call (default: 30s)
//! - **query_timeout_ms**: Deadline for one SQL query (default: 60s)
//! - **compression_level**: Zstd level for Parquet tables (default: 9)
//!
//! ## Usage
//!
//! ```ignore
//! use diario_storage::{BackendConfig, S3Config, StorageConfig};
//!
//! // Local directory
//! let config = StorageConfig::default();
//!
//! // MinIO
//! let config = StorageConfig {
//!     backend: BackendConfig::S3(S3Config {
//!         bucket: "gazettes".to_string(),
//!         region: "us-east-1".to_string(),
//!         endpoint: Some("http://minio:9000".to_string()),
//!         prefix: None,
//!         allow_http: true,
//!     }),
//!     ..Default::default()
//! };
//! ```
//!
//! Configurations are usually loaded from TOML:
//!
//! ```toml
//! partition_by = "month"
//! enable_query_engine = true
//!
//! [backend]
//! kind = "s3"
//! bucket = "gazettes"
//! region = "us-east-1"
//! endpoint = "http://localhost:9000"
//! allow_http = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::partition::Granularity;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub partition_by: Granularity,

    /// Maximum article length (in characters) stored inline (default: 2000)
    #[serde(default = "default_inline_threshold")]
    pub inline_threshold: usize,

    #[serde(default = "default_enable_query_engine")]
    pub enable_query_engine: bool,

    /// Object store operation timeout in milliseconds (default: 30s)
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,

    /// SQL query timeout in milliseconds (default: 60s)
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    /// Zstd compression level for Parquet tables (default: 9)
    #[serde(default = "default_compression_level")]
    pub compression_level: i32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            partition_by: Granularity::default(),
            inline_threshold: default_inline_threshold(),
            enable_query_engine: default_enable_query_engine(),
            operation_timeout_ms: default_operation_timeout_ms(),
            query_timeout_ms: default_query_timeout_ms(),
            compression_level: default_compression_level(),
        }
    }
}

impl StorageConfig {
    /// Local storage rooted at `base_path`, everything else default.
    pub fn local(base_path: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendConfig::Local {
                base_path: base_path.into(),
            },
            ..Default::default()
        }
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

/// Physical location of the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    Local { base_path: PathBuf },
    S3(S3Config),
    Memory,
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Local {
            base_path: PathBuf::from(default_base_path()),
        }
    }
}

/// S3 / MinIO bucket settings. Credentials come from the standard AWS
/// environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    pub bucket: String,

    #[serde(default = "default_region")]
    pub region: String,

    /// Optional custom endpoint (for MinIO/localstack)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Optional key prefix inside the bucket
    #[serde(default)]
    pub prefix: Option<String>,

    #[serde(default)]
    pub allow_http: bool,
}

fn default_base_path() -> &'static str {
    "data/raw"
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_inline_threshold() -> usize {
    2000
}

fn default_enable_query_engine() -> bool {
    true
}

fn default_operation_timeout_ms() -> u64 {
    30_000
}

fn default_query_timeout_ms() -> u64 {
    60_000
}

fn default_compression_level() -> i32 {
    9
}
