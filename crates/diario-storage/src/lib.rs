//! Diario Storage Layer
//!
//! This crate persists gazette editions and their articles, as produced by the
//! crawler, into an append-only set of Parquet files, and answers filtered SQL
//! queries over them.
//!
//! ## What is the Storage Layer?
//!
//! The storage layer sits between the crawler and whatever analyzes the
//! gazettes. It handles:
//!
//! 1. **Batch Writing**: Mapping editions into three related tables (editions,
//!    articles, relationships), one Parquet file each per batch
//! 2. **Content Addressing**: Storing long article bodies once per SHA-256
//!    digest instead of repeating them in every row
//! 3. **Backends**: The same write path on a local directory, S3/MinIO, or memory
//! 4. **Querying**: Parameterized SQL over every stored article table via DataFusion
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────┐
//! │   Crawler   │
//! └──────┬──────┘
//!        │ GazetteEdition[]
//!        ▼
//! ┌──────────────────┐      long bodies      ┌──────────────────┐
//! │   BatchWriter    │ ────────────────────► │   ContentStore   │
//! │ - edition_hash   │                       │ - sha256 paths   │
//! │ - inline policy  │                       │ - write once     │
//! └────────┬─────────┘                       └────────┬─────────┘
//!          │ RecordBatch × 3                          │ bytes
//!          ▼                                          ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                  StorageBackend (local | object store)       │
//! └────────────────────────────┬─────────────────────────────────┘
//!                              │ file locators
//!                              ▼
//!                     ┌──────────────────┐
//!                     │   QueryEngine    │
//!                     │   (DataFusion)   │
//!                     └──────────────────┘
//! ```
//!
//! ## File Layout
//!
//! ```text
//! gazettes/batch_20240305_101500.parquet
//! articles/batch_20240305_101500.parquet
//! relationships/batch_20240305_101500.parquet
//! content/3a/7b/3a7b...e1.bin
//! content/3a/7b/3a7b...e1.bin.meta.json
//! ```
//!
//! ## Usage Example
//!
//! ```ignore
//! use diario_storage::{ArticleFilter, GazetteStorage, SaveOptions, StorageConfig};
//!
//! let storage = GazetteStorage::from_config(&StorageConfig::local("data/raw"))?;
//!
//! let stats = storage
//!     .save_editions(&editions, SaveOptions::for_municipality("sao-paulo"))
//!     .await?;
//! println!("{} articles in {}", stats.articles, stats.batch_id);
//!
//! let html = storage
//!     .query_articles(ArticleFilter::default().content_type("html"), Some(50))
//!     .await?;
//! ```
//!
//! ## Design Decisions
//!
//! ### Why Content Addressing?
//! - **Deduplication**: Republished acts share one blob
//! - **Immutability**: A blob path never changes meaning, so it never needs updating
//! - **Small tables**: Article tables stay cheap to scan when bodies are large
//!
//! ### Why No Cross-Table Transactions?
//! Each batch writes three independent files. A failure part way leaves the
//! earlier files in place; every row carries `batch_id` so downstream readers
//! can reconcile incomplete batches.

pub mod backend;
pub mod config;
pub mod content;
pub mod error;
pub mod manager;
pub mod partition;
pub mod query;
pub mod rows;
pub mod writer;

pub use backend::{
    LocalBackend, ObjectStoreBackend, StorageBackend, TableCompression, TableWriteOptions,
};
pub use config::{BackendConfig, S3Config, StorageConfig};
pub use content::{content_path, ContentBlob, ContentStore};
pub use error::{Error, Result};
pub use manager::{GazetteStorage, StorageOptions, StorageStats};
pub use partition::{date_partition, parse_publication_date, Granularity};
pub use query::{ArticleFilter, ArticleQuery, DataFusionEngine, QueryEngine};
pub use rows::edition_hash;
pub use writer::{BatchWriter, SaveOptions, SaveStats};
