//! Gazette Storage
//!
//! `GazetteStorage` is the main entry point of the crate. It owns one storage
//! backend and wires everything else on top of it:
//!
//! ```text
//! GazetteStorage
//!     │
//!     ├─ backend: Arc<dyn StorageBackend>     (local dir, S3/MinIO, memory)
//!     │
//!     ├─ BatchWriter
//!     │    └─ ContentStore                    (content/xx/yy/<sha256>.bin)
//!     │
//!     └─ query engine: Option<Arc<dyn QueryEngine>>
//! ```
//!
//! ## Thread Safety
//!
//! `GazetteStorage` is Send + Sync and can be shared via `Arc`. Saves do not
//! coordinate with each other beyond the `BatchExists` check; queries are
//! serialized inside the engine.
//!
//! ## Usage
//!
//! ```ignore
//! use diario_storage::{ArticleFilter, GazetteStorage, SaveOptions, StorageConfig};
//!
//! let storage = GazetteStorage::from_config(&StorageConfig::local("data/raw"))?;
//!
//! let stats = storage
//!     .save_editions(&editions, SaveOptions::for_municipality("sao-paulo"))
//!     .await?;
//!
//! let batch = storage
//!     .query_articles(ArticleFilter::default().content_type("html"), Some(100))
//!     .await?;
//! ```

use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use diario_contract::schema::articles_schema;
use diario_contract::GazetteEdition;
use serde::Serialize;
use std::sync::Arc;

use crate::backend::{LocalBackend, ObjectStoreBackend, StorageBackend, TableWriteOptions};
use crate::config::{BackendConfig, StorageConfig};
use crate::content::{BLOB_SUFFIX, CONTENT_DIRNAME};
use crate::error::{Error, Result};
use crate::partition::Granularity;
use crate::query::{ArticleFilter, ArticleQuery, DataFusionEngine, QueryEngine};
use crate::writer::{
    BatchWriter, SaveOptions, SaveStats, ARTICLES_DIR, DEFAULT_INLINE_THRESHOLD, EDITIONS_DIR,
};

const TABLE_SUFFIX: &str = ".parquet";

/// Construction options for [`GazetteStorage::new`].
#[derive(Debug, Clone)]
pub struct StorageOptions {
    pub inline_threshold: usize,
    pub partition_by: Granularity,
    pub table_options: TableWriteOptions,
    /// `None` disables [`GazetteStorage::query_articles`]
    pub query_engine: Option<Arc<dyn QueryEngine>>,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            inline_threshold: DEFAULT_INLINE_THRESHOLD,
            partition_by: Granularity::default(),
            table_options: TableWriteOptions::default(),
            query_engine: None,
        }
    }
}

/// File counts per kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    pub backend: String,
    pub editions_files: usize,
    pub articles_files: usize,
    pub content_files: usize,
}

#[derive(Debug, Clone)]
pub struct GazetteStorage {
    backend: Arc<dyn StorageBackend>,
    writer: BatchWriter,
    query_engine: Option<Arc<dyn QueryEngine>>,
}

impl GazetteStorage {
    pub fn new(backend: Arc<dyn StorageBackend>, options: StorageOptions) -> Self {
        let writer = BatchWriter::new(backend.clone())
            .with_inline_threshold(options.inline_threshold)
            .with_partition_by(options.partition_by)
            .with_table_options(options.table_options);

        tracing::info!(
            backend = backend.name(),
            inline_threshold = options.inline_threshold,
            query_engine = options.query_engine.is_some(),
            "Gazette storage ready"
        );

        Self {
            backend,
            writer,
            query_engine: options.query_engine,
        }
    }

    /// Build the backend and (when enabled) the DataFusion engine described by
    /// `config`.
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        let backend: Arc<dyn StorageBackend> = match &config.backend {
            BackendConfig::Local { base_path } => Arc::new(LocalBackend::new(base_path)?),
            BackendConfig::S3(s3) => Arc::new(ObjectStoreBackend::s3(s3, config.operation_timeout())?),
            BackendConfig::Memory => {
                Arc::new(ObjectStoreBackend::in_memory(config.operation_timeout())?)
            }
        };

        let query_engine = if config.enable_query_engine {
            let mut engine = DataFusionEngine::new(config.query_timeout());
            if let Some((url, store)) = backend.query_store() {
                engine = engine.with_object_store(&url, store);
            }
            Some(Arc::new(engine) as Arc<dyn QueryEngine>)
        } else {
            None
        };

        let options = StorageOptions {
            inline_threshold: config.inline_threshold,
            partition_by: config.partition_by,
            table_options: TableWriteOptions::zstd(config.compression_level),
            query_engine,
        };
        Ok(Self::new(backend, options))
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    pub fn query_engine(&self) -> Option<&Arc<dyn QueryEngine>> {
        self.query_engine.as_ref()
    }

    /// Persist editions as one batch. See [`BatchWriter::save`].
    pub async fn save_editions(
        &self,
        editions: &[GazetteEdition],
        options: SaveOptions,
    ) -> Result<SaveStats> {
        self.writer.save(editions, options).await
    }

    /// Articles matching `filter` across every stored batch.
    ///
    /// Returns an empty batch with the article schema when nothing has been
    /// saved yet.
    #[tracing::instrument(skip(self, filter))]
    pub async fn query_articles(
        &self,
        filter: ArticleFilter,
        limit: Option<usize>,
    ) -> Result<RecordBatch> {
        let engine = self.query_engine.as_ref().ok_or(Error::QueryEngineDisabled)?;

        let files = self
            .backend
            .list_files(ARTICLES_DIR, Some(TABLE_SUFFIX))
            .await?;
        if files.is_empty() {
            tracing::debug!("No article tables to query");
            return Ok(RecordBatch::new_empty(articles_schema()));
        }

        let sources: Vec<String> = files.iter().map(|f| self.backend.get_uri(f)).collect();
        engine
            .execute(&sources, &ArticleQuery::new(filter, limit))
            .await
    }

    /// Raw bytes of a stored article body, by its `content_path`.
    pub async fn get_content(&self, content_path: &str) -> Result<Bytes> {
        self.writer.content_store().get(content_path).await
    }

    pub async fn stats(&self) -> Result<StorageStats> {
        let editions_files = self
            .backend
            .list_files(EDITIONS_DIR, Some(TABLE_SUFFIX))
            .await?
            .len();
        let articles_files = self
            .backend
            .list_files(ARTICLES_DIR, Some(TABLE_SUFFIX))
            .await?
            .len();
        let content_files = self
            .backend
            .list_files(CONTENT_DIRNAME, Some(BLOB_SUFFIX))
            .await?
            .len();

        Ok(StorageStats {
            backend: self.backend.name().to_string(),
            editions_files,
            articles_files,
            content_files,
        })
    }
}
