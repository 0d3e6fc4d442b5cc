//! Batch Writer
//!
//! Turns crawler editions into the three tables of one batch.
//!
//! ## Write Flow
//!
//! ```text
//! save(editions)
//!     ↓
//! empty? ──YES──→ zero stats, nothing written
//!     ↓
//! batch files already present? ──YES──→ BatchExists
//!     ↓
//! per edition:  edition_hash, publication_date → year/month/day
//! per article:  body ≤ inline_threshold chars → inline_text
//!               otherwise                     → ContentStore.put()
//!     ↓
//! rows → RecordBatch × 3          ← SchemaMismatch raised here
//!     ↓
//! gazettes/batch_<ts>.parquet
//! articles/batch_<ts>.parquet
//! relationships/batch_<ts>.parquet
//! ```
//!
//! ## Failure Semantics
//!
//! The three tables are written one after another with no rollback. When a
//! later table fails, earlier tables of the same batch stay in place and the
//! returned `WriteFailure` names the table and the batch id. Blobs stored
//! before the failure also stay; they are content-addressed and get reused
//! by the next attempt.
//!
//! ## Usage
//!
//! ```ignore
//! use diario_storage::{BatchWriter, SaveOptions};
//!
//! let writer = BatchWriter::new(backend).with_inline_threshold(2000);
//! let stats = writer
//!     .save(&editions, SaveOptions::for_municipality("sao-paulo"))
//!     .await?;
//! println!("{} articles in {}", stats.articles, stats.batch_id);
//! ```

use chrono::{DateTime, Utc};
use diario_contract::{Article, GazetteEdition, RawContent};
use serde::Serialize;
use std::sync::Arc;

use crate::backend::{StorageBackend, TableWriteOptions};
use crate::content::ContentStore;
use crate::error::{Error, Result};
use crate::partition::{date_partition, parse_publication_date, DateParts, Granularity};
use crate::rows::{
    articles_batch, edition_hash, editions_batch, relationships_batch, ArticleRow, EditionRow,
    RelationshipRow, StoredBody,
};

/// Directory of the editions table.
pub const EDITIONS_DIR: &str = "gazettes";
/// Directory of the articles table.
pub const ARTICLES_DIR: &str = "articles";
/// Directory of the relationships table.
pub const RELATIONSHIPS_DIR: &str = "relationships";

/// Default maximum length (in characters) of an inline article body.
pub const DEFAULT_INLINE_THRESHOLD: usize = 2000;

/// Format of the timestamp in batch ids and table file names.
const BATCH_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Per-call options for [`BatchWriter::save`].
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// Explicit batch id; defaults to `batch_<yyyyMMdd_HHmmss>`.
    ///
    /// Only the `batch_id` column uses it. Table files are always named after
    /// `timestamp`, so two saves within the same second collide with
    /// `BatchExists` even when their batch ids differ; pin distinct
    /// timestamps in that case.
    pub batch_id: Option<String>,

    /// Stamped on every row (default: empty)
    pub municipality: String,

    /// Batch clock; defaults to now
    pub timestamp: Option<DateTime<Utc>>,
}

impl SaveOptions {
    pub fn for_municipality(municipality: impl Into<String>) -> Self {
        Self {
            municipality: municipality.into(),
            ..Default::default()
        }
    }

    pub fn with_batch_id(mut self, batch_id: impl Into<String>) -> Self {
        self.batch_id = Some(batch_id.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Outcome of one [`BatchWriter::save`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveStats {
    pub municipality: String,
    pub editions: usize,
    pub articles: usize,
    pub relationships: usize,
    pub timestamp: DateTime<Utc>,
    pub batch_id: String,
}

/// Decide whether a body stays in its row.
///
/// Returns the text to inline, or `None` when the body must go to the content
/// store: bytes that are not valid UTF-8, or text longer than `threshold`
/// characters. A body of exactly `threshold` characters is inlined.
pub fn inline_body(bytes: &[u8], threshold: usize) -> Option<&str> {
    let text = std::str::from_utf8(bytes).ok()?;
    (text.chars().count() <= threshold).then_some(text)
}

fn body_bytes(article: &Article) -> &[u8] {
    match &article.content.raw_content {
        Some(RawContent::Text(text)) => text.as_bytes(),
        Some(RawContent::Bytes(bytes)) => bytes,
        None => &[],
    }
}

/// The three row sets of a batch.
#[derive(Debug, Default)]
struct BatchRows {
    editions: Vec<EditionRow>,
    articles: Vec<ArticleRow>,
    relationships: Vec<RelationshipRow>,
}

/// Writes editions as batches of Parquet tables.
#[derive(Debug, Clone)]
pub struct BatchWriter {
    backend: Arc<dyn StorageBackend>,
    content: ContentStore,
    inline_threshold: usize,
    partition_by: Granularity,
    table_options: TableWriteOptions,
}

impl BatchWriter {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            content: ContentStore::new(backend.clone()),
            backend,
            inline_threshold: DEFAULT_INLINE_THRESHOLD,
            partition_by: Granularity::default(),
            table_options: TableWriteOptions::default(),
        }
    }

    pub fn with_inline_threshold(mut self, threshold: usize) -> Self {
        self.inline_threshold = threshold;
        self
    }

    pub fn with_partition_by(mut self, granularity: Granularity) -> Self {
        self.partition_by = granularity;
        self
    }

    pub fn with_table_options(mut self, options: TableWriteOptions) -> Self {
        self.table_options = options;
        self
    }

    pub fn content_store(&self) -> &ContentStore {
        &self.content
    }

    /// Persist `editions` as one batch.
    ///
    /// # Errors
    ///
    /// - `BatchExists` if a table file for this batch timestamp exists. File
    ///   names come from the timestamp alone, never from an explicit batch id.
    /// - `SchemaMismatch` if a row set does not fit its schema (nothing written)
    /// - `WriteFailure` if a blob or table write fails; earlier tables stay
    #[tracing::instrument(
        skip(self, editions, options),
        fields(
            backend = self.backend.name(),
            editions = editions.len(),
            batch_id = tracing::field::Empty
        )
    )]
    pub async fn save(&self, editions: &[GazetteEdition], options: SaveOptions) -> Result<SaveStats> {
        let timestamp = options.timestamp.unwrap_or_else(Utc::now);
        let stamp = timestamp.format(BATCH_TIMESTAMP_FORMAT).to_string();
        let batch_id = options
            .batch_id
            .unwrap_or_else(|| format!("batch_{}", stamp));
        tracing::Span::current().record("batch_id", batch_id.as_str());

        let mut stats = SaveStats {
            municipality: options.municipality,
            editions: 0,
            articles: 0,
            relationships: 0,
            timestamp,
            batch_id,
        };

        if editions.is_empty() {
            tracing::warn!("No editions to save");
            return Ok(stats);
        }

        let targets = [EDITIONS_DIR, ARTICLES_DIR, RELATIONSHIPS_DIR]
            .map(|dir| (dir, format!("{}/batch_{}.parquet", dir, stamp)));
        for (_, path) in &targets {
            if self.backend.exists(path).await? {
                return Err(Error::BatchExists { path: path.clone() });
            }
        }

        let rows = self
            .map_rows(editions, &stats.municipality, &stats.batch_id, timestamp)
            .await?;

        let batches = [
            editions_batch(&rows.editions)?,
            articles_batch(&rows.articles)?,
            relationships_batch(&rows.relationships)?,
        ];

        for ((table, path), batch) in targets.iter().zip(batches.iter()) {
            if batch.num_rows() == 0 {
                continue;
            }

            if let Err(e) = self
                .backend
                .write_table(path, batch, &self.table_options)
                .await
            {
                tracing::error!(
                    table = %table,
                    path = %path,
                    batch_id = %stats.batch_id,
                    error = %e,
                    "Failed to write table"
                );
                return Err(Error::write_failure(*table, stats.batch_id.clone(), e));
            }

            tracing::info!(
                table = %table,
                rows = batch.num_rows(),
                path = %path,
                batch_id = %stats.batch_id,
                "Wrote table"
            );
        }

        stats.editions = rows.editions.len();
        stats.articles = rows.articles.len();
        stats.relationships = rows.relationships.len();
        Ok(stats)
    }

    async fn map_rows(
        &self,
        editions: &[GazetteEdition],
        municipality: &str,
        batch_id: &str,
        processed_at: DateTime<Utc>,
    ) -> Result<BatchRows> {
        let mut rows = BatchRows::default();
        let processed_at_text = processed_at.to_rfc3339();

        for edition in editions {
            let meta = &edition.metadata;
            let hash = edition_hash(
                &meta.edition_id,
                &meta.publication_date,
                edition.article_count(),
            );

            let publication_date = match parse_publication_date(&meta.publication_date) {
                Ok(date) => Some(date),
                Err(e) => {
                    tracing::warn!(
                        edition_id = %meta.edition_id,
                        error = %e,
                        "Unparseable publication date, partitioning by current date"
                    );
                    None
                }
            };
            let partition_date = publication_date.unwrap_or_else(|| processed_at.date_naive());
            let partition = DateParts::from(partition_date);

            tracing::debug!(
                edition_id = %meta.edition_id,
                partition = %date_partition(partition_date, self.partition_by),
                articles = edition.article_count(),
                "Mapping edition"
            );

            rows.editions.push(EditionRow {
                municipality: municipality.to_string(),
                edition_id: meta.edition_id.clone(),
                publication_date,
                edition_number: meta.edition_number,
                supplement: meta.supplement,
                edition_type_id: meta.edition_type_id,
                edition_type_name: meta.edition_type_name.clone(),
                pdf_url: meta.pdf_url.clone(),
                total_articles: edition.article_count() as i64,
                processed_at,
                edition_hash: hash.clone(),
                batch_id: batch_id.to_string(),
                partition,
            });

            for article in &edition.articles {
                let article_meta = &article.metadata;
                let bytes = body_bytes(article);
                let body = self.place_body(bytes, batch_id).await?;

                rows.articles.push(ArticleRow {
                    municipality: municipality.to_string(),
                    article_id: article_meta.article_id.clone(),
                    edition_id: article_meta.edition_id.clone(),
                    edition_hash: hash.clone(),
                    publication_date,
                    title: article_meta.title.clone().unwrap_or_default(),
                    hierarchy_path: serde_json::to_string(&article_meta.hierarchy_path)?,
                    identifier: article_meta.identifier.clone().unwrap_or_default(),
                    protocol: article_meta.protocol.clone().unwrap_or_default(),
                    depth: article_meta.hierarchy_path.len() as i32,
                    content_type: article.content.content_type.as_str().to_string(),
                    content_size: bytes.len() as i64,
                    body,
                    processed_at,
                    batch_id: batch_id.to_string(),
                    partition,
                });

                rows.relationships.push(RelationshipRow {
                    municipality: municipality.to_string(),
                    edition_id: meta.edition_id.clone(),
                    article_id: article_meta.article_id.clone(),
                    edition_hash: hash.clone(),
                    publication_date: meta.publication_date.clone(),
                    batch_id: batch_id.to_string(),
                    processed_at: processed_at_text.clone(),
                });
            }
        }

        Ok(rows)
    }

    async fn place_body(&self, bytes: &[u8], batch_id: &str) -> Result<StoredBody> {
        if let Some(text) = inline_body(bytes, self.inline_threshold) {
            return Ok(StoredBody::Inline(text.to_string()));
        }

        let blob = self.content.put(bytes).await.map_err(|e| {
            tracing::error!(batch_id = %batch_id, error = %e, "Failed to store article body");
            Error::write_failure("content", batch_id, e)
        })?;
        Ok(StoredBody::Blob(blob))
    }
}
