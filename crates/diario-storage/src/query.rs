//! Article queries over the stored Parquet files.
//!
//! Queries go through two pieces:
//!
//! - [`ArticleQuery`] turns an [`ArticleFilter`] into SQL text with `$n`
//!   placeholders plus the values bound to them. Filter values never appear
//!   in the SQL text, so a municipality named `x' OR '1'='1` is compared
//!   literally.
//! - [`QueryEngine`] runs that statement over a list of file locators. The
//!   default engine is DataFusion ([`DataFusionEngine`]).
//!
//! ```text
//! ArticleFilter { municipality: "sp", start_date: 2024-01-01 }, limit 10
//!     ↓
//! SELECT * FROM articles WHERE municipality = $1 AND publication_date >= $2 LIMIT 10
//! params: [Utf8("sp"), Date32(19723)]
//!     ↓
//! articles := view over [file:///data/raw/articles/batch_*.parquet]
//!     ↓
//! RecordBatch (article schema)
//! ```

use arrow::compute::concat_batches;
use arrow::datatypes::Date32Type;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use chrono::NaiveDate;
use datafusion::execution::context::SessionContext;
use datafusion::prelude::{ParquetReadOptions, SessionConfig};
use datafusion::scalar::ScalarValue;
use diario_contract::schema::articles_schema;
use object_store::ObjectStore;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

use crate::error::{Error, Result};

/// Name of the view the statement selects from.
pub const ARTICLES_TABLE: &str = "articles";

/// Filters for [`GazetteStorage::query_articles`](crate::GazetteStorage::query_articles).
///
/// Every set field narrows the result; an empty filter matches all articles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleFilter {
    pub municipality: Option<String>,
    /// Inclusive
    pub start_date: Option<NaiveDate>,
    /// Inclusive
    pub end_date: Option<NaiveDate>,
    /// Matches any of the tags; empty means no restriction
    pub content_types: Vec<String>,
}

impl ArticleFilter {
    pub fn municipality(mut self, municipality: impl Into<String>) -> Self {
        self.municipality = Some(municipality.into());
        self
    }

    pub fn between(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_types.push(content_type.into());
        self
    }
}

/// A parameterized article statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleQuery {
    pub filter: ArticleFilter,
    pub limit: Option<usize>,
}

impl ArticleQuery {
    pub fn new(filter: ArticleFilter, limit: Option<usize>) -> Self {
        Self { filter, limit }
    }

    /// SQL text with `$1..$n` placeholders.
    pub fn sql(&self) -> String {
        self.build().0
    }

    /// Values bound to the placeholders of [`sql`](Self::sql), in order.
    pub fn params(&self) -> Vec<ScalarValue> {
        self.build().1
    }

    fn build(&self) -> (String, Vec<ScalarValue>) {
        let mut predicates = Vec::new();
        let mut params = Vec::new();

        if let Some(municipality) = &self.filter.municipality {
            let p = bind(ScalarValue::Utf8(Some(municipality.clone())), &mut params);
            predicates.push(format!("municipality = {}", p));
        }
        if let Some(start) = self.filter.start_date {
            let p = bind(date_value(start), &mut params);
            predicates.push(format!("publication_date >= {}", p));
        }
        if let Some(end) = self.filter.end_date {
            let p = bind(date_value(end), &mut params);
            predicates.push(format!("publication_date <= {}", p));
        }
        if !self.filter.content_types.is_empty() {
            let placeholders: Vec<String> = self
                .filter
                .content_types
                .iter()
                .map(|t| bind(ScalarValue::Utf8(Some(t.clone())), &mut params))
                .collect();
            predicates.push(format!("content_type IN ({})", placeholders.join(", ")));
        }

        let predicate = if predicates.is_empty() {
            "TRUE".to_string()
        } else {
            predicates.join(" AND ")
        };

        let mut sql = format!("SELECT * FROM {} WHERE {}", ARTICLES_TABLE, predicate);
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        (sql, params)
    }
}

/// Append `value` and return its placeholder.
fn bind(value: ScalarValue, params: &mut Vec<ScalarValue>) -> String {
    params.push(value);
    format!("${}", params.len())
}

fn date_value(date: NaiveDate) -> ScalarValue {
    ScalarValue::Date32(Some(Date32Type::from_naive_date(date)))
}

/// SQL engine that can scan article tables.
#[async_trait]
pub trait QueryEngine: Send + Sync + fmt::Debug {
    /// Run `query` over the Parquet files at `sources` (absolute locators) and
    /// return all matching rows as one batch.
    async fn execute(&self, sources: &[String], query: &ArticleQuery) -> Result<RecordBatch>;
}

/// DataFusion-backed [`QueryEngine`].
///
/// One session per engine; queries are serialized on it.
pub struct DataFusionEngine {
    ctx: Mutex<SessionContext>,
    timeout: Duration,
}

impl fmt::Debug for DataFusionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataFusionEngine")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl DataFusionEngine {
    pub fn new(timeout: Duration) -> Self {
        // Keep Utf8 columns as written instead of reading them as views.
        let mut config = SessionConfig::new();
        config.options_mut().execution.parquet.schema_force_view_types = false;

        Self {
            ctx: Mutex::new(SessionContext::new_with_config(config)),
            timeout,
        }
    }

    /// Make locators under `url` (e.g. `s3://bucket`) resolvable.
    pub fn with_object_store(mut self, url: &Url, store: Arc<dyn ObjectStore>) -> Self {
        self.ctx.get_mut().register_object_store(url, store);
        tracing::debug!(url = %url, "Registered object store with query engine");
        self
    }

    async fn run(
        ctx: &SessionContext,
        sources: &[String],
        query: &ArticleQuery,
    ) -> Result<RecordBatch> {
        let files = ctx
            .read_parquet(sources.to_vec(), ParquetReadOptions::default())
            .await?;
        ctx.register_table(ARTICLES_TABLE, files.into_view())?;

        let df = ctx.sql(&query.sql()).await?.with_param_values(query.params())?;
        let schema = df.schema().inner().clone();
        let batches = df.collect().await?;
        Ok(concat_batches(&schema, &batches)?)
    }
}

#[async_trait]
impl QueryEngine for DataFusionEngine {
    #[tracing::instrument(skip(self, sources, query), fields(files = sources.len()))]
    async fn execute(&self, sources: &[String], query: &ArticleQuery) -> Result<RecordBatch> {
        if sources.is_empty() {
            return Ok(RecordBatch::new_empty(articles_schema()));
        }

        let ctx = self.ctx.lock().await;
        let outcome = tokio::time::timeout(self.timeout, Self::run(&ctx, sources, query)).await;
        // The view points at this call's files only.
        ctx.deregister_table(ARTICLES_TABLE)?;

        let batch = outcome.map_err(|_| Error::Timeout {
            operation: "query",
            path: ARTICLES_TABLE.to_string(),
            after: self.timeout,
        })??;

        tracing::debug!(rows = batch.num_rows(), "Query finished");
        Ok(batch)
    }
}
