//! Storage Backends
//!
//! A backend stores byte blobs and columnar tables at logical, `/`-separated
//! paths relative to a backend-defined root. Everything above this module
//! (content store, batch writer, query builder) talks to an
//! `Arc<dyn StorageBackend>` and never to a filesystem or bucket directly.
//!
//! ## Implementations
//!
//! - [`LocalBackend`]: a directory on the local filesystem
//! - [`ObjectStoreBackend`]: any `object_store::ObjectStore` (S3, MinIO, memory)
//!
//! ## Contract
//!
//! | Operation | Behavior |
//! |-----------|----------|
//! | `write_bytes` | Creates intermediate directories; optional JSON sidecar at `<path>.meta.json` |
//! | `read_bytes` | `NotFound` when absent |
//! | `stored_size` | Byte size, `None` when absent |
//! | `write_table` | Parquet, zstd level 9, dictionary encoding and statistics on by default |
//! | `read_table` | Optional column projection |
//! | `list_files` | Recursive, sorted, empty when the prefix does not exist |
//! | `get_uri` | Absolute locator the query engine can scan |
//!
//! Tables are encoded in memory and then handed to `write_bytes`, so a backend
//! only has to implement byte storage to get table support.

pub mod local;
pub mod object;

pub use local::LocalBackend;
pub use object::ObjectStoreBackend;

use arrow::compute::concat_batches;
use arrow::record_batch::{RecordBatch, RecordBatchReader};
use async_trait::async_trait;
use bytes::Bytes;
use object_store::ObjectStore;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::{ArrowWriter, ProjectionMask};
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::{EnabledStatistics, WriterProperties};
use std::fmt::Debug;
use std::sync::Arc;
use url::Url;

use crate::error::{Error, Result};

/// Default zstd level for Parquet tables.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 9;

/// Suffix appended to a blob path for its metadata sidecar.
pub const SIDECAR_SUFFIX: &str = ".meta.json";

/// Path of the JSON sidecar stored next to `path`.
pub fn sidecar_path(path: &str) -> String {
    format!("{}{}", path, SIDECAR_SUFFIX)
}

/// Compression codec for Parquet tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableCompression {
    Uncompressed,
    Snappy,
    Zstd(i32),
}

/// Parquet encoding options for `write_table`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableWriteOptions {
    pub compression: TableCompression,
    pub dictionary: bool,
    pub statistics: bool,
}

impl Default for TableWriteOptions {
    fn default() -> Self {
        Self {
            compression: TableCompression::Zstd(DEFAULT_COMPRESSION_LEVEL),
            dictionary: true,
            statistics: true,
        }
    }
}

impl TableWriteOptions {
    pub fn zstd(level: i32) -> Self {
        Self {
            compression: TableCompression::Zstd(level),
            ..Default::default()
        }
    }

    fn writer_properties(&self) -> Result<WriterProperties> {
        let compression = match self.compression {
            TableCompression::Uncompressed => Compression::UNCOMPRESSED,
            TableCompression::Snappy => Compression::SNAPPY,
            TableCompression::Zstd(level) => Compression::ZSTD(ZstdLevel::try_new(level)?),
        };
        let statistics = if self.statistics {
            EnabledStatistics::Page
        } else {
            EnabledStatistics::None
        };

        Ok(WriterProperties::builder()
            .set_compression(compression)
            .set_dictionary_enabled(self.dictionary)
            .set_statistics_enabled(statistics)
            .build())
    }
}

/// Serialize a record batch into a complete Parquet file.
pub fn encode_table(batch: &RecordBatch, options: &TableWriteOptions) -> Result<Bytes> {
    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, batch.schema(), Some(options.writer_properties()?))?;
    writer.write(batch)?;
    writer.close()?;
    Ok(Bytes::from(buf))
}

/// Decode a Parquet file, keeping only `columns` when given.
pub fn decode_table(path: &str, data: Bytes, columns: Option<&[&str]>) -> Result<RecordBatch> {
    let mut builder = ParquetRecordBatchReaderBuilder::try_new(data)?;

    if let Some(columns) = columns {
        let schema = builder.schema().clone();
        let indices = columns
            .iter()
            .map(|name| {
                schema.index_of(name).map_err(|_| Error::SchemaMismatch {
                    table: path.to_string(),
                    reason: format!("no column named '{}'", name),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let mask = ProjectionMask::roots(builder.parquet_schema(), indices);
        builder = builder.with_projection(mask);
    }

    let reader = builder.build()?;
    let schema = reader.schema();
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(concat_batches(&schema, &batches)?)
}

/// Byte and table storage at logical paths.
///
/// Implementations must be safe to share behind an `Arc`. Concurrency control
/// beyond what a single call does is the caller's concern.
#[async_trait]
pub trait StorageBackend: Send + Sync + Debug {
    /// Backend kind, used in logs and stats.
    fn name(&self) -> &'static str;

    /// Write `data` at `path`, replacing any previous content. When `metadata`
    /// is given it is stored as pretty JSON at [`sidecar_path`], before `data`,
    /// so a file that is present always has its sidecar.
    ///
    /// Returns the committed relative path.
    async fn write_bytes(
        &self,
        path: &str,
        data: Bytes,
        metadata: Option<&serde_json::Value>,
    ) -> Result<String>;

    /// Write `data` at `path` only if no complete copy is stored there yet.
    /// Returns whether this call wrote `data`.
    ///
    /// The default is a non-atomic exists-then-write: two concurrent callers
    /// may both write. Callers only use this for content-addressed payloads,
    /// where both writers produce identical bytes. A stored file of the wrong
    /// size is replaced, and a missing sidecar next to a complete file is
    /// written again.
    async fn write_bytes_if_absent(
        &self,
        path: &str,
        data: Bytes,
        metadata: Option<&serde_json::Value>,
    ) -> Result<bool> {
        write_if_incomplete(self, path, data, metadata).await
    }

    async fn read_bytes(&self, path: &str) -> Result<Bytes>;

    async fn exists(&self, path: &str) -> Result<bool>;

    /// Size in bytes of the file at `path`, `None` when absent.
    async fn stored_size(&self, path: &str) -> Result<Option<u64>>;

    async fn write_table(
        &self,
        path: &str,
        batch: &RecordBatch,
        options: &TableWriteOptions,
    ) -> Result<String> {
        let data = encode_table(batch, options)?;
        self.write_bytes(path, data, None).await
    }

    async fn read_table(&self, path: &str, columns: Option<&[&str]>) -> Result<RecordBatch> {
        let data = self.read_bytes(path).await?;
        decode_table(path, data, columns)
    }

    /// Files under `prefix` (recursively) whose path ends with `suffix`,
    /// sorted lexicographically. A missing prefix yields an empty list.
    async fn list_files(&self, prefix: &str, suffix: Option<&str>) -> Result<Vec<String>>;

    /// Absolute locator of `path` for the query engine.
    fn get_uri(&self, path: &str) -> String;

    /// Object store the query engine must register to resolve [`get_uri`]
    /// locators, if they are not plain `file://` URLs.
    ///
    /// [`get_uri`]: StorageBackend::get_uri
    fn query_store(&self) -> Option<(Url, Arc<dyn ObjectStore>)> {
        None
    }
}

/// Exists-then-write for content-addressed payloads.
///
/// A stored file whose size differs from `data` is a leftover of an
/// interrupted or foreign write and gets replaced. When the stored file is
/// complete, a missing sidecar is written again.
pub(crate) async fn write_if_incomplete<B>(
    backend: &B,
    path: &str,
    data: Bytes,
    metadata: Option<&serde_json::Value>,
) -> Result<bool>
where
    B: StorageBackend + ?Sized,
{
    match backend.stored_size(path).await? {
        Some(size) if size == data.len() as u64 => {
            if let Some(metadata) = metadata {
                restore_sidecar(backend, path, metadata).await?;
            }
            Ok(false)
        }
        stored => {
            if let Some(size) = stored {
                tracing::warn!(
                    path = %path,
                    stored = size,
                    expected = data.len(),
                    "Replacing incomplete file"
                );
            }
            backend.write_bytes(path, data, metadata).await?;
            Ok(true)
        }
    }
}

async fn restore_sidecar<B>(backend: &B, path: &str, metadata: &serde_json::Value) -> Result<()>
where
    B: StorageBackend + ?Sized,
{
    let meta_path = sidecar_path(path);
    if backend.exists(&meta_path).await? {
        return Ok(());
    }

    tracing::debug!(path = %meta_path, "Restoring missing sidecar");
    let body = serde_json::to_vec_pretty(metadata)?;
    backend.write_bytes(&meta_path, Bytes::from(body), None).await?;
    Ok(())
}

/// Reject paths that would escape the backend root.
pub(crate) fn validate_path(path: &str) -> Result<()> {
    let escapes = path.starts_with('/')
        || path.contains('\\')
        || path.split('/').any(|segment| segment == "..");
    if escapes {
        return Err(Error::InvalidPath {
            path: path.to_string(),
        });
    }
    Ok(())
}
