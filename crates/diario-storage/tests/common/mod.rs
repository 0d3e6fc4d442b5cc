//! Shared fixtures for the storage integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use diario_contract::{Article, EditionMetadata, GazetteEdition};
use diario_storage::{Error, LocalBackend, Result, StorageBackend};
use futures::stream::BoxStream;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{
    GetOptions, GetResult, ListResult, MultipartUpload, ObjectMeta, ObjectStore, PutMode,
    PutMultipartOpts, PutOptions, PutPayload, PutResult,
};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Local backend that counts physical writes and can be told to fail writes
/// under a prefix.
#[derive(Debug)]
pub struct CountingBackend {
    inner: LocalBackend,
    writes: AtomicUsize,
    fail_prefix: Option<String>,
}

impl CountingBackend {
    pub fn new(dir: &TempDir) -> Arc<Self> {
        Arc::new(Self {
            inner: LocalBackend::new(dir.path()).unwrap(),
            writes: AtomicUsize::new(0),
            fail_prefix: None,
        })
    }

    pub fn failing_under(dir: &TempDir, prefix: &str) -> Arc<Self> {
        Arc::new(Self {
            inner: LocalBackend::new(dir.path()).unwrap(),
            writes: AtomicUsize::new(0),
            fail_prefix: Some(prefix.to_string()),
        })
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageBackend for CountingBackend {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn write_bytes(
        &self,
        path: &str,
        data: Bytes,
        metadata: Option<&serde_json::Value>,
    ) -> Result<String> {
        if let Some(prefix) = &self.fail_prefix {
            if path.starts_with(prefix.as_str()) {
                return Err(Error::Io {
                    path: path.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                });
            }
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write_bytes(path, data, metadata).await
    }

    async fn read_bytes(&self, path: &str) -> Result<Bytes> {
        self.inner.read_bytes(path).await
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        self.inner.exists(path).await
    }

    async fn stored_size(&self, path: &str) -> Result<Option<u64>> {
        self.inner.stored_size(path).await
    }

    async fn list_files(&self, prefix: &str, suffix: Option<&str>) -> Result<Vec<String>> {
        self.inner.list_files(prefix, suffix).await
    }

    fn get_uri(&self, path: &str) -> String {
        self.inner.get_uri(path)
    }
}

/// In-memory object store that delays every read and can refuse
/// conditional puts.
#[derive(Debug)]
pub struct ScriptedStore {
    inner: InMemory,
    read_delay: Duration,
    conditional_puts: bool,
}

impl ScriptedStore {
    pub fn slow_reads(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner: InMemory::new(),
            read_delay: delay,
            conditional_puts: true,
        })
    }

    pub fn without_conditional_puts() -> Arc<Self> {
        Arc::new(Self {
            inner: InMemory::new(),
            read_delay: Duration::ZERO,
            conditional_puts: false,
        })
    }
}

impl fmt::Display for ScriptedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScriptedStore({})", self.inner)
    }
}

#[async_trait]
impl ObjectStore for ScriptedStore {
    async fn put_opts(
        &self,
        location: &ObjectPath,
        payload: PutPayload,
        opts: PutOptions,
    ) -> object_store::Result<PutResult> {
        if !self.conditional_puts && matches!(opts.mode, PutMode::Create) {
            return Err(object_store::Error::NotImplemented);
        }
        self.inner.put_opts(location, payload, opts).await
    }

    async fn put_multipart_opts(
        &self,
        location: &ObjectPath,
        opts: PutMultipartOpts,
    ) -> object_store::Result<Box<dyn MultipartUpload>> {
        self.inner.put_multipart_opts(location, opts).await
    }

    async fn get_opts(
        &self,
        location: &ObjectPath,
        options: GetOptions,
    ) -> object_store::Result<GetResult> {
        if !self.read_delay.is_zero() {
            tokio::time::sleep(self.read_delay).await;
        }
        self.inner.get_opts(location, options).await
    }

    async fn delete(&self, location: &ObjectPath) -> object_store::Result<()> {
        self.inner.delete(location).await
    }

    fn list(&self, prefix: Option<&ObjectPath>) -> BoxStream<'_, object_store::Result<ObjectMeta>> {
        self.inner.list(prefix)
    }

    async fn list_with_delimiter(
        &self,
        prefix: Option<&ObjectPath>,
    ) -> object_store::Result<ListResult> {
        self.inner.list_with_delimiter(prefix).await
    }

    async fn copy(&self, from: &ObjectPath, to: &ObjectPath) -> object_store::Result<()> {
        self.inner.copy(from, to).await
    }

    async fn copy_if_not_exists(
        &self,
        from: &ObjectPath,
        to: &ObjectPath,
    ) -> object_store::Result<()> {
        self.inner.copy_if_not_exists(from, to).await
    }
}

pub fn pinned(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 5, hour, 15, 0).unwrap()
}

pub fn edition(id: &str, date: &str, articles: Vec<Article>) -> GazetteEdition {
    GazetteEdition::new(
        EditionMetadata {
            edition_id: id.to_string(),
            publication_date: date.to_string(),
            edition_number: 42,
            supplement: false,
            edition_type_id: 1,
            edition_type_name: "Ordinária".to_string(),
            pdf_url: format!("https://diario.example/{}.pdf", id),
        },
        articles,
    )
}

pub fn text_article(id: &str, edition_id: &str, chars: usize) -> Article {
    Article::text(id, edition_id, "x".repeat(chars))
}
