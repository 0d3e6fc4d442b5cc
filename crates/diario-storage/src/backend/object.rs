//! Object store backend
//!
//! Stores files in any `object_store::ObjectStore`: S3 and MinIO in
//! production, `InMemory` for tests and dry runs.
//!
//! ## Differences from the local backend
//!
//! - There are no directories. Listing a prefix that has no objects simply
//!   returns nothing, which gives the same "missing prefix ⇒ empty list"
//!   behavior as the local backend.
//! - Every call is bounded by `timeout`. An expired deadline surfaces as
//!   `Error::Timeout` instead of blocking forever on a stuck connection.
//! - `write_bytes_if_absent` uses a conditional put (`PutMode::Create`) so two
//!   writers of the same blob never both upload it. When the object already
//!   exists its size is checked and a missing sidecar restored. Stores that do
//!   not support conditional puts fall back to exists-then-write.

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectMeta, ObjectStore, PutMode, PutOptions};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::{sidecar_path, validate_path, write_if_incomplete, StorageBackend};
use crate::config::S3Config;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct ObjectStoreBackend {
    store: Arc<dyn ObjectStore>,

    /// Root URL of the store, e.g. `s3://gazettes`
    url: Url,

    /// Key prefix all logical paths live under
    prefix: Option<String>,

    timeout: Duration,
}

impl ObjectStoreBackend {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        url: Url,
        prefix: Option<&str>,
        timeout: Duration,
    ) -> Self {
        let prefix = prefix
            .map(|p| p.trim_matches('/').to_string())
            .filter(|p| !p.is_empty());
        Self {
            store,
            url,
            prefix,
            timeout,
        }
    }

    /// Connect to an S3-compatible bucket. Credentials are read from the
    /// standard `AWS_*` environment variables.
    pub fn s3(config: &S3Config, timeout: Duration) -> Result<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(&config.bucket)
            .with_region(&config.region)
            .with_allow_http(config.allow_http);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.with_endpoint(endpoint);
        }

        let store = builder
            .build()
            .map_err(|e| Error::Config(format!("failed to build S3 client: {}", e)))?;
        let url = Url::parse(&format!("s3://{}", config.bucket))
            .map_err(|e| Error::Config(format!("invalid bucket name '{}': {}", config.bucket, e)))?;

        tracing::info!(
            bucket = %config.bucket,
            endpoint = ?config.endpoint,
            prefix = ?config.prefix,
            "Object store backend initialized"
        );

        Ok(Self::new(
            Arc::new(store),
            url,
            config.prefix.as_deref(),
            timeout,
        ))
    }

    /// In-process store; contents vanish when the backend is dropped.
    pub fn in_memory(timeout: Duration) -> Result<Self> {
        let url = Url::parse("memory://diario")
            .map_err(|e| Error::Config(format!("invalid memory store URL: {}", e)))?;
        Ok(Self::new(Arc::new(InMemory::new()), url, None, timeout))
    }

    fn key(&self, path: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}/{}", prefix, path),
            None => path.to_string(),
        }
    }

    fn location(&self, path: &str) -> Result<ObjectPath> {
        validate_path(path)?;
        Ok(ObjectPath::from(self.key(path)))
    }

    fn relative(&self, meta: &ObjectMeta) -> String {
        let key = meta.location.as_ref();
        match &self.prefix {
            Some(prefix) => key
                .strip_prefix(prefix.as_str())
                .map(|rest| rest.trim_start_matches('/'))
                .unwrap_or(key)
                .to_string(),
            None => key.to_string(),
        }
    }

    async fn bounded<T, F>(&self, operation: &'static str, path: &str, fut: F) -> Result<T>
    where
        F: Future<Output = object_store::Result<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(|e| Error::object_store(path, e)),
            Err(_) => Err(Error::Timeout {
                operation,
                path: path.to_string(),
                after: self.timeout,
            }),
        }
    }

    async fn put_sidecar(&self, path: &str, metadata: &serde_json::Value) -> Result<()> {
        let meta_path = sidecar_path(path);
        let location = self.location(&meta_path)?;
        let body = Bytes::from(serde_json::to_vec_pretty(metadata)?);
        self.bounded("put", &meta_path, self.store.put(&location, body.into()))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for ObjectStoreBackend {
    fn name(&self) -> &'static str {
        "object_store"
    }

    async fn write_bytes(
        &self,
        path: &str,
        data: Bytes,
        metadata: Option<&serde_json::Value>,
    ) -> Result<String> {
        let location = self.location(path)?;
        let size = data.len();

        if let Some(metadata) = metadata {
            self.put_sidecar(path, metadata).await?;
        }
        self.bounded("put", path, self.store.put(&location, data.into()))
            .await?;

        tracing::trace!(path = %path, size, "Uploaded object");
        Ok(path.to_string())
    }

    async fn write_bytes_if_absent(
        &self,
        path: &str,
        data: Bytes,
        metadata: Option<&serde_json::Value>,
    ) -> Result<bool> {
        let location = self.location(path)?;
        let put = self
            .store
            .put_opts(&location, data.clone().into(), PutOptions::from(PutMode::Create));

        let outcome = tokio::time::timeout(self.timeout, put)
            .await
            .map_err(|_| Error::Timeout {
                operation: "put",
                path: path.to_string(),
                after: self.timeout,
            })?;

        match outcome {
            Ok(_) => {
                // A failed sidecar upload is repaired by the next put of the
                // same payload, which lands in the AlreadyExists arm.
                if let Some(metadata) = metadata {
                    self.put_sidecar(path, metadata).await?;
                }
                Ok(true)
            }
            Err(object_store::Error::AlreadyExists { .. }) => {
                write_if_incomplete(self, path, data, metadata).await
            }
            Err(object_store::Error::NotImplemented) => {
                tracing::debug!(path = %path, "Conditional put unsupported, checking existence");
                write_if_incomplete(self, path, data, metadata).await
            }
            Err(e) => Err(Error::object_store(path, e)),
        }
    }

    async fn read_bytes(&self, path: &str) -> Result<Bytes> {
        let location = self.location(path)?;
        self.bounded("get", path, async {
            self.store.get(&location).await?.bytes().await
        })
        .await
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let location = self.location(path)?;
        match self.bounded("head", path, self.store.head(&location)).await {
            Ok(_) => Ok(true),
            Err(Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn stored_size(&self, path: &str) -> Result<Option<u64>> {
        let location = self.location(path)?;
        match self.bounded("head", path, self.store.head(&location)).await {
            Ok(meta) => Ok(Some(meta.size as u64)),
            Err(Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn list_files(&self, prefix: &str, suffix: Option<&str>) -> Result<Vec<String>> {
        let location = self.location(prefix)?;
        let objects: Vec<ObjectMeta> = self
            .bounded("list", prefix, self.store.list(Some(&location)).try_collect())
            .await?;

        let mut files: Vec<String> = objects
            .iter()
            .map(|meta| self.relative(meta))
            .filter(|rel| suffix.map_or(true, |s| rel.ends_with(s)))
            .collect();
        files.sort();
        Ok(files)
    }

    fn get_uri(&self, path: &str) -> String {
        format!("{}/{}", self.url.as_str().trim_end_matches('/'), self.key(path))
    }

    fn query_store(&self) -> Option<(Url, Arc<dyn ObjectStore>)> {
        Some((self.url.clone(), self.store.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_roundtrip_in_memory() {
        let backend = ObjectStoreBackend::in_memory(Duration::from_secs(5)).unwrap();
        backend
            .write_bytes("content/aa/bb/x.bin", Bytes::from_static(b"payload"), None)
            .await
            .unwrap();
        assert!(backend.exists("content/aa/bb/x.bin").await.unwrap());
        assert_eq!(
            backend.read_bytes("content/aa/bb/x.bin").await.unwrap(),
            Bytes::from_static(b"payload")
        );
    }

    #[tokio::test]
    async fn test_missing_object() {
        let backend = ObjectStoreBackend::in_memory(Duration::from_secs(5)).unwrap();
        assert!(!backend.exists("nope").await.unwrap());
        assert!(backend.read_bytes("nope").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_write_if_absent_is_conditional() {
        let backend = ObjectStoreBackend::in_memory(Duration::from_secs(5)).unwrap();
        let meta = serde_json::json!({"content_size": 1});

        let first = backend
            .write_bytes_if_absent("c/1.bin", Bytes::from_static(b"a"), Some(&meta))
            .await
            .unwrap();
        let second = backend
            .write_bytes_if_absent("c/1.bin", Bytes::from_static(b"a"), Some(&meta))
            .await
            .unwrap();

        assert!(first);
        assert!(!second);
        assert!(backend.exists("c/1.bin.meta.json").await.unwrap());
    }

    #[tokio::test]
    async fn test_prefix_is_transparent() {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        let url = Url::parse("s3://gazettes").unwrap();
        let backend =
            ObjectStoreBackend::new(store.clone(), url, Some("/tenant-a/"), Duration::from_secs(5));

        backend
            .write_bytes("articles/batch_1.parquet", Bytes::from_static(b"x"), None)
            .await
            .unwrap();

        let files = backend.list_files("articles", Some(".parquet")).await.unwrap();
        assert_eq!(files, vec!["articles/batch_1.parquet"]);

        // Physically stored below the prefix
        let raw = store
            .head(&ObjectPath::from("tenant-a/articles/batch_1.parquet"))
            .await;
        assert!(raw.is_ok());

        assert_eq!(
            backend.get_uri("articles/batch_1.parquet"),
            "s3://gazettes/tenant-a/articles/batch_1.parquet"
        );
    }

    #[tokio::test]
    async fn test_list_missing_prefix_is_empty() {
        let backend = ObjectStoreBackend::in_memory(Duration::from_secs(5)).unwrap();
        assert!(backend.list_files("articles", None).await.unwrap().is_empty());
    }

    #[test]
    fn test_query_store_exposed() {
        let backend = ObjectStoreBackend::in_memory(Duration::from_secs(5)).unwrap();
        let (url, _store) = backend.query_store().unwrap();
        assert_eq!(url.as_str(), "memory://diario");
    }
}
