//! Local filesystem backend.
//!
//! Maps logical paths onto files under a base directory:
//!
//! ```text
//! <base>/gazettes/batch_20240305_101500.parquet
//! <base>/content/3a/7b/3a7b...e1.bin
//! <base>/content/3a/7b/3a7b...e1.bin.meta.json
//! ```
//!
//! The base directory is created on construction and canonicalized so
//! `get_uri` always returns absolute, percent-encoded `file://` locators.
//!
//! Files are written to a hidden temporary sibling and renamed into place, so
//! a reader never sees a partially written file under its final name. The
//! sidecar goes first and the data last.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use url::Url;

use super::{sidecar_path, validate_path, StorageBackend};
use crate::error::{Error, Result};

/// Suffix of in-flight temporary files; never listed.
const TEMP_SUFFIX: &str = ".tmp";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Hidden sibling of `full` used while its contents are being written.
fn temp_sibling(full: &Path) -> PathBuf {
    let name = full
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    full.with_file_name(format!(".{}.{}-{}{}", name, std::process::id(), n, TEMP_SUFFIX))
}

#[derive(Debug, Clone)]
pub struct LocalBackend {
    base_path: PathBuf,
}

impl LocalBackend {
    /// Create a backend rooted at `base_path`, creating the directory if needed.
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref();
        let display = base_path.display().to_string();

        std::fs::create_dir_all(base_path).map_err(|e| Error::io(&display, e))?;
        let base_path = base_path
            .canonicalize()
            .map_err(|e| Error::io(&display, e))?;

        tracing::info!(base_path = %base_path.display(), "Local backend initialized");

        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn full_path(&self, path: &str) -> Result<PathBuf> {
        validate_path(path)?;
        Ok(self.base_path.join(path))
    }

    /// Logical path of a file below the base directory.
    fn relative(&self, full: &Path) -> Option<String> {
        let rel = full.strip_prefix(&self.base_path).ok()?;
        let parts: Vec<_> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }

    async fn write_file(&self, path: &str, full: &Path, data: &[u8]) -> Result<()> {
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io(path, e))?;
        }

        let temp = temp_sibling(full);
        let written = match tokio::fs::write(&temp, data).await {
            Ok(()) => tokio::fs::rename(&temp, full).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(Error::io(path, e));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn write_bytes(
        &self,
        path: &str,
        data: Bytes,
        metadata: Option<&serde_json::Value>,
    ) -> Result<String> {
        let full = self.full_path(path)?;

        if let Some(metadata) = metadata {
            let meta_path = sidecar_path(path);
            let meta_full = self.full_path(&meta_path)?;
            let body = serde_json::to_vec_pretty(metadata)?;
            self.write_file(&meta_path, &meta_full, &body).await?;
        }

        self.write_file(path, &full, &data).await?;

        tracing::trace!(path = %path, size = data.len(), "Wrote file");
        Ok(path.to_string())
    }

    async fn read_bytes(&self, path: &str) -> Result<Bytes> {
        let full = self.full_path(path)?;
        let data = tokio::fs::read(&full)
            .await
            .map_err(|e| Error::io(path, e))?;
        Ok(Bytes::from(data))
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let full = self.full_path(path)?;
        tokio::fs::try_exists(&full)
            .await
            .map_err(|e| Error::io(path, e))
    }

    async fn stored_size(&self, path: &str) -> Result<Option<u64>> {
        let full = self.full_path(path)?;
        match tokio::fs::metadata(&full).await {
            Ok(meta) if meta.is_file() => Ok(Some(meta.len())),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::io(path, e)),
        }
    }

    async fn list_files(&self, prefix: &str, suffix: Option<&str>) -> Result<Vec<String>> {
        let root = self.full_path(prefix)?;

        let root_meta = match tokio::fs::metadata(&root).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io(prefix, e)),
        };

        let matches = |rel: &str| {
            !rel.ends_with(TEMP_SUFFIX) && suffix.map_or(true, |s| rel.ends_with(s))
        };
        let mut files = Vec::new();

        if root_meta.is_file() {
            if let Some(rel) = self.relative(&root).filter(|r| matches(r)) {
                files.push(rel);
            }
            return Ok(files);
        }

        let mut pending = vec![root];
        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .map_err(|e| Error::io(prefix, e))?;

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| Error::io(prefix, e))?
            {
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| Error::io(prefix, e))?;
                let entry_path = entry.path();

                if file_type.is_dir() {
                    pending.push(entry_path);
                } else if file_type.is_file() {
                    if let Some(rel) = self.relative(&entry_path).filter(|r| matches(r)) {
                        files.push(rel);
                    }
                }
            }
        }

        files.sort();
        Ok(files)
    }

    fn get_uri(&self, path: &str) -> String {
        let full = self.base_path.join(path);
        match Url::from_file_path(&full) {
            Ok(url) => url.into(),
            // Only reachable for relative paths; the base is canonicalized.
            Err(()) => format!("file://{}", full.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn backend() -> (LocalBackend, TempDir) {
        let dir = TempDir::new().unwrap();
        let backend = LocalBackend::new(dir.path().join("raw")).unwrap();
        (backend, dir)
    }

    #[test]
    fn test_new_creates_base_dir() {
        let (backend, _dir) = backend();
        assert!(backend.base_path().is_dir());
        assert!(backend.base_path().is_absolute());
    }

    #[tokio::test]
    async fn test_write_read_roundtrip() {
        let (backend, _dir) = backend();
        let committed = backend
            .write_bytes("a/b/c.bin", Bytes::from_static(b"hello"), None)
            .await
            .unwrap();
        assert_eq!(committed, "a/b/c.bin");
        assert_eq!(backend.read_bytes("a/b/c.bin").await.unwrap(), Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn test_empty_payload_roundtrip() {
        let (backend, _dir) = backend();
        backend.write_bytes("empty.bin", Bytes::new(), None).await.unwrap();
        assert!(backend.read_bytes("empty.bin").await.unwrap().is_empty());
        assert!(backend.exists("empty.bin").await.unwrap());
    }

    #[tokio::test]
    async fn test_metadata_sidecar_written() {
        let (backend, _dir) = backend();
        let meta = serde_json::json!({"content_size": 3});
        backend
            .write_bytes("x/y.bin", Bytes::from_static(b"abc"), Some(&meta))
            .await
            .unwrap();

        let raw = backend.read_bytes("x/y.bin.meta.json").await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(parsed["content_size"], 3);
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let (backend, _dir) = backend();
        let err = backend.read_bytes("nope.bin").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!backend.exists("nope.bin").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_files_sorted_recursive_with_suffix() {
        let (backend, _dir) = backend();
        for path in [
            "articles/batch_2.parquet",
            "articles/nested/batch_0.parquet",
            "articles/batch_1.parquet",
            "articles/notes.txt",
        ] {
            backend.write_bytes(path, Bytes::from_static(b"x"), None).await.unwrap();
        }

        let files = backend.list_files("articles", Some(".parquet")).await.unwrap();
        assert_eq!(
            files,
            vec![
                "articles/batch_1.parquet",
                "articles/batch_2.parquet",
                "articles/nested/batch_0.parquet",
            ]
        );

        let all = backend.list_files("articles", None).await.unwrap();
        assert_eq!(all.len(), 4);
    }

    #[tokio::test]
    async fn test_list_missing_prefix_is_empty() {
        let (backend, _dir) = backend();
        assert!(backend.list_files("gazettes", Some(".parquet")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_escaping_paths_rejected() {
        let (backend, _dir) = backend();
        let err = backend.read_bytes("../outside").await.unwrap_err();
        assert!(matches!(err, Error::InvalidPath { .. }));
    }

    #[test]
    fn test_get_uri_is_absolute_file_url() {
        let (backend, _dir) = backend();
        let uri = backend.get_uri("articles/batch_1.parquet");
        assert!(uri.starts_with("file:///"));
        assert!(uri.ends_with("/raw/articles/batch_1.parquet"));
    }

    #[test]
    fn test_get_uri_percent_encodes_base_path() {
        let dir = TempDir::new().unwrap();
        let backend = LocalBackend::new(dir.path().join("a#b c%d")).unwrap();

        let uri = backend.get_uri("articles/batch_1.parquet");
        assert!(uri.contains("/a%23b%20c%25d/articles/batch_1.parquet"), "{}", uri);

        let back = Url::parse(&uri).unwrap().to_file_path().unwrap();
        assert_eq!(back, backend.base_path().join("articles/batch_1.parquet"));
    }

    #[tokio::test]
    async fn test_stored_size() {
        let (backend, _dir) = backend();
        backend
            .write_bytes("a/b.bin", Bytes::from_static(b"hello"), None)
            .await
            .unwrap();

        assert_eq!(backend.stored_size("a/b.bin").await.unwrap(), Some(5));
        assert_eq!(backend.stored_size("a/missing.bin").await.unwrap(), None);
        // Directories are not files
        assert_eq!(backend.stored_size("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_no_temporary_files_left_behind() {
        let (backend, _dir) = backend();
        let meta = serde_json::json!({"content_size": 3});
        backend
            .write_bytes("c/x.bin", Bytes::from_static(b"abc"), Some(&meta))
            .await
            .unwrap();

        let mut names: Vec<String> = std::fs::read_dir(backend.base_path().join("c"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["x.bin", "x.bin.meta.json"]);
    }

    #[tokio::test]
    async fn test_failed_sidecar_leaves_no_data_file() {
        let (backend, _dir) = backend();
        // A directory where the sidecar should go makes its rename fail.
        std::fs::create_dir_all(backend.base_path().join("c/x.bin.meta.json")).unwrap();

        let meta = serde_json::json!({"content_size": 3});
        let result = backend
            .write_bytes("c/x.bin", Bytes::from_static(b"abc"), Some(&meta))
            .await;

        assert!(result.is_err());
        assert!(!backend.exists("c/x.bin").await.unwrap());
        assert!(backend.list_files("c", None).await.unwrap().is_empty());
    }
}
