//! Content-Addressed Blob Store
//!
//! Large article bodies are stored once per distinct SHA-256 digest, outside
//! of the article tables:
//!
//! ```text
//! put(bytes)
//!     ↓
//! sha256 → 3a7bd3e2360a3d29eea436fcfb7e44c735d117c42d1c1835420b6b9942dd4f1b
//!     ↓
//! path  → content/3a/7b/3a7bd3e2...4f1b.bin
//!     ↓
//! stored with the same size? ──YES──→ restore sidecar if missing,
//!     │                              return descriptor
//!     NO (absent or truncated)
//!     ↓
//! write content/3a/7b/3a7bd3e2...4f1b.bin.meta.json, then the bytes
//! ```
//!
//! The path is a pure function of the digest, so identical payloads always
//! land on the same file and re-putting them is a no-op. Blobs are never
//! updated or deleted; the only rewrite is of a file left truncated by an
//! interrupted write.
//!
//! ## Concurrency
//!
//! With the default backend capability the existence check and the write are
//! two separate steps. Two callers storing the same payload at the same time
//! may both write; both write identical bytes to the same path, so the result
//! is the same as a single write. The object store backend closes this window
//! with a conditional put.

use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::backend::StorageBackend;
use crate::error::Result;

/// Directory holding all blobs.
pub const CONTENT_DIRNAME: &str = "content";

/// Extension of blob files.
pub const BLOB_SUFFIX: &str = ".bin";

/// Descriptor of a stored payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlob {
    /// Lowercase hex SHA-256 of the payload
    pub hash: String,
    pub path: String,
    pub size: u64,
}

impl ContentBlob {
    /// Compute the descriptor of `data` without storing it.
    pub fn for_bytes(data: &[u8]) -> Self {
        let hash = hex::encode(Sha256::digest(data));
        let path = content_path(&hash);
        Self {
            hash,
            path,
            size: data.len() as u64,
        }
    }
}

/// Sharded location of a blob: `content/<h[0:2]>/<h[2:4]>/<h>.bin`.
pub fn content_path(hash: &str) -> String {
    let first = hash.get(0..2).unwrap_or(hash);
    let second = hash.get(2..4).unwrap_or("");
    format!(
        "{}/{}/{}/{}{}",
        CONTENT_DIRNAME, first, second, hash, BLOB_SUFFIX
    )
}

/// Sidecar record stored next to each blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobMetadata {
    pub content_hash: String,
    pub content_size: u64,
    pub created_at: String,
}

/// Write-once blob storage on top of a backend.
#[derive(Debug, Clone)]
pub struct ContentStore {
    backend: Arc<dyn StorageBackend>,
}

impl ContentStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Store `data` unless a blob with the same digest exists, and return its
    /// descriptor either way.
    pub async fn put(&self, data: &[u8]) -> Result<ContentBlob> {
        let blob = ContentBlob::for_bytes(data);
        let metadata = serde_json::to_value(BlobMetadata {
            content_hash: blob.hash.clone(),
            content_size: blob.size,
            created_at: Utc::now().to_rfc3339(),
        })?;

        let written = self
            .backend
            .write_bytes_if_absent(&blob.path, Bytes::copy_from_slice(data), Some(&metadata))
            .await?;

        if written {
            tracing::debug!(hash = %blob.hash, size = blob.size, "Stored content blob");
        } else {
            tracing::trace!(hash = %blob.hash, "Content blob already stored");
        }

        Ok(blob)
    }

    /// Read a blob back by its path. Fails with `NotFound` when absent.
    pub async fn get(&self, path: &str) -> Result<Bytes> {
        self.backend.read_bytes(path).await
    }
}
