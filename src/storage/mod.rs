//! Storage capability consumed by the filesystem services.
//!
//! The services never talk to a concrete client. They hold an
//! `Arc<dyn StorageBackend>` scoped to the shared bucket, so the same code runs
//! against S3 (see [`crate::s3::S3Backend`]) or the in-process
//! [`MemoryBackend`].

#[cfg(test)]
pub mod faulty;
pub mod memory;

pub use memory::MemoryBackend;

use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Streamed object body
pub type ObjectReader = Pin<Box<dyn AsyncRead + Send>>;

/// Errors surfaced by a storage backend
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("{op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },

    #[error("{op} failed for {} key(s): {}", failed.len(), failed.join(", "))]
    Incomplete { op: &'static str, failed: Vec<String> },

    #[error("{op} failed for {key}: {source}")]
    Backend {
        op: &'static str,
        key: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl StorageError {
    pub fn backend(
        op: &'static str,
        key: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        StorageError::Backend {
            op,
            key: key.into(),
            source: source.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

/// Metadata returned by `stat`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub key: String,
    pub size: u64,
}

/// A single listing entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub key: String,
    pub size: u64,
    /// Set for common prefixes reported by a non-recursive listing
    pub is_dir: bool,
}

/// Key that could not be removed by a batch delete, with the backend's reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFailure {
    pub key: String,
    pub message: String,
}

/// Payload handed to [`StorageBackend::put`]
#[derive(Debug, Clone)]
pub enum ObjectBody {
    /// Bytes already in memory, such as directory markers
    Bytes(Bytes),
    /// A local file, streamed from disk instead of being loaded first
    File(PathBuf),
}

impl ObjectBody {
    pub fn empty() -> Self {
        ObjectBody::Bytes(Bytes::new())
    }

    /// Number of bytes the payload will write
    pub async fn content_length(&self) -> std::io::Result<u64> {
        match self {
            ObjectBody::Bytes(data) => Ok(data.len() as u64),
            ObjectBody::File(path) => Ok(tokio::fs::metadata(path).await?.len()),
        }
    }

    pub async fn into_reader(self) -> std::io::Result<ObjectReader> {
        match self {
            ObjectBody::Bytes(data) => Ok(Box::pin(std::io::Cursor::new(data))),
            ObjectBody::File(path) => Ok(Box::pin(tokio::fs::File::open(path).await?)),
        }
    }
}

impl From<Bytes> for ObjectBody {
    fn from(data: Bytes) -> Self {
        ObjectBody::Bytes(data)
    }
}

impl From<Vec<u8>> for ObjectBody {
    fn from(data: Vec<u8>) -> Self {
        ObjectBody::Bytes(data.into())
    }
}

impl From<String> for ObjectBody {
    fn from(data: String) -> Self {
        ObjectBody::Bytes(data.into())
    }
}

impl From<&'static str> for ObjectBody {
    fn from(data: &'static str) -> Self {
        ObjectBody::Bytes(Bytes::from_static(data.as_bytes()))
    }
}

/// Object-store primitives against a single bucket
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn stat(&self, key: &str) -> Result<ObjectMeta, StorageError>;

    async fn get(&self, key: &str) -> Result<ObjectReader, StorageError>;

    async fn put(&self, key: &str, body: ObjectBody) -> Result<(), StorageError>;

    async fn copy(&self, source: &str, target: &str) -> Result<(), StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Delete many keys at once. Keys the backend refused are returned, not raised.
    async fn delete_batch(&self, keys: &[String]) -> Result<Vec<DeleteFailure>, StorageError>;

    /// List keys under `prefix`.
    ///
    /// Non-recursive listings use `/` as delimiter: objects directly under the
    /// prefix are returned as-is (including a marker equal to the prefix), deeper
    /// keys collapse into one `is_dir` entry per common prefix.
    async fn list(&self, prefix: &str, recursive: bool) -> Result<Vec<ObjectEntry>, StorageError>;

    /// `stat` succeeds without a not-found error
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        match self.stat(key).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
