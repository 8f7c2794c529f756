//! Backend wrapper that refuses chosen keys, for exercising partial failures.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

use super::{
    DeleteFailure, MemoryBackend, ObjectBody, ObjectEntry, ObjectMeta, ObjectReader,
    StorageBackend, StorageError,
};

const INJECTED: &str = "injected failure";

/// Delegates to a [`MemoryBackend`] except for the configured keys
pub struct FaultyBackend {
    inner: Arc<MemoryBackend>,
    /// Copies whose source is one of these fail
    copy: HashSet<String>,
    /// Single and batch deletes of these keys fail
    delete: HashSet<String>,
}

impl FaultyBackend {
    pub fn new(inner: Arc<MemoryBackend>) -> Self {
        FaultyBackend {
            inner,
            copy: HashSet::new(),
            delete: HashSet::new(),
        }
    }

    pub fn fail_copy(mut self, source: impl Into<String>) -> Self {
        self.copy.insert(source.into());
        self
    }

    pub fn fail_delete(mut self, key: impl Into<String>) -> Self {
        self.delete.insert(key.into());
        self
    }
}

#[async_trait]
impl StorageBackend for FaultyBackend {
    async fn stat(&self, key: &str) -> Result<ObjectMeta, StorageError> {
        self.inner.stat(key).await
    }

    async fn get(&self, key: &str) -> Result<ObjectReader, StorageError> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, body: ObjectBody) -> Result<(), StorageError> {
        self.inner.put(key, body).await
    }

    async fn copy(&self, source: &str, target: &str) -> Result<(), StorageError> {
        if self.copy.contains(source) {
            return Err(StorageError::backend("copy", source, INJECTED));
        }
        self.inner.copy(source, target).await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        if self.delete.contains(key) {
            return Err(StorageError::backend("delete", key, INJECTED));
        }
        self.inner.delete(key).await
    }

    async fn delete_batch(&self, keys: &[String]) -> Result<Vec<DeleteFailure>, StorageError> {
        let (refused, allowed): (Vec<String>, Vec<String>) =
            keys.iter().cloned().partition(|key| self.delete.contains(key));

        let mut failures = self.inner.delete_batch(&allowed).await?;
        failures.extend(refused.into_iter().map(|key| DeleteFailure {
            key,
            message: INJECTED.to_string(),
        }));
        Ok(failures)
    }

    async fn list(&self, prefix: &str, recursive: bool) -> Result<Vec<ObjectEntry>, StorageError> {
        self.inner.list(prefix, recursive).await
    }
}
