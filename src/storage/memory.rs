use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::io::AsyncReadExt;

use super::{
    DeleteFailure, ObjectBody, ObjectEntry, ObjectMeta, ObjectReader, StorageBackend, StorageError,
};

/// In-process bucket, used by tests and the shell's `--memory` mode
#[derive(Debug, Default)]
pub struct MemoryBackend {
    objects: RwLock<BTreeMap<String, Bytes>>,
}

impl MemoryBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// All keys currently stored, in lexical order
    pub fn keys(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Bytes>> {
        self.objects.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Bytes>> {
        self.objects.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn stat(&self, key: &str) -> Result<ObjectMeta, StorageError> {
        self.read()
            .get(key)
            .map(|data| ObjectMeta {
                key: key.to_string(),
                size: data.len() as u64,
            })
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn get(&self, key: &str) -> Result<ObjectReader, StorageError> {
        let data = self
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        Ok(Box::pin(std::io::Cursor::new(data)))
    }

    async fn put(&self, key: &str, body: ObjectBody) -> Result<(), StorageError> {
        let data = match body {
            ObjectBody::Bytes(data) => data,
            body => {
                let mut reader = body
                    .into_reader()
                    .await
                    .map_err(|e| StorageError::backend("put", key, e))?;
                let mut data = Vec::new();
                reader
                    .read_to_end(&mut data)
                    .await
                    .map_err(|e| StorageError::backend("put", key, e))?;
                Bytes::from(data)
            }
        };
        self.write().insert(key.to_string(), data);
        Ok(())
    }

    async fn copy(&self, source: &str, target: &str) -> Result<(), StorageError> {
        let mut objects = self.write();
        let data = objects
            .get(source)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(source.to_string()))?;
        objects.insert(target.to_string(), data);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        // S3 treats deleting a missing key as success
        self.write().remove(key);
        Ok(())
    }

    async fn delete_batch(&self, keys: &[String]) -> Result<Vec<DeleteFailure>, StorageError> {
        let mut objects = self.write();
        for key in keys {
            objects.remove(key);
        }
        Ok(Vec::new())
    }

    async fn list(&self, prefix: &str, recursive: bool) -> Result<Vec<ObjectEntry>, StorageError> {
        let objects = self.read();
        let mut entries = Vec::new();
        let mut prefixes = BTreeSet::new();

        for (key, data) in objects.range(prefix.to_string()..) {
            let Some(rest) = key.strip_prefix(prefix) else {
                break;
            };

            if !recursive {
                if let Some(pos) = rest.find('/') {
                    prefixes.insert(format!("{prefix}{}", &rest[..=pos]));
                    continue;
                }
            }

            entries.push(ObjectEntry {
                key: key.clone(),
                size: data.len() as u64,
                is_dir: false,
            });
        }

        entries.extend(prefixes.into_iter().map(|key| ObjectEntry {
            key,
            size: 0,
            is_dir: true,
        }));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    async fn seeded() -> Arc<MemoryBackend> {
        let backend = MemoryBackend::new();
        for key in ["u/", "u/a.txt", "u/docs/", "u/docs/b.txt", "u/docs/deep/c.txt", "v/x"] {
            backend.put(key, "data".into()).await.unwrap();
        }
        backend
    }

    fn keys(entries: &[ObjectEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.key.as_str()).collect()
    }

    #[tokio::test]
    async fn test_list_one_level_collapses_prefixes() {
        let backend = seeded().await;

        let entries = backend.list("u/", false).await.unwrap();
        assert_eq!(keys(&entries), vec!["u/", "u/a.txt", "u/docs/"]);
        assert!(entries[2].is_dir);
        assert!(!entries[0].is_dir);
    }

    #[tokio::test]
    async fn test_list_recursive_stays_under_prefix() {
        let backend = seeded().await;

        let entries = backend.list("u/docs/", true).await.unwrap();
        assert_eq!(
            keys(&entries),
            vec!["u/docs/", "u/docs/b.txt", "u/docs/deep/c.txt"]
        );
    }

    #[tokio::test]
    async fn test_stat_and_get() {
        let backend = seeded().await;

        assert_eq!(backend.stat("u/a.txt").await.unwrap().size, 4);
        assert!(backend.stat("u/missing").await.unwrap_err().is_not_found());
        assert!(!backend.exists("u/missing").await.unwrap());

        let mut reader = backend.get("u/a.txt").await.unwrap();
        let mut buf = String::new();
        reader.read_to_string(&mut buf).await.unwrap();
        assert_eq!(buf, "data");
    }

    #[tokio::test]
    async fn test_put_streams_file_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.bin");
        std::fs::write(&path, b"from disk").unwrap();

        let body = ObjectBody::File(path.clone());
        assert_eq!(body.content_length().await.unwrap(), 9);

        let backend = MemoryBackend::new();
        backend.put("u/upload.bin", body).await.unwrap();
        assert_eq!(backend.stat("u/upload.bin").await.unwrap().size, 9);

        let missing = ObjectBody::File(dir.path().join("gone"));
        assert!(backend.put("u/gone", missing).await.is_err());
        assert!(!backend.exists("u/gone").await.unwrap());
    }

    #[tokio::test]
    async fn test_copy_missing_source() {
        let backend = seeded().await;
        let err = backend.copy("u/nope", "u/other").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
