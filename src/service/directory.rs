use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{FsError, Result};
use crate::storage::{ObjectBody, StorageBackend};
use crate::vfs::path::{
    directory_path, normalize, relative_path, split_name_and_parent, user_root_prefix,
    with_directory_suffix,
};
use crate::vfs::{ResourceDescriptor, UserId, resolver};

/// Creation and listing of synthetic directories.
///
/// A directory exists when a zero-byte marker object is stored under its
/// slash-terminated key.
#[derive(Clone)]
pub struct DirectoryService {
    storage: Arc<dyn StorageBackend>,
}

impl DirectoryService {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        DirectoryService { storage }
    }

    /// Make a freshly registered user's namespace enumerable
    pub async fn create_root_directory(&self, user: UserId) -> Result<()> {
        let root = user_root_prefix(user);
        self.storage.put(&root, ObjectBody::empty()).await?;
        info!(%user, key = %root, "created root directory");
        Ok(())
    }

    pub async fn create_directory(&self, path: &str, user: UserId) -> Result<ResourceDescriptor> {
        let relative = relative_path(path)?;
        if relative.is_empty() {
            return Err(FsError::InvalidPath(
                "the root directory always exists".to_string(),
            ));
        }

        let dir = with_directory_suffix(&relative);
        let root = user_root_prefix(user);
        let key = format!("{root}{dir}");
        debug!(%user, %key, "create directory");

        if self.storage.exists(&key).await? {
            return Err(FsError::AlreadyExists(format!("/{dir}")));
        }

        let (parent, _) = split_name_and_parent(&dir);
        let parent = normalize(&parent);
        if !parent.is_empty() && !self.storage.exists(&format!("{root}{parent}")).await? {
            return Err(FsError::NotFound(format!("/{parent}")));
        }

        self.storage.put(&key, ObjectBody::empty()).await?;
        info!(%user, %key, "created directory");

        let meta = self.storage.stat(&key).await?;
        resolver::from_meta(&meta, user)
    }

    /// One level of the directory at `path`, without the directory itself
    pub async fn list_directory(&self, path: &str, user: UserId) -> Result<Vec<ResourceDescriptor>> {
        let dir = directory_path(&relative_path(path)?);
        let prefix = format!("{}{dir}", user_root_prefix(user));
        debug!(%user, %prefix, "list directory");

        let entries = self.storage.list(&prefix, false).await?;
        // An existing directory lists at least its own marker
        if entries.is_empty() {
            return Err(FsError::NotFound(format!("/{dir}")));
        }

        entries
            .iter()
            .filter(|entry| entry.key != prefix)
            .map(|entry| resolver::from_entry(entry, user))
            .collect()
    }

    /// Put a marker at `key` unless one is already there.
    /// Returns whether a marker was written.
    pub(crate) async fn ensure_marker(&self, key: &str) -> Result<bool> {
        if self.storage.exists(key).await? {
            return Ok(false);
        }
        self.storage.put(key, ObjectBody::empty()).await?;
        debug!(%key, "created missing directory marker");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;
    use crate::vfs::ResourceKind;

    const USER: UserId = UserId(1);

    async fn service() -> (Arc<MemoryBackend>, DirectoryService) {
        let backend = MemoryBackend::new();
        let service = DirectoryService::new(backend.clone());
        service.create_root_directory(USER).await.unwrap();
        (backend, service)
    }

    #[tokio::test]
    async fn test_create_writes_marker() {
        let (backend, service) = service().await;

        let desc = service.create_directory("/docs", USER).await.unwrap();
        assert_eq!(desc.path, "/");
        assert_eq!(desc.name, "docs/");
        assert_eq!(desc.kind, ResourceKind::Directory);
        assert_eq!(backend.keys(), vec!["user-1-files/", "user-1-files/docs/"]);
    }

    #[tokio::test]
    async fn test_create_requires_parent() {
        let (_, service) = service().await;

        let err = service.create_directory("a/b", USER).await.unwrap_err();
        assert!(matches!(err, FsError::NotFound(_)));

        service.create_directory("a", USER).await.unwrap();
        let desc = service.create_directory("a/b/", USER).await.unwrap();
        assert_eq!(desc.path, "/a/");
        assert_eq!(desc.name, "b/");
    }

    #[tokio::test]
    async fn test_create_root_rejected() {
        let (_, service) = service().await;
        let err = service.create_directory("/", USER).await.unwrap_err();
        assert!(matches!(err, FsError::InvalidPath(_)));
    }

    #[tokio::test]
    async fn test_list_missing_directory() {
        let (_, service) = service().await;
        let err = service.list_directory("nope", USER).await.unwrap_err();
        assert!(matches!(err, FsError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_empty_directory_is_empty() {
        let (_, service) = service().await;
        service.create_directory("docs", USER).await.unwrap();
        assert!(service.list_directory("docs", USER).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let (_, service) = service().await;
        service.create_root_directory(UserId(2)).await.unwrap();
        service.create_directory("mine", USER).await.unwrap();

        assert!(service.list_directory("", UserId(2)).await.unwrap().is_empty());
        assert_eq!(service.list_directory("", USER).await.unwrap().len(), 1);
    }
}
