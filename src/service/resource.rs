//! Stat, delete, download, move, upload and search over a user's namespace.
//!
//! Every operation checks its preconditions against the store first and only
//! then mutates. Multi-key operations (directory delete and move) are plain
//! sequences of store calls: a failure halfway leaves the keys already
//! copied in place, there is no rollback and no locking between requests.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWrite;
use tracing::{debug, info, warn};

use super::DirectoryService;
use crate::archive::ZipStreamWriter;
use crate::error::{FsError, Result};
use crate::storage::{ObjectBody, StorageBackend, StorageError};
use crate::vfs::path::{
    ancestors, basename, directory_path, is_directory, normalize, relative_path,
    split_name_and_parent, user_root_prefix,
};
use crate::vfs::{ResourceDescriptor, ResourceKind, UserId, resolver};

/// A file handed to [`ResourceService::upload_resources`]
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// Original file name, may contain `/` to upload into subdirectories
    pub filename: String,
    pub content: ObjectBody,
}

impl UploadFile {
    pub fn new(filename: impl Into<String>, content: impl Into<ObjectBody>) -> Self {
        UploadFile {
            filename: filename.into(),
            content: content.into(),
        }
    }

    /// Upload straight from a local file without reading it into memory
    pub fn from_path(filename: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        UploadFile {
            filename: filename.into(),
            content: ObjectBody::File(path.into()),
        }
    }
}

/// Response headers for a download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadHeaders {
    pub content_type: &'static str,
    pub content_disposition: String,
}

impl DownloadHeaders {
    fn attachment(relative: &str) -> Self {
        let filename = if relative.is_empty() { "/" } else { relative };
        DownloadHeaders {
            content_type: "application/octet-stream",
            content_disposition: format!(
                "attachment; filename=\"{}\"",
                filename.replace('"', "\\\"")
            ),
        }
    }
}

/// A download whose preconditions have been checked but whose body has not
/// been streamed yet
pub struct Download {
    storage: Arc<dyn StorageBackend>,
    key: String,
    kind: ResourceKind,
    headers: DownloadHeaders,
}

impl Download {
    pub fn headers(&self) -> &DownloadHeaders {
        &self.headers
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Stream the body into `sink`: raw bytes for a file, a zip archive for a
    /// directory. Returns the number of payload bytes read from the store.
    pub async fn write_to<W>(self, sink: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let key = self.key.as_str();
        let sink_error = |e: std::io::Error| StorageError::backend("download", key, e);

        if !self.kind.is_dir() {
            let mut reader = self.storage.get(key).await?;
            let copied = tokio::io::copy(&mut reader, sink).await.map_err(sink_error)?;
            return Ok(copied);
        }

        let entries = self.storage.list(key, true).await?;
        let mut zip = ZipStreamWriter::new(sink);
        let mut total = 0;

        for entry in entries.iter().filter(|entry| entry.key != key) {
            let name = &entry.key[key.len()..];
            if is_directory(name) {
                zip.add_directory(name).await.map_err(sink_error)?;
            } else {
                let mut reader = self.storage.get(&entry.key).await?;
                total += zip.add_entry(name, &mut reader).await.map_err(sink_error)?;
            }
        }

        zip.finish().await.map_err(sink_error)?;
        Ok(total)
    }
}

/// Resource manipulation for all users
#[derive(Clone)]
pub struct ResourceService {
    storage: Arc<dyn StorageBackend>,
    directories: DirectoryService,
}

impl ResourceService {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        let directories = DirectoryService::new(Arc::clone(&storage));
        ResourceService {
            storage,
            directories,
        }
    }

    pub fn directories(&self) -> &DirectoryService {
        &self.directories
    }

    async fn require(&self, key: &str, relative: &str) -> Result<()> {
        if self.storage.exists(key).await? {
            Ok(())
        } else {
            Err(FsError::NotFound(format!("/{relative}")))
        }
    }

    async fn describe(&self, key: &str, user: UserId) -> Result<ResourceDescriptor> {
        let meta = self.storage.stat(key).await?;
        resolver::from_meta(&meta, user)
    }

    async fn delete_all(&self, op: &'static str, keys: Vec<String>) -> Result<()> {
        let failures = self.storage.delete_batch(&keys).await?;
        if failures.is_empty() {
            return Ok(());
        }

        for failure in &failures {
            warn!(op, key = %failure.key, reason = %failure.message, "key not deleted");
        }
        Err(StorageError::Incomplete {
            op,
            failed: failures.into_iter().map(|f| f.key).collect(),
        }
        .into())
    }

    pub async fn get_resource(&self, path: &str, user: UserId) -> Result<ResourceDescriptor> {
        let relative = relative_path(path)?;
        let key = format!("{}{relative}", user_root_prefix(user));

        self.require(&key, &relative).await?;
        self.describe(&key, user).await
    }

    pub async fn delete_resource(&self, path: &str, user: UserId) -> Result<()> {
        let relative = relative_path(path)?;
        if relative.is_empty() {
            return Err(FsError::InvalidPath(
                "the root directory cannot be deleted".to_string(),
            ));
        }

        let key = format!("{}{relative}", user_root_prefix(user));
        self.require(&key, &relative).await?;

        if is_directory(&relative) {
            let keys: Vec<String> = self
                .storage
                .list(&key, true)
                .await?
                .into_iter()
                .map(|entry| entry.key)
                .collect();
            debug!(%user, %key, count = keys.len(), "deleting directory");
            self.delete_all("delete", keys).await?;
        } else {
            self.storage.delete(&key).await?;
        }

        info!(%user, %key, "deleted resource");
        Ok(())
    }

    /// Check that `path` exists and work out how it will be delivered
    pub async fn prepare_download(&self, path: &str, user: UserId) -> Result<Download> {
        let relative = relative_path(path)?;
        let key = format!("{}{relative}", user_root_prefix(user));
        self.require(&key, &relative).await?;

        Ok(Download {
            storage: Arc::clone(&self.storage),
            kind: resolver::kind_of(&relative),
            headers: DownloadHeaders::attachment(&relative),
            key,
        })
    }

    /// Check, then stream `path` into `sink`
    pub async fn download_resource<W>(
        &self,
        path: &str,
        user: UserId,
        sink: &mut W,
    ) -> Result<DownloadHeaders>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let download = self.prepare_download(path, user).await?;
        let headers = download.headers().clone();
        download.write_to(sink).await?;
        Ok(headers)
    }

    /// Move or rename `source` to `target`.
    ///
    /// A file moved onto a directory path keeps its name inside that directory.
    /// A directory can only move onto another directory path. The resulting
    /// descriptor is returned.
    pub async fn move_or_rename(
        &self,
        source: &str,
        target: &str,
        user: UserId,
    ) -> Result<ResourceDescriptor> {
        let source = relative_path(source)?;
        let mut target = relative_path(target)?;

        if source.is_empty() {
            return Err(FsError::InvalidPath(
                "the root directory cannot be moved".to_string(),
            ));
        }

        let source_is_dir = is_directory(&source);
        let target_is_dir = target.is_empty() || is_directory(&target);

        if source_is_dir && !target_is_dir {
            return Err(FsError::InvalidPath(format!(
                "directory '/{source}' cannot become file '/{target}'"
            )));
        }
        if !source_is_dir && target_is_dir {
            target = format!("{target}{}", basename(&source));
        }
        if source == target {
            return Err(FsError::InvalidPath(
                "source and target paths must differ".to_string(),
            ));
        }
        if source_is_dir && (target.is_empty() || target.starts_with(&source)) {
            return Err(FsError::InvalidPath(format!(
                "cannot move '/{source}' into '/{target}'"
            )));
        }

        let root = user_root_prefix(user);
        let source_key = format!("{root}{source}");
        let target_key = format!("{root}{target}");

        self.require(&source_key, &source).await?;
        if self.storage.exists(&target_key).await? {
            return Err(FsError::AlreadyExists(format!("/{target}")));
        }

        let parent = normalize(&split_name_and_parent(&target).0);
        if !parent.is_empty() {
            self.require(&format!("{root}{parent}"), &parent).await?;
        }

        if source_is_dir {
            let keys: Vec<String> = self
                .storage
                .list(&source_key, true)
                .await?
                .into_iter()
                .map(|entry| entry.key)
                .collect();

            for key in &keys {
                let moved = format!("{target_key}{}", &key[source_key.len()..]);
                self.storage.copy(key, &moved).await?;
            }
            self.delete_all("move", keys).await?;
        } else {
            self.storage.copy(&source_key, &target_key).await?;
            self.storage.delete(&source_key).await?;
        }

        info!(%user, from = %source_key, to = %target_key, "moved resource");
        self.describe(&target_key, user).await
    }

    /// Upload every file under the directory `path`, creating missing parent
    /// directories on the way. Stops at the first failing file; files already
    /// stored stay stored.
    pub async fn upload_resources(
        &self,
        path: &str,
        files: Vec<UploadFile>,
        user: UserId,
    ) -> Result<Vec<ResourceDescriptor>> {
        if files.is_empty() {
            return Err(FsError::InvalidInput(
                "no files provided for upload".to_string(),
            ));
        }

        let base = directory_path(&relative_path(path)?);
        let root = user_root_prefix(user);

        let mut uploaded = Vec::with_capacity(files.len());
        for file in files {
            uploaded.push(self.upload_file(&root, &base, file, user).await?);
        }
        Ok(uploaded)
    }

    async fn upload_file(
        &self,
        root: &str,
        base: &str,
        file: UploadFile,
        user: UserId,
    ) -> Result<ResourceDescriptor> {
        let name = relative_path(&file.filename)?;
        if name.is_empty() || is_directory(&name) {
            return Err(FsError::InvalidInput(format!(
                "'{}' is not a valid file name",
                file.filename
            )));
        }

        let relative = format!("{base}{name}");
        let key = format!("{root}{relative}");
        if self.storage.exists(&key).await? {
            return Err(FsError::AlreadyExists(format!("/{relative}")));
        }

        for dir in ancestors(&relative) {
            self.directories
                .ensure_marker(&format!("{root}{dir}"))
                .await?;
        }

        self.storage.put(&key, file.content).await?;
        let uploaded = self.describe(&key, user).await?;
        info!(%user, %key, size = uploaded.size, "uploaded file");
        Ok(uploaded)
    }

    /// Every resource whose name contains `query`, at any depth
    pub async fn search(&self, query: &str, user: UserId) -> Result<Vec<ResourceDescriptor>> {
        if query.is_empty() {
            return Err(FsError::InvalidInput(
                "search query must not be empty".to_string(),
            ));
        }

        let root = user_root_prefix(user);
        let entries = self.storage.list(&root, true).await?;
        debug!(%user, query, scanned = entries.len(), "search");

        entries
            .iter()
            .filter(|entry| entry.key != root)
            .filter(|entry| basename(&entry.key[root.len()..]).contains(query))
            .map(|entry| resolver::from_entry(entry, user))
            .collect()
    }

    /// Resources whose relative path starts with `prefix`, one level deep
    pub async fn search_by_prefix(
        &self,
        prefix: &str,
        user: UserId,
    ) -> Result<Vec<ResourceDescriptor>> {
        let root = user_root_prefix(user);
        let key = format!("{root}{}", relative_path(prefix)?);

        self.storage
            .list(&key, false)
            .await?
            .iter()
            .filter(|entry| entry.key != root)
            .map(|entry| resolver::from_entry(entry, user))
            .collect()
    }
}
