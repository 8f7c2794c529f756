//! Maps absolute object keys back to user-facing descriptors.

use crate::error::{FsError, Result};
use crate::storage::{ObjectEntry, ObjectMeta};

use super::path::{is_directory, split_name_and_parent, user_root_prefix};
use super::{ResourceDescriptor, ResourceKind, UserId};

/// Classify a key by the marker convention: directory keys end with `/`.
/// The bare user root is a directory as well.
pub fn kind_of(relative: &str) -> ResourceKind {
    if relative.is_empty() || is_directory(relative) {
        ResourceKind::Directory
    } else {
        ResourceKind::File
    }
}

/// Build the descriptor for an absolute key owned by `user`.
///
/// Fails with `InvalidPath` when the key lies outside the user's namespace.
pub fn to_descriptor(key: &str, size: u64, user: UserId) -> Result<ResourceDescriptor> {
    let root = user_root_prefix(user);
    let relative = key.strip_prefix(root.as_str()).ok_or_else(|| {
        FsError::InvalidPath(format!("key '{key}' is outside the namespace of user {user}"))
    })?;

    let kind = kind_of(relative);
    let (path, name) = split_name_and_parent(relative);

    Ok(ResourceDescriptor {
        path,
        name,
        size: (!kind.is_dir()).then_some(size),
        kind,
    })
}

pub fn from_meta(meta: &ObjectMeta, user: UserId) -> Result<ResourceDescriptor> {
    to_descriptor(&meta.key, meta.size, user)
}

pub fn from_entry(entry: &ObjectEntry, user: UserId) -> Result<ResourceDescriptor> {
    to_descriptor(&entry.key, entry.size, user)
}
