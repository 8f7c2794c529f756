use serde::{Deserialize, Serialize};

/// Identity of an authenticated user, passed explicitly to every service call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a resource is a stored object or a synthetic directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResourceKind {
    File,
    Directory,
}

impl ResourceKind {
    pub fn is_dir(self) -> bool {
        self == ResourceKind::Directory
    }
}

/// A resource as shown to the user.
///
/// `path + name` rebuilds the key relative to the user's root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// Slash-terminated parent directory, e.g. `/` or `/docs/`
    pub path: String,
    /// Final segment; directories keep their trailing slash
    pub name: String,
    /// Byte size, absent for directories
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
}

impl ResourceDescriptor {
    /// Path relative to the user's root, as accepted by the services
    pub fn relative_path(&self) -> String {
        super::path::join_parent_and_name(&self.path, &self.name)
    }
}
