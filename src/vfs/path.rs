//! Path normalization and key layout for the per-user namespace.
//!
//! A user sees hierarchical paths such as `docs/reports/q1.pdf`. In the bucket
//! those become flat keys under `user-<id>-files/`. Directories have no object
//! of their own besides a zero-byte marker whose key ends in `/`.

use crate::error::{FsError, Result};

use super::UserId;

pub const DELIMITER: char = '/';

/// Collapse runs of `/` and strip one leading `/`
pub fn normalize(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_slash = false;
    for ch in path.chars() {
        if ch == DELIMITER {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        out.push(ch);
    }

    match out.strip_prefix(DELIMITER) {
        Some(rest) => rest.to_string(),
        None => out,
    }
}

/// Directory paths end with `/`
pub fn is_directory(path: &str) -> bool {
    path.ends_with(DELIMITER)
}

pub fn with_directory_suffix(path: &str) -> String {
    if is_directory(path) {
        path.to_string()
    } else {
        format!("{path}{DELIMITER}")
    }
}

/// Key prefix owning every resource of `user`
pub fn user_root_prefix(user: UserId) -> String {
    format!("user-{user}-files/")
}

/// Normalize a user supplied path and refuse anything that could leave the
/// user's namespace.
pub fn relative_path(path: &str) -> Result<String> {
    let normalized = normalize(path);
    if normalized
        .split(DELIMITER)
        .any(|segment| segment == "." || segment == "..")
    {
        return Err(FsError::InvalidPath(format!(
            "'{path}' must not contain '.' or '..' segments"
        )));
    }
    Ok(normalized)
}

/// Relative path of a directory: the root stays empty, anything else gets `/`
pub fn directory_path(relative: &str) -> String {
    if relative.is_empty() {
        String::new()
    } else {
        with_directory_suffix(relative)
    }
}

/// Split a normalized relative path into `(parent, name)`.
///
/// The parent is slash-terminated and rooted (`/`, `/docs/`). Directory names
/// keep their trailing slash. The root yields `("/", "")`.
pub fn split_name_and_parent(relative: &str) -> (String, String) {
    let directory = is_directory(relative);
    let trimmed = relative.trim_end_matches(DELIMITER);

    let (parent, name) = match trimmed.rfind(DELIMITER) {
        Some(idx) => (format!("/{}", &trimmed[..=idx]), &trimmed[idx + 1..]),
        None => ("/".to_string(), trimmed),
    };

    let name = if directory && !name.is_empty() {
        format!("{name}{DELIMITER}")
    } else {
        name.to_string()
    };
    (parent, name)
}

/// Inverse of [`split_name_and_parent`]
pub fn join_parent_and_name(parent: &str, name: &str) -> String {
    normalize(&format!("{parent}{name}"))
}

/// Final segment of a relative path, without any trailing slash
pub fn basename(relative: &str) -> &str {
    let trimmed = relative.trim_end_matches(DELIMITER);
    trimmed.rsplit(DELIMITER).next().unwrap_or(trimmed)
}

/// Every directory path from the top level down to the parent of `relative`.
///
/// `a/b/c.txt` yields `["a/", "a/b/"]`.
pub fn ancestors(relative: &str) -> Vec<String> {
    let trimmed = relative.trim_end_matches(DELIMITER);
    let segments: Vec<&str> = trimmed.split(DELIMITER).collect();

    segments[..segments.len().saturating_sub(1)]
        .iter()
        .scan(String::new(), |acc, segment| {
            acc.push_str(segment);
            acc.push(DELIMITER);
            Some(acc.clone())
        })
        .collect()
}

/// A location in the shell's view of the namespace
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VirtualPath {
    /// Path segments (e.g., ["docs", "reports"])
    segments: Vec<String>,
}

impl VirtualPath {
    /// The user's root directory
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a path string into a VirtualPath
    pub fn parse(path: &str) -> Self {
        Self::root().join(path)
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            None
        } else {
            let mut segments = self.segments.clone();
            segments.pop();
            Some(VirtualPath { segments })
        }
    }

    /// Join this path with another. An absolute `other` starts over from the root.
    pub fn join(&self, other: &str) -> Self {
        let mut segments = if other.starts_with(DELIMITER) {
            Vec::new()
        } else {
            self.segments.clone()
        };

        for segment in other.split(DELIMITER) {
            match segment {
                "" | "." => continue,
                ".." => {
                    segments.pop();
                }
                _ => segments.push(segment.to_string()),
            }
        }

        VirtualPath { segments }
    }

    /// Relative path understood by the services
    pub fn to_relative(&self, directory: bool) -> String {
        let joined = self.segments.join("/");
        if directory {
            directory_path(&joined)
        } else {
            joined
        }
    }
}

impl std::fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}
