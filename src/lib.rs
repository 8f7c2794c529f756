//! A per-user virtual filesystem on top of a single S3 bucket.
//!
//! Every user owns the key prefix `user-<id>-files/`. Files are plain
//! objects below it and directories are zero-byte markers ending in `/`.
//! [`service::DirectoryService`] and [`service::ResourceService`] expose the
//! filesystem operations, [`shell`] drives them interactively.

pub mod archive;
pub mod auth;
pub mod config;
pub mod error;
pub mod s3;
pub mod service;
pub mod shell;
pub mod storage;
pub mod vfs;

pub use error::{FsError, Result};
