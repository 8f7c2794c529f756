use thiserror::Error;

use crate::storage::StorageError;

pub type Result<T, E = FsError> = std::result::Result<T, E>;

/// Failure kinds reported by the filesystem services
#[derive(Debug, Error)]
pub enum FsError {
    #[error("resource '{0}' does not exist")]
    NotFound(String),

    /// Target of a create, move or upload is already occupied
    #[error("resource '{0}' already exists")]
    AlreadyExists(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl FsError {
    /// HTTP status a web front end should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            FsError::NotFound(_) => 404,
            FsError::AlreadyExists(_) => 409,
            FsError::InvalidPath(_) | FsError::InvalidInput(_) => 400,
            FsError::Unauthenticated(_) => 401,
            FsError::Storage(_) => 500,
        }
    }
}
