//! Account registration and login.
//!
//! Successful calls hand back an [`AuthenticatedUser`] whose id is then passed
//! explicitly to every filesystem operation.

pub mod password;
pub mod store;

pub use store::{JsonUserStore, MemoryUserStore, NewUser, User, UserStore};

use std::sync::Arc;
use tracing::info;

use crate::error::{FsError, Result};
use crate::service::DirectoryService;
use crate::vfs::UserId;

const MIN_USERNAME_LEN: usize = 4;
const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 255;

const INVALID_CREDENTIALS: &str = "invalid username or password";

/// The identity every service call runs as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: UserId,
    pub username: String,
}

impl From<User> for AuthenticatedUser {
    fn from(user: User) -> Self {
        AuthenticatedUser {
            id: user.id,
            username: user.username,
        }
    }
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    directories: DirectoryService,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, directories: DirectoryService) -> Self {
        AuthService { users, directories }
    }

    fn validate(username: &str, password: &str) -> Result<()> {
        if username.trim().chars().count() < MIN_USERNAME_LEN {
            return Err(FsError::InvalidInput(format!(
                "username must be at least {MIN_USERNAME_LEN} characters"
            )));
        }
        let len = password.chars().count();
        if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
            return Err(FsError::InvalidInput(format!(
                "password must be {MIN_PASSWORD_LEN} to {MAX_PASSWORD_LEN} characters"
            )));
        }
        Ok(())
    }

    /// Create the account, then its root directory
    pub async fn register(&self, username: &str, password: &str) -> Result<AuthenticatedUser> {
        Self::validate(username, password)?;

        if self.users.exists_by_username(username).await? {
            return Err(FsError::AlreadyExists(username.to_string()));
        }

        let password_hash = password::hash_password(password)
            .map_err(|e| FsError::InvalidInput(format!("password cannot be hashed: {e}")))?;
        let user = self
            .users
            .save(NewUser {
                username: username.to_string(),
                password_hash,
            })
            .await?;

        self.directories.create_root_directory(user.id).await?;
        info!(id = %user.id, username, "registered user");
        Ok(user.into())
    }

    pub async fn authenticate(&self, username: &str, password: &str) -> Result<AuthenticatedUser> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| FsError::Unauthenticated(INVALID_CREDENTIALS.to_string()))?;

        if !password::verify_password(password, &user.password_hash) {
            return Err(FsError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
        }

        Ok(user.into())
    }
}
