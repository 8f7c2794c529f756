use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{FsError, Result};
use crate::storage::StorageError;
use crate::vfs::UserId;

/// A persisted account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
}

/// An account about to be saved; the store assigns the id
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
}

/// Credential store consumed by [`super::AuthService`]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn exists_by_username(&self, username: &str) -> Result<bool> {
        Ok(self.find_by_username(username).await?.is_some())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn save(&self, user: NewUser) -> Result<User>;
}

fn insert(users: &mut Vec<User>, user: NewUser) -> Result<User> {
    if users.iter().any(|u| u.username == user.username) {
        return Err(FsError::AlreadyExists(user.username));
    }

    let id = users.iter().map(|u| u.id.0).max().unwrap_or(0) + 1;
    let user = User {
        id: UserId(id),
        username: user.username,
        password_hash: user.password_hash,
    };
    users.push(user.clone());
    Ok(user)
}

/// Accounts kept for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let users = self.users.lock().await;
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    async fn save(&self, user: NewUser) -> Result<User> {
        let mut users = self.users.lock().await;
        insert(&mut users, user)
    }
}

/// Accounts persisted as a JSON array in a local file
pub struct JsonUserStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonUserStore {
    pub fn new(path: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(JsonUserStore {
            path: path.into(),
            lock: Mutex::new(()),
        })
    }

    fn io_error(&self, e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> FsError {
        StorageError::backend("users", self.path.display().to_string(), e).into()
    }

    async fn load(&self) -> Result<Vec<User>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| self.io_error(e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    async fn store(&self, users: &[User]) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| self.io_error(e))?;
        }
        let json = serde_json::to_vec_pretty(users).map_err(|e| self.io_error(e))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| self.io_error(e))
    }
}

#[async_trait]
impl UserStore for JsonUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let _guard = self.lock.lock().await;
        let users = self.load().await?;
        Ok(users.into_iter().find(|u| u.username == username))
    }

    async fn save(&self, user: NewUser) -> Result<User> {
        let _guard = self.lock.lock().await;
        let mut users = self.load().await?;
        let saved = insert(&mut users, user)?;
        self.store(&users).await?;
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn test_memory_store_assigns_ids() {
        let store = MemoryUserStore::new();
        let alice = store.save(new_user("alice")).await.unwrap();
        let bob = store.save(new_user("bob")).await.unwrap();

        assert_eq!(alice.id, UserId(1));
        assert_eq!(bob.id, UserId(2));
        assert!(store.exists_by_username("alice").await.unwrap());
        assert!(!store.exists_by_username("carol").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let store = MemoryUserStore::new();
        store.save(new_user("alice")).await.unwrap();
        let err = store.save(new_user("alice")).await.unwrap_err();
        assert!(matches!(err, FsError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_json_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("users.json");

        let store = JsonUserStore::new(&path);
        assert!(store.find_by_username("alice").await.unwrap().is_none());
        let saved = store.save(new_user("alice")).await.unwrap();

        let reopened = JsonUserStore::new(&path);
        let found = reopened.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found, saved);
        assert_eq!(reopened.save(new_user("bob")).await.unwrap().id, UserId(2));
    }
}
