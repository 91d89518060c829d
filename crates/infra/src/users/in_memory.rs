use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use comicverse_core::RepositoryError;
use comicverse_users::{User, UserRepository};

use crate::db::poisoned;

/// In-memory account store, keyed by username. Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, user: &User) -> Result<bool, RepositoryError> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        if users.contains_key(&user.username) || users.values().any(|u| u.id == user.id) {
            return Ok(false);
        }
        users.insert(user.username.clone(), user.clone());
        Ok(true)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users.get(username).cloned())
    }
}
