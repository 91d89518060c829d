use std::sync::Arc;

use async_trait::async_trait;

use comicverse_core::RepositoryError;

use crate::User;

/// Account storage. Usernames are unique.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new account. Returns `false`, leaving storage untouched, when
    /// the username is already taken.
    async fn insert(&self, user: &User) -> Result<bool, RepositoryError>;

    /// Look up by normalized username.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;
}

#[async_trait]
impl<S> UserRepository for Arc<S>
where
    S: UserRepository + ?Sized,
{
    async fn insert(&self, user: &User) -> Result<bool, RepositoryError> {
        (**self).insert(user).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        (**self).find_by_username(username).await
    }
}
