use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use comicverse_core::{Canceled, DomainError, RepositoryError, RequestScope};

use crate::password::{self, PasswordError};
use crate::{User, UserRepository, normalize_username};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UserError {
    #[error(transparent)]
    Validation(#[from] DomainError),

    #[error("username is already taken")]
    UsernameTaken,

    /// Unknown username and wrong password are not told apart.
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("user repository unavailable: {0}")]
    RepositoryUnavailable(String),

    #[error("request canceled")]
    Canceled,
}

impl UserError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RepositoryUnavailable(_) | Self::Canceled)
    }
}

impl From<Canceled> for UserError {
    fn from(_: Canceled) -> Self {
        Self::Canceled
    }
}

/// Registration and credential checks. Issuing tokens for an authenticated
/// user is left to the caller.
pub struct UserService<R> {
    repository: R,
}

impl<R> UserService<R>
where
    R: UserRepository,
{
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub async fn register(
        &self,
        username: &str,
        password: &str,
        scope: &RequestScope,
    ) -> Result<User, UserError> {
        self.register_at(username, password, Utc::now(), scope).await
    }

    pub async fn register_at(
        &self,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
        scope: &RequestScope,
    ) -> Result<User, UserError> {
        let username = normalize_username(username)?;
        password::check_password(password)?;
        let user = User::new(username, password::hash_password(password)?, now);

        let inserted = scope
            .run(self.repository.insert(&user))
            .await?
            .map_err(|e| storage_failure("insert", e))?;
        if !inserted {
            return Err(UserError::UsernameTaken);
        }

        info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    /// The account matching `username` and `password`.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
        scope: &RequestScope,
    ) -> Result<User, UserError> {
        let Ok(username) = normalize_username(username) else {
            return Err(UserError::InvalidCredentials);
        };

        let user = scope
            .run(self.repository.find_by_username(&username))
            .await?
            .map_err(|e| storage_failure("find_by_username", e))?
            .ok_or(UserError::InvalidCredentials)?;

        match password::verify_password(password, &user.password_hash) {
            Ok(true) => Ok(user),
            Ok(false) => Err(UserError::InvalidCredentials),
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "stored credentials unusable");
                Err(e.into())
            }
        }
    }
}

fn storage_failure(operation: &'static str, err: RepositoryError) -> UserError {
    match err {
        RepositoryError::NotFound => UserError::InvalidCredentials,
        RepositoryError::Unavailable(msg) => {
            warn!(operation, error = %msg, "user repository call failed");
            UserError::RepositoryUnavailable(msg)
        }
    }
}
