//! Storage contracts consumed by the services.
//!
//! Implementations own their concurrency and isolation. Every call is
//! expected to be a single round trip; callers bound it with a
//! `RequestScope`, so implementations need not handle cancellation.

use std::sync::Arc;

use async_trait::async_trait;

use comicverse_core::{ProjectId, RepositoryError, TokenId, UserId};

use crate::{Permission, Token};

/// Issued tokens and their revocation flags.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Persist a freshly issued token.
    ///
    /// Token ids are never reused, so saving the same id twice must succeed
    /// and leave the first record untouched.
    async fn save(&self, token: &Token) -> Result<(), RepositoryError>;

    /// Whether the token has been revoked.
    ///
    /// Unknown ids answer `true`: a token this service cannot account for is
    /// not accepted.
    async fn is_revoked(&self, token_id: TokenId) -> Result<bool, RepositoryError>;

    /// Mark a token revoked. Idempotent; unknown ids are a no-op.
    async fn revoke(&self, token_id: TokenId) -> Result<(), RepositoryError>;

    /// Revoke every token issued to `user_id`. Returns how many tokens
    /// transitioned to revoked by this call.
    async fn revoke_all_for_user(&self, user_id: UserId) -> Result<u64, RepositoryError>;
}

/// Explicit `(project, user, capability)` grants.
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    async fn has(&self, permission: &Permission) -> Result<bool, RepositoryError>;

    /// Insert a grant. Granting an existing grant is a no-op.
    async fn grant(&self, permission: &Permission) -> Result<(), RepositoryError>;

    /// Delete a grant. Revoking a missing grant is a no-op.
    async fn revoke(&self, permission: &Permission) -> Result<(), RepositoryError>;

    async fn list_for_project(&self, project_id: ProjectId)
    -> Result<Vec<Permission>, RepositoryError>;
}

/// Read-only view of project ownership.
#[async_trait]
pub trait ProjectLookup: Send + Sync {
    /// Owner of the project, or [`RepositoryError::NotFound`].
    async fn owner_of(&self, project_id: ProjectId) -> Result<UserId, RepositoryError>;
}

#[async_trait]
impl<S> TokenRepository for Arc<S>
where
    S: TokenRepository + ?Sized,
{
    async fn save(&self, token: &Token) -> Result<(), RepositoryError> {
        (**self).save(token).await
    }

    async fn is_revoked(&self, token_id: TokenId) -> Result<bool, RepositoryError> {
        (**self).is_revoked(token_id).await
    }

    async fn revoke(&self, token_id: TokenId) -> Result<(), RepositoryError> {
        (**self).revoke(token_id).await
    }

    async fn revoke_all_for_user(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        (**self).revoke_all_for_user(user_id).await
    }
}

#[async_trait]
impl<S> PermissionRepository for Arc<S>
where
    S: PermissionRepository + ?Sized,
{
    async fn has(&self, permission: &Permission) -> Result<bool, RepositoryError> {
        (**self).has(permission).await
    }

    async fn grant(&self, permission: &Permission) -> Result<(), RepositoryError> {
        (**self).grant(permission).await
    }

    async fn revoke(&self, permission: &Permission) -> Result<(), RepositoryError> {
        (**self).revoke(permission).await
    }

    async fn list_for_project(
        &self,
        project_id: ProjectId,
    ) -> Result<Vec<Permission>, RepositoryError> {
        (**self).list_for_project(project_id).await
    }
}

#[async_trait]
impl<S> ProjectLookup for Arc<S>
where
    S: ProjectLookup + ?Sized,
{
    async fn owner_of(&self, project_id: ProjectId) -> Result<UserId, RepositoryError> {
        (**self).owner_of(project_id).await
    }
}
