use std::sync::Arc;

use async_trait::async_trait;

use comicverse_core::{ProjectId, RepositoryError, UserId};

use crate::Project;

/// Project storage.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Persist a new project. Ids are fresh, so there is no update path.
    async fn insert(&self, project: &Project) -> Result<(), RepositoryError>;

    /// Fetch a project, or [`RepositoryError::NotFound`].
    async fn get(&self, project_id: ProjectId) -> Result<Project, RepositoryError>;

    /// Projects owned by `owner_id`, newest first.
    async fn list_owned_by(&self, owner_id: UserId) -> Result<Vec<Project>, RepositoryError>;
}

#[async_trait]
impl<S> ProjectRepository for Arc<S>
where
    S: ProjectRepository + ?Sized,
{
    async fn insert(&self, project: &Project) -> Result<(), RepositoryError> {
        (**self).insert(project).await
    }

    async fn get(&self, project_id: ProjectId) -> Result<Project, RepositoryError> {
        (**self).get(project_id).await
    }

    async fn list_owned_by(&self, owner_id: UserId) -> Result<Vec<Project>, RepositoryError> {
        (**self).list_owned_by(owner_id).await
    }
}
