use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use comicverse_core::{Canceled, DomainError, ProjectId, RepositoryError, RequestScope, UserId};

use crate::{Project, ProjectRepository};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProjectError {
    #[error(transparent)]
    Validation(#[from] DomainError),

    #[error("project not found")]
    NotFound,

    #[error("project repository unavailable: {0}")]
    RepositoryUnavailable(String),

    #[error("request canceled")]
    Canceled,
}

impl ProjectError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RepositoryUnavailable(_) | Self::Canceled)
    }
}

impl From<Canceled> for ProjectError {
    fn from(_: Canceled) -> Self {
        Self::Canceled
    }
}

/// Creates and reads projects. Does not check access; callers do that through
/// the permission service first.
pub struct ProjectService<R> {
    repository: R,
}

impl<R> ProjectService<R>
where
    R: ProjectRepository,
{
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub async fn create(
        &self,
        title: &str,
        owner_id: UserId,
        scope: &RequestScope,
    ) -> Result<Project, ProjectError> {
        self.create_at(title, owner_id, Utc::now(), scope).await
    }

    pub async fn create_at(
        &self,
        title: &str,
        owner_id: UserId,
        now: DateTime<Utc>,
        scope: &RequestScope,
    ) -> Result<Project, ProjectError> {
        let project = Project::new(title, owner_id, now)?;

        scope
            .run(self.repository.insert(&project))
            .await?
            .map_err(|e| storage_failure("insert", e))?;

        info!(project_id = %project.id, owner_id = %owner_id, "project created");
        Ok(project)
    }

    pub async fn get(
        &self,
        project_id: ProjectId,
        scope: &RequestScope,
    ) -> Result<Project, ProjectError> {
        scope
            .run(self.repository.get(project_id))
            .await?
            .map_err(|e| storage_failure("get", e))
    }

    /// Newest first.
    pub async fn list_owned_by(
        &self,
        owner_id: UserId,
        scope: &RequestScope,
    ) -> Result<Vec<Project>, ProjectError> {
        scope
            .run(self.repository.list_owned_by(owner_id))
            .await?
            .map_err(|e| storage_failure("list_owned_by", e))
    }
}

fn storage_failure(operation: &'static str, err: RepositoryError) -> ProjectError {
    match err {
        RepositoryError::NotFound => ProjectError::NotFound,
        RepositoryError::Unavailable(msg) => {
            warn!(operation, error = %msg, "project repository call failed");
            ProjectError::RepositoryUnavailable(msg)
        }
    }
}
