use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use comicverse_auth::ProjectLookup;
use comicverse_core::{ProjectId, RepositoryError, UserId};
use comicverse_projects::{Project, ProjectRepository};

use crate::db::poisoned;

/// In-memory project store. Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryProjectRepository {
    projects: RwLock<HashMap<ProjectId, Project>>,
}

impl InMemoryProjectRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectRepository for InMemoryProjectRepository {
    async fn insert(&self, project: &Project) -> Result<(), RepositoryError> {
        let mut projects = self.projects.write().map_err(|_| poisoned())?;
        projects
            .entry(project.id)
            .or_insert_with(|| project.clone());
        Ok(())
    }

    async fn get(&self, project_id: ProjectId) -> Result<Project, RepositoryError> {
        let projects = self.projects.read().map_err(|_| poisoned())?;
        projects
            .get(&project_id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn list_owned_by(&self, owner_id: UserId) -> Result<Vec<Project>, RepositoryError> {
        let projects = self.projects.read().map_err(|_| poisoned())?;
        let mut owned: Vec<Project> = projects
            .values()
            .filter(|p| p.is_owned_by(owner_id))
            .cloned()
            .collect();
        // Newest first; ids are time-ordered so they break ties.
        owned.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(owned)
    }
}

#[async_trait]
impl ProjectLookup for InMemoryProjectRepository {
    async fn owner_of(&self, project_id: ProjectId) -> Result<UserId, RepositoryError> {
        let projects = self.projects.read().map_err(|_| poisoned())?;
        projects
            .get(&project_id)
            .map(|p| p.owner_id)
            .ok_or(RepositoryError::NotFound)
    }
}
