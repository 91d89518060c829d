use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;

use comicverse_auth::{Permission, PermissionRepository};
use comicverse_core::{ProjectId, RepositoryError};

use crate::db::poisoned;

/// In-memory grant set. Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryPermissionRepository {
    grants: RwLock<HashSet<Permission>>,
}

impl InMemoryPermissionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PermissionRepository for InMemoryPermissionRepository {
    async fn has(&self, permission: &Permission) -> Result<bool, RepositoryError> {
        let grants = self.grants.read().map_err(|_| poisoned())?;
        Ok(grants.contains(permission))
    }

    async fn grant(&self, permission: &Permission) -> Result<(), RepositoryError> {
        let mut grants = self.grants.write().map_err(|_| poisoned())?;
        grants.insert(permission.clone());
        Ok(())
    }

    async fn revoke(&self, permission: &Permission) -> Result<(), RepositoryError> {
        let mut grants = self.grants.write().map_err(|_| poisoned())?;
        grants.remove(permission);
        Ok(())
    }

    /// Sorted by user, then capability.
    async fn list_for_project(
        &self,
        project_id: ProjectId,
    ) -> Result<Vec<Permission>, RepositoryError> {
        let grants = self.grants.read().map_err(|_| poisoned())?;
        let mut listed: Vec<Permission> = grants
            .iter()
            .filter(|p| p.project_id == project_id)
            .cloned()
            .collect();
        listed.sort_by(|a, b| {
            a.user_id
                .cmp(&b.user_id)
                .then_with(|| a.capability.cmp(&b.capability))
        });
        Ok(listed)
    }
}
