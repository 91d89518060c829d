use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use comicverse_core::{Canceled, ProjectId, RepositoryError, RequestScope, UserId};

use crate::{Capability, Permission, PermissionRepository, ProjectLookup};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PermissionError {
    /// The project does not exist.
    #[error("project not found")]
    NotFound,

    #[error("permission repository unavailable: {0}")]
    RepositoryUnavailable(String),

    #[error("request canceled")]
    Canceled,
}

impl PermissionError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RepositoryUnavailable(_) | Self::Canceled)
    }
}

impl From<Canceled> for PermissionError {
    fn from(_: Canceled) -> Self {
        Self::Canceled
    }
}

/// Outcome of an access check, with the reason it was reached.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessDecision {
    /// The user owns the project; ownership implies every capability.
    Owner,
    /// The user holds an explicit grant for the capability.
    Granted,
    Denied,
}

impl AccessDecision {
    pub fn is_allowed(self) -> bool {
        !matches!(self, Self::Denied)
    }
}

/// Decides whether a user may exercise a capability on a project.
///
/// - Owner: always allowed, regardless of grants.
/// - Anyone else: allowed iff an explicit grant exists.
///
/// Checks are pure reads. Grants and revocations are single idempotent
/// repository calls; no application-level locking.
pub struct PermissionService<P, L> {
    permissions: P,
    projects: L,
}

impl<P, L> PermissionService<P, L>
where
    P: PermissionRepository,
    L: ProjectLookup,
{
    pub fn new(permissions: P, projects: L) -> Self {
        Self {
            permissions,
            projects,
        }
    }

    pub async fn check_access(
        &self,
        user_id: UserId,
        project_id: ProjectId,
        capability: &Capability,
        scope: &RequestScope,
    ) -> Result<bool, PermissionError> {
        self.decide(user_id, project_id, capability, scope)
            .await
            .map(AccessDecision::is_allowed)
    }

    /// Same as [`PermissionService::check_access`], reporting why.
    pub async fn decide(
        &self,
        user_id: UserId,
        project_id: ProjectId,
        capability: &Capability,
        scope: &RequestScope,
    ) -> Result<AccessDecision, PermissionError> {
        let owner = scope
            .run(self.projects.owner_of(project_id))
            .await?
            .map_err(|e| storage_failure("owner_of", e))?;

        let decision = if owner == user_id {
            AccessDecision::Owner
        } else {
            let permission = Permission::new(project_id, user_id, capability.clone());
            let held = scope
                .run(self.permissions.has(&permission))
                .await?
                .map_err(|e| storage_failure("has", e))?;
            if held {
                AccessDecision::Granted
            } else {
                AccessDecision::Denied
            }
        };

        debug!(
            user_id = %user_id,
            project_id = %project_id,
            capability = %capability,
            ?decision,
            "access decided"
        );
        Ok(decision)
    }

    /// Grant `capability` to `user_id`. Granting a held capability is a no-op.
    pub async fn grant(
        &self,
        project_id: ProjectId,
        user_id: UserId,
        capability: Capability,
        scope: &RequestScope,
    ) -> Result<(), PermissionError> {
        let permission = Permission::new(project_id, user_id, capability);
        scope
            .run(self.permissions.grant(&permission))
            .await?
            .map_err(|e| storage_failure("grant", e))?;

        info!(
            project_id = %project_id,
            user_id = %user_id,
            capability = %permission.capability,
            "capability granted"
        );
        Ok(())
    }

    /// Revoke `capability` from `user_id`. Revoking a missing grant is a no-op.
    pub async fn revoke(
        &self,
        project_id: ProjectId,
        user_id: UserId,
        capability: Capability,
        scope: &RequestScope,
    ) -> Result<(), PermissionError> {
        let permission = Permission::new(project_id, user_id, capability);
        scope
            .run(self.permissions.revoke(&permission))
            .await?
            .map_err(|e| storage_failure("revoke", e))?;

        info!(
            project_id = %project_id,
            user_id = %user_id,
            capability = %permission.capability,
            "capability revoked"
        );
        Ok(())
    }

    /// Explicit grants on a project (ownership is not listed).
    pub async fn grants(
        &self,
        project_id: ProjectId,
        scope: &RequestScope,
    ) -> Result<Vec<Permission>, PermissionError> {
        scope
            .run(self.permissions.list_for_project(project_id))
            .await?
            .map_err(|e| storage_failure("list_for_project", e))
    }
}

fn storage_failure(operation: &'static str, err: RepositoryError) -> PermissionError {
    match err {
        RepositoryError::NotFound => PermissionError::NotFound,
        RepositoryError::Unavailable(msg) => {
            warn!(operation, error = %msg, "permission repository call failed");
            PermissionError::RepositoryUnavailable(msg)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct TestStore {
        owners: Mutex<HashMap<ProjectId, UserId>>,
        grants: Mutex<HashSet<Permission>>,
        offline: bool,
        stalled: bool,
    }

    impl TestStore {
        fn with_project(owner: UserId) -> (Self, ProjectId) {
            let store = Self::default();
            let project = ProjectId::new();
            store.owners.lock().unwrap().insert(project, owner);
            (store, project)
        }

        async fn gate(&self) -> Result<(), RepositoryError> {
            if self.stalled {
                std::future::pending::<()>().await;
            }
            if self.offline {
                return Err(RepositoryError::unavailable("pool closed"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl PermissionRepository for TestStore {
        async fn has(&self, permission: &Permission) -> Result<bool, RepositoryError> {
            self.gate().await?;
            Ok(self.grants.lock().unwrap().contains(permission))
        }

        async fn grant(&self, permission: &Permission) -> Result<(), RepositoryError> {
            self.gate().await?;
            self.grants.lock().unwrap().insert(permission.clone());
            Ok(())
        }

        async fn revoke(&self, permission: &Permission) -> Result<(), RepositoryError> {
            self.gate().await?;
            self.grants.lock().unwrap().remove(permission);
            Ok(())
        }

        async fn list_for_project(
            &self,
            project_id: ProjectId,
        ) -> Result<Vec<Permission>, RepositoryError> {
            self.gate().await?;
            Ok(self
                .grants
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.project_id == project_id)
                .cloned()
                .collect())
        }
    }

    #[async_trait]
    impl ProjectLookup for TestStore {
        async fn owner_of(&self, project_id: ProjectId) -> Result<UserId, RepositoryError> {
            self.gate().await?;
            self.owners
                .lock()
                .unwrap()
                .get(&project_id)
                .copied()
                .ok_or(RepositoryError::NotFound)
        }
    }

    fn service(store: TestStore) -> PermissionService<Arc<TestStore>, Arc<TestStore>> {
        let store = Arc::new(store);
        PermissionService::new(store.clone(), store)
    }

    fn scope() -> RequestScope {
        RequestScope::unbounded()
    }

    #[tokio::test]
    async fn owner_has_every_capability_without_grants() {
        let owner = UserId::new();
        let (store, project) = TestStore::with_project(owner);
        let svc = service(store);

        for cap in [Capability::READ, Capability::WRITE, Capability::SHARE] {
            assert_eq!(
                svc.decide(owner, project, &cap, &scope()).await,
                Ok(AccessDecision::Owner)
            );
        }
        assert!(svc.grants(project, &scope()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn grant_then_revoke_round_trip() {
        let owner = UserId::new();
        let guest = UserId::new();
        let (store, project) = TestStore::with_project(owner);
        let svc = service(store);
        let write = Capability::WRITE;

        assert_eq!(svc.check_access(guest, project, &write, &scope()).await, Ok(false));

        svc.grant(project, guest, write.clone(), &scope()).await.unwrap();
        assert_eq!(
            svc.decide(guest, project, &write, &scope()).await,
            Ok(AccessDecision::Granted)
        );
        // A grant covers exactly one capability.
        assert_eq!(
            svc.check_access(guest, project, &Capability::READ, &scope()).await,
            Ok(false)
        );

        svc.revoke(project, guest, write.clone(), &scope()).await.unwrap();
        assert_eq!(svc.check_access(guest, project, &write, &scope()).await, Ok(false));
    }

    #[tokio::test]
    async fn grant_and_revoke_are_idempotent() {
        let (store, project) = TestStore::with_project(UserId::new());
        let svc = service(store);
        let guest = UserId::new();

        svc.grant(project, guest, Capability::READ, &scope()).await.unwrap();
        svc.grant(project, guest, Capability::READ, &scope()).await.unwrap();
        assert_eq!(svc.grants(project, &scope()).await.unwrap().len(), 1);
        assert_eq!(
            svc.check_access(guest, project, &Capability::READ, &scope()).await,
            Ok(true)
        );

        svc.revoke(project, guest, Capability::READ, &scope()).await.unwrap();
        svc.revoke(project, guest, Capability::READ, &scope()).await.unwrap();
        assert!(svc.grants(project, &scope()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn multiple_capabilities_per_user() {
        let (store, project) = TestStore::with_project(UserId::new());
        let svc = service(store);
        let guest = UserId::new();

        svc.grant(project, guest, Capability::READ, &scope()).await.unwrap();
        svc.grant(project, guest, Capability::WRITE, &scope()).await.unwrap();
        svc.revoke(project, guest, Capability::READ, &scope()).await.unwrap();

        assert_eq!(
            svc.check_access(guest, project, &Capability::READ, &scope()).await,
            Ok(false)
        );
        assert_eq!(
            svc.check_access(guest, project, &Capability::WRITE, &scope()).await,
            Ok(true)
        );
    }

    #[tokio::test]
    async fn unknown_project_is_not_found_for_everyone() {
        let owner = UserId::new();
        let (store, _project) = TestStore::with_project(owner);
        let svc = service(store);
        let missing = ProjectId::new();

        for user in [owner, UserId::new()] {
            assert_eq!(
                svc.check_access(user, missing, &Capability::READ, &scope()).await,
                Err(PermissionError::NotFound)
            );
        }
    }

    #[tokio::test]
    async fn offline_store_is_transient() {
        let (mut store, project) = TestStore::with_project(UserId::new());
        store.offline = true;
        let svc = service(store);

        let err = svc
            .check_access(UserId::new(), project, &Capability::READ, &scope())
            .await
            .unwrap_err();
        assert!(matches!(err, PermissionError::RepositoryUnavailable(_)));
        assert!(err.is_transient());
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_store_honours_deadline() {
        let (mut store, project) = TestStore::with_project(UserId::new());
        store.stalled = true;
        let svc = service(store);

        let scope = RequestScope::with_timeout(Duration::from_millis(20));
        assert_eq!(
            svc.grant(project, UserId::new(), Capability::READ, &scope).await,
            Err(PermissionError::Canceled)
        );
        assert!(PermissionError::Canceled.is_transient());
        assert!(!PermissionError::NotFound.is_transient());
    }
}
