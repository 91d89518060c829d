//! Postgres-backed grant store.
//!
//! The composite primary key makes `grant` idempotent via `ON CONFLICT DO
//! NOTHING`; `revoke` is a plain delete.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use comicverse_auth::{Capability, Permission, PermissionRepository};
use comicverse_core::{ProjectId, RepositoryError, UserId};

use crate::db::map_sqlx_error;

#[derive(Debug, Clone)]
pub struct PostgresPermissionRepository {
    pool: Arc<PgPool>,
}

impl PostgresPermissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl PermissionRepository for PostgresPermissionRepository {
    #[instrument(skip(self, permission), fields(project_id = %permission.project_id, user_id = %permission.user_id, capability = %permission.capability), err)]
    async fn has(&self, permission: &Permission) -> Result<bool, RepositoryError> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM project_permissions
                WHERE project_id = $1 AND user_id = $2 AND capability = $3
            )
            "#,
        )
        .bind(permission.project_id.as_uuid())
        .bind(permission.user_id.as_uuid())
        .bind(permission.capability.as_str())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("has_permission", e))
    }

    #[instrument(skip(self, permission), fields(project_id = %permission.project_id, user_id = %permission.user_id, capability = %permission.capability), err)]
    async fn grant(&self, permission: &Permission) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO project_permissions (project_id, user_id, capability)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(permission.project_id.as_uuid())
        .bind(permission.user_id.as_uuid())
        .bind(permission.capability.as_str())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("grant_permission", e))?;
        Ok(())
    }

    #[instrument(skip(self, permission), fields(project_id = %permission.project_id, user_id = %permission.user_id, capability = %permission.capability), err)]
    async fn revoke(&self, permission: &Permission) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            DELETE FROM project_permissions
            WHERE project_id = $1 AND user_id = $2 AND capability = $3
            "#,
        )
        .bind(permission.project_id.as_uuid())
        .bind(permission.user_id.as_uuid())
        .bind(permission.capability.as_str())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("revoke_permission", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(project_id = %project_id), err)]
    async fn list_for_project(
        &self,
        project_id: ProjectId,
    ) -> Result<Vec<Permission>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, capability
            FROM project_permissions
            WHERE project_id = $1
            ORDER BY user_id, capability
            "#,
        )
        .bind(project_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_permissions", e))?;

        rows.iter()
            .map(|row| {
                let user_id: Uuid = row
                    .try_get("user_id")
                    .map_err(|e| map_sqlx_error("decode_permission", e))?;
                let capability: String = row
                    .try_get("capability")
                    .map_err(|e| map_sqlx_error("decode_permission", e))?;
                let capability = Capability::parse(capability).map_err(|e| {
                    RepositoryError::unavailable(format!("stored capability is invalid: {e}"))
                })?;
                Ok(Permission::new(
                    project_id,
                    UserId::from_uuid(user_id),
                    capability,
                ))
            })
            .collect()
    }
}
