use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use comicverse_auth::ProjectLookup;
use comicverse_core::{ProjectId, RepositoryError, UserId};
use comicverse_projects::{Project, ProjectRepository};

use crate::db::map_sqlx_error;

/// Postgres-backed project store.
#[derive(Debug, Clone)]
pub struct PostgresProjectRepository {
    pool: Arc<PgPool>,
}

impl PostgresProjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

struct ProjectRow {
    id: Uuid,
    title: String,
    owner_id: Uuid,
    created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for ProjectRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProjectRow {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            owner_id: row.try_get("owner_id")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Project {
            id: ProjectId::from_uuid(row.id),
            title: row.title,
            owner_id: UserId::from_uuid(row.owner_id),
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl ProjectRepository for PostgresProjectRepository {
    #[instrument(skip(self, project), fields(project_id = %project.id, owner_id = %project.owner_id), err)]
    async fn insert(&self, project: &Project) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO projects (id, title, owner_id, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(project.id.as_uuid())
        .bind(&project.title)
        .bind(project.owner_id.as_uuid())
        .bind(project.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_project", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(project_id = %project_id), err)]
    async fn get(&self, project_id: ProjectId) -> Result<Project, RepositoryError> {
        let row: Option<ProjectRow> = sqlx::query_as(
            "SELECT id, title, owner_id, created_at FROM projects WHERE id = $1",
        )
        .bind(project_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_project", e))?;

        row.map(Project::from).ok_or(RepositoryError::NotFound)
    }

    #[instrument(skip(self), fields(owner_id = %owner_id), err)]
    async fn list_owned_by(&self, owner_id: UserId) -> Result<Vec<Project>, RepositoryError> {
        let rows: Vec<ProjectRow> = sqlx::query_as(
            r#"
            SELECT id, title, owner_id, created_at
            FROM projects
            WHERE owner_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(owner_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_projects", e))?;

        Ok(rows.into_iter().map(Project::from).collect())
    }
}

#[async_trait]
impl ProjectLookup for PostgresProjectRepository {
    #[instrument(skip(self), fields(project_id = %project_id), err)]
    async fn owner_of(&self, project_id: ProjectId) -> Result<UserId, RepositoryError> {
        let owner: Option<Uuid> = sqlx::query_scalar("SELECT owner_id FROM projects WHERE id = $1")
            .bind(project_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("owner_of", e))?;

        owner.map(UserId::from_uuid).ok_or(RepositoryError::NotFound)
    }
}
