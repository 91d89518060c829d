//! Postgres-backed token store.
//!
//! Tokens are append-only rows; revocation flips `revoked` and never flips it
//! back. A row's absence reads as revoked.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use comicverse_auth::{Token, TokenRepository};
use comicverse_core::{RepositoryError, TokenId, UserId};

use crate::db::map_sqlx_error;

#[derive(Debug, Clone)]
pub struct PostgresTokenRepository {
    pool: Arc<PgPool>,
}

impl PostgresTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Load a stored token, if present.
    #[instrument(skip(self), fields(token_id = %token_id), err)]
    pub async fn get(&self, token_id: TokenId) -> Result<Option<Token>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, issued_at, expires_at, signature, revoked
            FROM tokens
            WHERE id = $1
            "#,
        )
        .bind(token_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_token", e))?;

        row.map(|row| token_from_row(&row)).transpose()
    }
}

fn token_from_row(row: &sqlx::postgres::PgRow) -> Result<Token, RepositoryError> {
    let decode = |e: sqlx::Error| map_sqlx_error("decode_token", e);

    let id: Uuid = row.try_get("id").map_err(decode)?;
    let user_id: Uuid = row.try_get("user_id").map_err(decode)?;
    let issued_at: DateTime<Utc> = row.try_get("issued_at").map_err(decode)?;
    let expires_at: DateTime<Utc> = row.try_get("expires_at").map_err(decode)?;
    let signature: Vec<u8> = row.try_get("signature").map_err(decode)?;
    let revoked: bool = row.try_get("revoked").map_err(decode)?;

    let signature: [u8; 64] = signature
        .try_into()
        .map_err(|_| RepositoryError::unavailable("stored token signature has wrong length"))?;

    Ok(Token::from_parts(
        TokenId::from_uuid(id),
        UserId::from_uuid(user_id),
        issued_at,
        expires_at,
        signature,
        revoked,
    ))
}

#[async_trait]
impl TokenRepository for PostgresTokenRepository {
    #[instrument(skip(self, token), fields(token_id = %token.id(), user_id = %token.user_id()), err)]
    async fn save(&self, token: &Token) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO tokens (id, user_id, issued_at, expires_at, signature, revoked)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(token.id().as_uuid())
        .bind(token.user_id().as_uuid())
        .bind(token.issued_at())
        .bind(token.expires_at())
        .bind(token.signature().to_vec())
        .bind(token.is_revoked())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_token", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(token_id = %token_id), err)]
    async fn is_revoked(&self, token_id: TokenId) -> Result<bool, RepositoryError> {
        let revoked: Option<bool> = sqlx::query_scalar("SELECT revoked FROM tokens WHERE id = $1")
            .bind(token_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("is_revoked", e))?;
        Ok(revoked.unwrap_or(true))
    }

    #[instrument(skip(self), fields(token_id = %token_id), err)]
    async fn revoke(&self, token_id: TokenId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE tokens SET revoked = TRUE WHERE id = $1")
            .bind(token_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("revoke_token", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn revoke_all_for_user(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result =
            sqlx::query("UPDATE tokens SET revoked = TRUE WHERE user_id = $1 AND NOT revoked")
                .bind(user_id.as_uuid())
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("revoke_all_for_user", e))?;
        Ok(result.rows_affected())
    }
}
