//! Postgres-backed user and refresh-token store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::store::{RefreshTokenStore, StoreError, UserStore};
use crate::models::auth::{RefreshTokenRecord, User, UserCredentials};

/// Auth store over a shared connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Map unique violations to [`StoreError::Conflict`].
fn map_insert_error(e: sqlx::Error, what: &str) -> StoreError {
    match e.as_database_error() {
        Some(db) if db.is_unique_violation() => StoreError::Conflict(what.to_string()),
        _ => StoreError::Db(e),
    }
}

type UserRow = (Uuid, String, bool);

fn user((id, email, is_chirpy_red): UserRow) -> User {
    User {
        id,
        email,
        is_chirpy_red,
    }
}

fn credentials(
    (id, email, is_chirpy_red, password_hash): (Uuid, String, bool, String),
) -> UserCredentials {
    UserCredentials {
        user: user((id, email, is_chirpy_red)),
        password_hash,
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserCredentials>, StoreError> {
        let row = sqlx::query_as::<_, (Uuid, String, bool, String)>(
            "SELECT id, email, is_chirpy_red, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(credentials))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserCredentials>, StoreError> {
        let row = sqlx::query_as::<_, (Uuid, String, bool, String)>(
            "SELECT id, email, is_chirpy_red, hashed_password FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(credentials))
    }

    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (email, hashed_password) VALUES ($1, $2) \
             RETURNING id, email, is_chirpy_red",
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "email already registered"))?;
        Ok(user(row))
    }

    async fn update_credentials(
        &self,
        id: Uuid,
        email: &str,
        password_hash: &str,
    ) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "UPDATE users SET email = $2, hashed_password = $3, updated_at = now() \
             WHERE id = $1 \
             RETURNING id, email, is_chirpy_red",
        )
        .bind(id)
        .bind(email)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "email already registered"))?;
        Ok(row.map(user))
    }

    async fn upgrade_to_red(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "UPDATE users SET is_chirpy_red = TRUE, updated_at = now() \
             WHERE id = $1 \
             RETURNING id, email, is_chirpy_red",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(user))
    }
}

#[async_trait]
impl RefreshTokenStore for PgStore {
    async fn insert(&self, record: &RefreshTokenRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO refresh_tokens (token_hash, user_id, created_at, updated_at, expires_at, revoked_at) \
             VALUES ($1, $2, $3, $3, $4, $5)",
        )
        .bind(&record.token_hash)
        .bind(record.user_id)
        .bind(record.created_at)
        .bind(record.expires_at)
        .bind(record.revoked_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "refresh token"))?;
        Ok(())
    }

    async fn find_by_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let row = sqlx::query_as::<
            _,
            (
                String,
                Uuid,
                DateTime<Utc>,
                DateTime<Utc>,
                Option<DateTime<Utc>>,
            ),
        >(
            "SELECT token_hash, user_id, created_at, expires_at, revoked_at \
             FROM refresh_tokens \
             WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(token_hash, user_id, created_at, expires_at, revoked_at)| RefreshTokenRecord {
                token_hash,
                user_id,
                created_at,
                expires_at,
                revoked_at,
            },
        ))
    }

    async fn mark_revoked(&self, token_hash: &str, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = $2, updated_at = $2 \
             WHERE token_hash = $1 AND revoked_at IS NULL",
        )
        .bind(token_hash)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
