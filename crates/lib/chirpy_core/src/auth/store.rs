//! Persistence collaborators consumed by the auth core.
//!
//! Stores hold bytes and enforce no policy; expiry and revocation rules live
//! in [`RefreshTokenManager`](super::refresh::RefreshTokenManager).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::auth::{RefreshTokenRecord, User, UserCredentials};

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// A uniqueness constraint was violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// User lookup and credential updates.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserCredentials>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserCredentials>, StoreError>;

    /// Create a user. Fails with [`StoreError::Conflict`] if the email is taken.
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError>;

    /// Replace a user's email and password hash. `None` if the user does not exist.
    async fn update_credentials(
        &self,
        id: Uuid,
        email: &str,
        password_hash: &str,
    ) -> Result<Option<User>, StoreError>;

    /// Mark a user as a Chirpy Red member. `None` if the user does not exist.
    async fn upgrade_to_red(&self, id: Uuid) -> Result<Option<User>, StoreError>;
}

/// Refresh token persistence, keyed by token hash.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn insert(&self, record: &RefreshTokenRecord) -> Result<(), StoreError>;

    async fn find_by_token(&self, token_hash: &str)
    -> Result<Option<RefreshTokenRecord>, StoreError>;

    /// Set `revoked_at = at` if it is not already set.
    ///
    /// Returns `true` if this call performed the revocation.
    async fn mark_revoked(&self, token_hash: &str, at: DateTime<Utc>) -> Result<bool, StoreError>;
}
