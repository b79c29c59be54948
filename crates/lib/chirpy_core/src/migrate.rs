//! Database schema setup.
//!
//! Embeds the SQL migrations from `chirpy_core/migrations/` (the `users` and
//! `refresh_tokens` tables).

use sqlx::PgPool;
use tracing::info;

use crate::auth::queries::PgStore;
use crate::auth::store::StoreError;

/// Run all embedded database migrations against the given pool.
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Connect to `database_url`, bring the schema up to date and return a store.
pub async fn connect(database_url: &str) -> Result<PgStore, StoreError> {
    let pool = PgPool::connect(database_url).await?;
    migrate(&pool).await?;
    info!("auth schema is up to date");
    Ok(PgStore::new(pool))
}
