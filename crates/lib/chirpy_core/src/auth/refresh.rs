//! Refresh token lifecycle: issue, redeem, revoke.
//!
//! Tokens are 256 bits from the thread-local CSPRNG, hex-encoded for
//! transport. Only their SHA-256 digest is persisted. Redeeming does not
//! rotate or consume the token; it stays usable until it expires or is
//! revoked.

use std::sync::Arc;

use chrono::Duration;
use rand::{Rng, rng};
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use super::AuthError;
use super::store::RefreshTokenStore;
use crate::clock::Clock;
use crate::models::auth::RefreshTokenRecord;

/// Random bytes per refresh token.
const REFRESH_TOKEN_BYTES: usize = 32;

/// Generate a cryptographically random refresh token (64 hex chars).
pub fn generate_refresh_token() -> String {
    let bytes: [u8; REFRESH_TOKEN_BYTES] = rng().random();
    hex::encode(bytes)
}

/// SHA-256 hash a refresh token for storage.
pub fn hash_refresh_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Sole owner of refresh-token state transitions.
#[derive(Clone)]
pub struct RefreshTokenManager {
    store: Arc<dyn RefreshTokenStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl RefreshTokenManager {
    pub fn new(store: Arc<dyn RefreshTokenStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    /// Mint and persist a token for `user_id`.
    ///
    /// The plaintext is returned only after the record has been stored.
    pub async fn issue(&self, user_id: Uuid) -> Result<String, AuthError> {
        let now = self.clock.now();
        let expires_at = now.checked_add_signed(self.ttl).ok_or_else(|| {
            AuthError::Internal(format!("refresh token ttl {} out of range", self.ttl))
        })?;
        let token = generate_refresh_token();
        let record = RefreshTokenRecord {
            token_hash: hash_refresh_token(&token),
            user_id,
            created_at: now,
            expires_at,
            revoked_at: None,
        };
        self.store.insert(&record).await?;
        info!(%user_id, expires_at = %record.expires_at, "issued refresh token");
        Ok(token)
    }

    /// Resolve a token to its owner if it is neither expired nor revoked.
    pub async fn redeem(&self, token: &str) -> Result<Uuid, AuthError> {
        let record = self
            .store
            .find_by_token(&hash_refresh_token(token))
            .await?
            .ok_or(AuthError::TokenNotFound)?;

        let now = self.clock.now();
        if record.is_usable(now) {
            return Ok(record.user_id);
        }
        if now >= record.expires_at {
            debug!(user_id = %record.user_id, "refresh token expired");
            Err(AuthError::TokenExpired)
        } else {
            debug!(user_id = %record.user_id, "refresh token revoked");
            Err(AuthError::TokenRevoked)
        }
    }

    /// Revoke a token. Unknown and already-revoked tokens are not errors.
    pub async fn revoke(&self, token: &str) -> Result<(), AuthError> {
        let revoked = self
            .store
            .mark_revoked(&hash_refresh_token(token), self.clock.now())
            .await?;
        if revoked {
            info!("revoked refresh token");
        } else {
            debug!("revoke was a no-op (unknown or already revoked)");
        }
        Ok(())
    }
}
