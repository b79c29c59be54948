//! In-memory store backed by `DashMap`.
//!
//! Each token record sits behind its shard lock, so the conditional update
//! in `mark_revoked` is a single read-modify-write per token.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use super::store::{RefreshTokenStore, StoreError, UserStore};
use crate::models::auth::{RefreshTokenRecord, User, UserCredentials};

/// Users and refresh tokens held in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: DashMap<Uuid, UserCredentials>,
    emails: DashMap<String, Uuid>,
    tokens: DashMap<String, RefreshTokenRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn token_count(&self) -> usize {
        self.tokens.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserCredentials>, StoreError> {
        let Some(id) = self.emails.get(email).map(|r| *r.value()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|r| r.value().clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserCredentials>, StoreError> {
        Ok(self.users.get(&id).map(|r| r.value().clone()))
    }

    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let id = Uuid::now_v7();
        match self.emails.entry(email.to_string()) {
            Entry::Occupied(_) => return Err(StoreError::Conflict(format!("email {email}"))),
            Entry::Vacant(v) => {
                v.insert(id);
            }
        }

        let user = User {
            id,
            email: email.to_string(),
            is_chirpy_red: false,
        };
        self.users.insert(
            id,
            UserCredentials {
                user: user.clone(),
                password_hash: password_hash.to_string(),
            },
        );
        Ok(user)
    }

    async fn update_credentials(
        &self,
        id: Uuid,
        email: &str,
        password_hash: &str,
    ) -> Result<Option<User>, StoreError> {
        let Some(old_email) = self.users.get(&id).map(|r| r.user.email.clone()) else {
            return Ok(None);
        };

        if old_email != email {
            match self.emails.entry(email.to_string()) {
                Entry::Occupied(_) => return Err(StoreError::Conflict(format!("email {email}"))),
                Entry::Vacant(v) => {
                    v.insert(id);
                }
            }
            self.emails.remove(&old_email);
        }

        let Some(mut creds) = self.users.get_mut(&id) else {
            return Ok(None);
        };
        creds.user.email = email.to_string();
        creds.password_hash = password_hash.to_string();
        Ok(Some(creds.user.clone()))
    }

    async fn upgrade_to_red(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.get_mut(&id).map(|mut creds| {
            creds.user.is_chirpy_red = true;
            creds.user.clone()
        }))
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryStore {
    async fn insert(&self, record: &RefreshTokenRecord) -> Result<(), StoreError> {
        match self.tokens.entry(record.token_hash.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict("refresh token".into())),
            Entry::Vacant(v) => {
                v.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn find_by_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, StoreError> {
        Ok(self.tokens.get(token_hash).map(|r| r.value().clone()))
    }

    async fn mark_revoked(&self, token_hash: &str, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let Some(mut record) = self.tokens.get_mut(token_hash) else {
            return Ok(false);
        };
        if record.revoked_at.is_some() {
            return Ok(false);
        }
        record.revoked_at = Some(at);
        Ok(true)
    }
}
