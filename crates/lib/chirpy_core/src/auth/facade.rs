//! Authorization facade: the flows the request-handling layer calls.
//!
//! Every flow returns either an identity/token or a normalized
//! [`AuthError`]: authentication failures collapse to `Unauthorized`
//! (`InvalidCredentials` for login), while storage failures stay
//! `Persistence` so callers can answer with a server error instead.

use std::sync::{Arc, LazyLock};

use http::HeaderMap;
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::AuthError;
use super::header::{extract_api_key, extract_bearer};
use super::jwt::{issue_access_token_at, validate_access_token_at};
use super::password::{hash_password, verify_password};
use super::refresh::RefreshTokenManager;
use super::store::{RefreshTokenStore, StoreError, UserStore};
use crate::clock::{Clock, SystemClock};
use crate::config::AuthConfig;
use crate::metrics::AuthMetrics;
use crate::models::auth::{LoginResponse, User};

/// Verified against when the email is unknown, so a miss costs one bcrypt
/// round like a hit does.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("chirpy-login-timing-equaliser").ok());

/// Webhook event that grants Chirpy Red membership.
pub const USER_UPGRADED_EVENT: &str = "user.upgraded";

/// Entry point for every authentication flow.
pub struct Authorizer {
    config: AuthConfig,
    users: Arc<dyn UserStore>,
    refresh_tokens: RefreshTokenManager,
    clock: Arc<dyn Clock>,
    metrics: Arc<AuthMetrics>,
}

impl Authorizer {
    /// Create an authorizer on the system clock.
    pub fn new(
        config: AuthConfig,
        users: Arc<dyn UserStore>,
        tokens: Arc<dyn RefreshTokenStore>,
    ) -> Self {
        Self::with_clock(config, users, tokens, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: AuthConfig,
        users: Arc<dyn UserStore>,
        tokens: Arc<dyn RefreshTokenStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        LazyLock::force(&DUMMY_HASH);
        let refresh_tokens =
            RefreshTokenManager::new(tokens, clock.clone(), config.refresh_token_ttl);
        Self {
            config,
            users,
            refresh_tokens,
            clock,
            metrics: Arc::new(AuthMetrics::new()),
        }
    }

    /// Outcome counters, shared with whoever wants to report them.
    pub fn metrics(&self) -> Arc<AuthMetrics> {
        self.metrics.clone()
    }

    /// Create an account with a freshly hashed password.
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AuthError> {
        validate_new_credentials(email, password)?;
        let pw_hash = hash_password(password)?;
        let user = self
            .users
            .create_user(email, &pw_hash)
            .await
            .map_err(conflict_as_validation)?;
        info!(user_id = %user.id, "registered user");
        Ok(user)
    }

    /// Authenticate with email + password and issue an access/refresh token pair.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AuthError> {
        let result = self.login_inner(email, password).await;
        self.record(result.as_ref().map(|_| ()));
        result.map_err(AuthError::normalize)
    }

    async fn login_inner(&self, email: &str, password: &str) -> Result<LoginResponse, AuthError> {
        let creds = match self.users.find_by_email(email).await? {
            Some(c) => c,
            None => {
                if let Some(dummy) = DUMMY_HASH.as_deref() {
                    let _ = verify_password(password, dummy);
                }
                debug!("login rejected: unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        match verify_password(password, &creds.password_hash) {
            Ok(true) => {}
            Ok(false) => {
                debug!(user_id = %creds.user.id, "login rejected: password mismatch");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                warn!(user_id = %creds.user.id, error = %e, "stored password hash is malformed");
                return Err(AuthError::InvalidCredentials);
            }
        }

        let access_token = self.issue_access(creds.user.id)?;
        let refresh_token = self.refresh_tokens.issue(creds.user.id).await?;
        info!(user_id = %creds.user.id, "user logged in");

        Ok(LoginResponse {
            user: creds.user,
            access_token,
            refresh_token,
        })
    }

    /// Resolve `Authorization: Bearer <access token>` to a user id.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Uuid, AuthError> {
        let result = extract_bearer(headers).and_then(|token| {
            validate_access_token_at(&token, &self.config.signing_secret, self.clock.now())
        });
        self.finish("authenticate", result)
    }

    /// Exchange `Authorization: Bearer <refresh token>` for a new access token.
    ///
    /// The refresh token itself is left untouched.
    pub async fn refresh(&self, headers: &HeaderMap) -> Result<String, AuthError> {
        let result = async {
            let token = extract_bearer(headers)?;
            let user_id = self.refresh_tokens.redeem(&token).await?;
            self.issue_access(user_id)
        }
        .await;
        self.finish("refresh", result)
    }

    /// Revoke the refresh token in `Authorization: Bearer <refresh token>`.
    ///
    /// Succeeds for unknown or already-revoked tokens.
    pub async fn revoke_refresh(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let result = async {
            let token = extract_bearer(headers)?;
            self.refresh_tokens.revoke(&token).await
        }
        .await;
        self.finish("revoke", result)
    }

    /// Check `Authorization: ApiKey <key>` against the configured webhook key.
    pub fn authenticate_webhook(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let result = extract_api_key(headers).and_then(|key| {
            let expected = self.config.api_key.as_bytes();
            if bool::from(key.as_bytes().ct_eq(expected)) {
                Ok(())
            } else {
                Err(AuthError::Unauthorized)
            }
        });
        self.finish("webhook", result)
    }

    /// Apply a payment-provider webhook event.
    ///
    /// `user.upgraded` marks `user_id` as a Chirpy Red member; other events
    /// are accepted and ignored.
    pub async fn handle_webhook(
        &self,
        headers: &HeaderMap,
        event: &str,
        user_id: Option<&str>,
    ) -> Result<(), AuthError> {
        self.authenticate_webhook(headers)?;
        if event != USER_UPGRADED_EVENT {
            debug!(event, "ignoring webhook event");
            return Ok(());
        }

        let raw = user_id.ok_or_else(|| AuthError::ValidationError("Missing user id".into()))?;
        let user_id = Uuid::parse_str(raw)
            .map_err(|_| AuthError::ValidationError("Invalid user id".into()))?;
        let user = self
            .users
            .upgrade_to_red(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        info!(user_id = %user.id, "upgraded user to Chirpy Red");
        Ok(())
    }

    /// Replace the authenticated user's email and password.
    pub async fn update_credentials(
        &self,
        headers: &HeaderMap,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let user_id = self.authenticate(headers)?;
        validate_new_credentials(email, password)?;
        let pw_hash = hash_password(password)?;
        let user = self
            .users
            .update_credentials(user_id, email, &pw_hash)
            .await
            .map_err(conflict_as_validation)?
            .ok_or(AuthError::Unauthorized)?;
        info!(user_id = %user.id, "updated user credentials");
        Ok(user)
    }

    fn issue_access(&self, user_id: Uuid) -> Result<String, AuthError> {
        issue_access_token_at(
            user_id,
            &self.config.signing_secret,
            self.config.access_token_ttl,
            self.clock.now(),
        )
    }

    fn finish<T>(&self, flow: &'static str, result: Result<T, AuthError>) -> Result<T, AuthError> {
        self.record(result.as_ref().map(|_| ()));
        result.map_err(|e| {
            if e.is_auth_failure() {
                debug!(flow, reason = %e, "credential rejected");
            } else {
                warn!(flow, error = %e, "authentication flow failed");
            }
            e.normalize()
        })
    }

    fn record(&self, outcome: Result<(), &AuthError>) {
        match outcome {
            Ok(()) => self.metrics.granted.increment(),
            Err(_) => self.metrics.denied.increment(),
        };
    }
}

fn validate_new_credentials(email: &str, password: &str) -> Result<(), AuthError> {
    if email.trim().is_empty() {
        return Err(AuthError::ValidationError("Email must not be empty".into()));
    }
    if password.is_empty() {
        return Err(AuthError::ValidationError("Password must not be empty".into()));
    }
    Ok(())
}

fn conflict_as_validation(e: StoreError) -> AuthError {
    match e {
        StoreError::Conflict(_) => AuthError::ValidationError("Email already registered".into()),
        e => AuthError::Persistence(e),
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};
    use http::HeaderValue;
    use http::header::AUTHORIZATION;

    use super::*;
    use crate::auth::jwt::validate_access_token;
    use crate::auth::memory::MemoryStore;
    use crate::clock::ManualClock;
    use crate::models::auth::{RefreshTokenRecord, UserCredentials};

    const SECRET: &[u8] = b"test-signing-secret";
    const API_KEY: &str = "f271c81ff7084ee5b99a5091b42d486e";

    fn setup() -> (Authorizer, Arc<ManualClock>) {
        let (auth, _, clock) = setup_with(AuthConfig::new(SECRET.to_vec(), API_KEY));
        (auth, clock)
    }

    fn setup_with(config: AuthConfig) -> (Authorizer, Arc<MemoryStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let auth = Authorizer::with_clock(config, store.clone(), store.clone(), clock.clone());
        (auth, store, clock)
    }

    fn authz(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    fn bearer(token: &str) -> HeaderMap {
        authz(&format!("Bearer {token}"))
    }

    #[tokio::test]
    async fn login_issues_working_token_pair() {
        let (auth, _) = setup();
        let user = auth.register("walt@example.com", "hunter2").await.unwrap();

        let resp = auth.login("walt@example.com", "hunter2").await.unwrap();
        assert_eq!(resp.user, user);
        assert_eq!(validate_access_token(&resp.access_token, SECRET).unwrap(), user.id);
        assert_eq!(auth.authenticate(&bearer(&resp.access_token)).unwrap(), user.id);
        assert_eq!(resp.refresh_token.len(), 64);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_are_indistinguishable() {
        let (auth, _) = setup();
        auth.register("walt@example.com", "hunter2").await.unwrap();

        let wrong_pw = auth.login("walt@example.com", "nope").await.unwrap_err();
        let unknown = auth.login("jesse@example.com", "hunter2").await.unwrap_err();
        assert!(matches!(wrong_pw, AuthError::InvalidCredentials));
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert_eq!(wrong_pw.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn register_rejects_duplicates_and_empty_fields() {
        let (auth, _) = setup();
        auth.register("walt@example.com", "hunter2").await.unwrap();
        assert!(matches!(
            auth.register("walt@example.com", "other").await.unwrap_err(),
            AuthError::ValidationError(_)
        ));
        assert!(matches!(
            auth.register("", "pw").await.unwrap_err(),
            AuthError::ValidationError(_)
        ));
        assert!(matches!(
            auth.register("a@example.com", "").await.unwrap_err(),
            AuthError::ValidationError(_)
        ));
    }

    #[tokio::test]
    async fn authenticate_rejects_bad_headers_and_tokens() {
        let (auth, _) = setup();
        assert!(matches!(
            auth.authenticate(&HeaderMap::new()).unwrap_err(),
            AuthError::Unauthorized
        ));
        assert!(matches!(
            auth.authenticate(&bearer("garbage")).unwrap_err(),
            AuthError::Unauthorized
        ));

        let foreign =
            issue_access_token_at(Uuid::new_v4(), b"other", Duration::hours(1), Utc::now())
                .unwrap();
        assert!(matches!(
            auth.authenticate(&bearer(&foreign)).unwrap_err(),
            AuthError::Unauthorized
        ));
    }

    #[tokio::test]
    async fn access_token_expires_after_one_hour() {
        let (auth, clock) = setup();
        auth.register("walt@example.com", "hunter2").await.unwrap();
        let resp = auth.login("walt@example.com", "hunter2").await.unwrap();

        clock.advance(Duration::minutes(59));
        assert!(auth.authenticate(&bearer(&resp.access_token)).is_ok());
        clock.advance(Duration::minutes(1));
        assert!(matches!(
            auth.authenticate(&bearer(&resp.access_token)).unwrap_err(),
            AuthError::Unauthorized
        ));
    }

    #[tokio::test]
    async fn refresh_mints_access_tokens_without_rotating() {
        let (auth, clock) = setup();
        let user = auth.register("walt@example.com", "hunter2").await.unwrap();
        let resp = auth.login("walt@example.com", "hunter2").await.unwrap();

        for _ in 0..3 {
            clock.advance(Duration::hours(2));
            let access = auth.refresh(&bearer(&resp.refresh_token)).await.unwrap();
            assert_eq!(auth.authenticate(&bearer(&access)).unwrap(), user.id);
        }
    }

    #[tokio::test]
    async fn access_token_is_not_a_refresh_token() {
        let (auth, _) = setup();
        auth.register("walt@example.com", "hunter2").await.unwrap();
        let resp = auth.login("walt@example.com", "hunter2").await.unwrap();
        assert!(matches!(
            auth.refresh(&bearer(&resp.access_token)).await.unwrap_err(),
            AuthError::Unauthorized
        ));
    }

    #[tokio::test]
    async fn revoked_refresh_token_stops_working() {
        let (auth, _) = setup();
        auth.register("walt@example.com", "hunter2").await.unwrap();
        let resp = auth.login("walt@example.com", "hunter2").await.unwrap();
        let headers = bearer(&resp.refresh_token);

        auth.revoke_refresh(&headers).await.unwrap();
        assert!(matches!(
            auth.refresh(&headers).await.unwrap_err(),
            AuthError::Unauthorized
        ));
        auth.revoke_refresh(&headers).await.unwrap();
        auth.revoke_refresh(&bearer("never-issued")).await.unwrap();
        assert!(matches!(
            auth.revoke_refresh(&HeaderMap::new()).await.unwrap_err(),
            AuthError::Unauthorized
        ));
    }

    #[tokio::test]
    async fn refresh_token_expires_after_sixty_days() {
        let (auth, clock) = setup();
        auth.register("walt@example.com", "hunter2").await.unwrap();
        let resp = auth.login("walt@example.com", "hunter2").await.unwrap();

        clock.advance(Duration::days(61));
        assert!(matches!(
            auth.refresh(&bearer(&resp.refresh_token)).await.unwrap_err(),
            AuthError::Unauthorized
        ));
    }

    #[tokio::test]
    async fn webhook_requires_configured_key() {
        let (auth, _) = setup();
        assert!(auth.authenticate_webhook(&authz(&format!("ApiKey {API_KEY}"))).is_ok());
        assert!(matches!(
            auth.authenticate_webhook(&authz("ApiKey wrongkey")).unwrap_err(),
            AuthError::Unauthorized
        ));
        assert!(matches!(
            auth.authenticate_webhook(&HeaderMap::new()).unwrap_err(),
            AuthError::Unauthorized
        ));
        assert!(auth.authenticate_webhook(&bearer(API_KEY)).is_err());
    }

    #[tokio::test]
    async fn upgrade_event_grants_chirpy_red() {
        let (auth, store, _) = setup_with(AuthConfig::new(SECRET.to_vec(), API_KEY));
        let user = auth.register("walt@example.com", "hunter2").await.unwrap();
        let key = authz(&format!("ApiKey {API_KEY}"));
        let id = user.id.to_string();

        auth.handle_webhook(&key, USER_UPGRADED_EVENT, Some(&id))
            .await
            .unwrap();
        let creds = store.find_by_id(user.id).await.unwrap().unwrap();
        assert!(creds.user.is_chirpy_red);

        let resp = auth.login("walt@example.com", "hunter2").await.unwrap();
        assert!(resp.user.is_chirpy_red);
    }

    #[tokio::test]
    async fn webhook_rejects_bad_key_and_bad_user_ids() {
        let (auth, _) = setup();
        let key = authz(&format!("ApiKey {API_KEY}"));
        let missing = Uuid::new_v4().to_string();

        let err = auth
            .handle_webhook(&authz("ApiKey wrongkey"), USER_UPGRADED_EVENT, Some(&missing))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), http::StatusCode::UNAUTHORIZED);

        let err = auth
            .handle_webhook(&key, USER_UPGRADED_EVENT, None)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);

        let err = auth
            .handle_webhook(&key, USER_UPGRADED_EVENT, Some("not-a-uuid"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);

        let err = auth
            .handle_webhook(&key, USER_UPGRADED_EVENT, Some(&missing))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));
        assert_eq!(err.status_code(), http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn other_webhook_events_are_ignored() {
        let (auth, _) = setup();
        let key = authz(&format!("ApiKey {API_KEY}"));
        auth.handle_webhook(&key, "user.payment_failed", None)
            .await
            .unwrap();
        auth.handle_webhook(&key, "user.payment_failed", Some("garbage"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn failed_access_signing_leaves_no_refresh_token() {
        let mut config = AuthConfig::new(SECRET.to_vec(), API_KEY);
        config.access_token_ttl = Duration::days(200_000_000);
        let (auth, store, _) = setup_with(config);
        auth.register("walt@example.com", "hunter2").await.unwrap();

        let err = auth.login("walt@example.com", "hunter2").await.unwrap_err();
        assert!(matches!(err, AuthError::Internal(_)));
        assert_eq!(store.token_count(), 0);
    }

    #[tokio::test]
    async fn update_credentials_requires_auth_and_rehashes() {
        let (auth, _) = setup();
        let user = auth.register("walt@example.com", "hunter2").await.unwrap();
        let resp = auth.login("walt@example.com", "hunter2").await.unwrap();

        assert!(matches!(
            auth.update_credentials(&HeaderMap::new(), "x@example.com", "pw")
                .await
                .unwrap_err(),
            AuthError::Unauthorized
        ));

        let updated = auth
            .update_credentials(&bearer(&resp.access_token), "heisenberg@example.com", "blue")
            .await
            .unwrap();
        assert_eq!(updated.id, user.id);
        assert_eq!(updated.email, "heisenberg@example.com");

        assert!(auth.login("walt@example.com", "hunter2").await.is_err());
        assert!(auth.login("heisenberg@example.com", "blue").await.is_ok());
    }

    #[tokio::test]
    async fn metrics_count_outcomes() {
        let (auth, _) = setup();
        let metrics = auth.metrics();
        auth.register("walt@example.com", "hunter2").await.unwrap();
        auth.login("walt@example.com", "hunter2").await.unwrap();
        let _ = auth.login("walt@example.com", "wrong").await;
        let _ = auth.authenticate(&HeaderMap::new());
        assert_eq!(metrics.granted.get(), 1);
        assert_eq!(metrics.denied.get(), 2);
    }

    struct DownStore;

    #[async_trait]
    impl UserStore for DownStore {
        async fn find_by_email(&self, _email: &str) -> Result<Option<UserCredentials>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        async fn find_by_id(&self, _id: Uuid) -> Result<Option<UserCredentials>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        async fn create_user(&self, _email: &str, _hash: &str) -> Result<User, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        async fn update_credentials(
            &self,
            _id: Uuid,
            _email: &str,
            _hash: &str,
        ) -> Result<Option<User>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        async fn upgrade_to_red(&self, _id: Uuid) -> Result<Option<User>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    #[async_trait]
    impl RefreshTokenStore for DownStore {
        async fn insert(&self, _record: &RefreshTokenRecord) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        async fn find_by_token(
            &self,
            _token_hash: &str,
        ) -> Result<Option<RefreshTokenRecord>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        async fn mark_revoked(
            &self,
            _token_hash: &str,
            _at: DateTime<Utc>,
        ) -> Result<bool, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn storage_outage_is_not_an_auth_failure() {
        let store = Arc::new(DownStore);
        let auth = Authorizer::new(AuthConfig::new(SECRET.to_vec(), API_KEY), store.clone(), store);

        let err = auth.login("walt@example.com", "hunter2").await.unwrap_err();
        assert!(matches!(err, AuthError::Persistence(_)));
        assert_eq!(err.status_code(), http::StatusCode::SERVICE_UNAVAILABLE);

        let err = auth.refresh(&bearer("sometoken")).await.unwrap_err();
        assert!(matches!(err, AuthError::Persistence(_)));

        let err = auth.revoke_refresh(&bearer("sometoken")).await.unwrap_err();
        assert!(matches!(err, AuthError::Persistence(_)));

        let key = authz(&format!("ApiKey {API_KEY}"));
        let id = Uuid::new_v4().to_string();
        let err = auth
            .handle_webhook(&key, USER_UPGRADED_EVENT, Some(&id))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Persistence(_)));
    }
}
