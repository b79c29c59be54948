//! Process-wide credential configuration.

use std::fmt;

use chrono::Duration;
use thiserror::Error;

/// Access token lifetime ceiling: 1 hour.
pub const ACCESS_TOKEN_TTL_SECS: i64 = 60 * 60;

/// Refresh token lifetime: 60 days.
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 60;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable `{0}`")]
    Missing(&'static str),

    #[error("Invalid value for `{var}`: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Signing material and token lifetimes shared by every flow.
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC secret for access tokens.
    pub signing_secret: Vec<u8>,
    /// Static key expected from the webhook caller.
    pub api_key: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
}

impl AuthConfig {
    /// Build a config with the default token lifetimes.
    pub fn new(signing_secret: impl Into<Vec<u8>>, api_key: impl Into<String>) -> Self {
        Self {
            signing_secret: signing_secret.into(),
            api_key: api_key.into(),
            access_token_ttl: Duration::seconds(ACCESS_TOKEN_TTL_SECS),
            refresh_token_ttl: Duration::days(REFRESH_TOKEN_TTL_DAYS),
        }
    }

    /// Reads configuration from environment variables.
    ///
    /// | Variable                | Default          |
    /// |-------------------------|------------------|
    /// | `SIGNING_KEY`           | required         |
    /// | `POLKA_API_KEY`         | required         |
    /// | `ACCESS_TOKEN_TTL_SECS` | `3600` (ceiling) |
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret = required_var("SIGNING_KEY")?;
        let api_key = required_var("POLKA_API_KEY")?;

        let requested = match std::env::var("ACCESS_TOKEN_TTL_SECS") {
            Ok(raw) => Some(raw.trim().parse::<i64>().map_err(|e| ConfigError::Invalid {
                var: "ACCESS_TOKEN_TTL_SECS",
                reason: e.to_string(),
            })?),
            Err(_) => None,
        };

        let mut config = Self::new(secret.into_bytes(), api_key);
        config.access_token_ttl = clamp_access_ttl(requested);
        Ok(config)
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("signing_secret", &"<redacted>")
            .field("api_key", &"<redacted>")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .finish()
    }
}

/// Resolve a requested access token lifetime against the 1 hour ceiling.
///
/// Absent, non-positive, or over-long requests all yield the ceiling.
pub fn clamp_access_ttl(requested_secs: Option<i64>) -> Duration {
    match requested_secs {
        Some(secs) if secs > 0 && secs < ACCESS_TOKEN_TTL_SECS => Duration::seconds(secs),
        _ => Duration::seconds(ACCESS_TOKEN_TTL_SECS),
    }
}

fn required_var(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(name)),
    }
}
