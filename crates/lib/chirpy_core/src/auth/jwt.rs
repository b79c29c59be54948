//! JWT access token generation and verification.
//!
//! Access tokens are HS256-signed, carry the user id as `sub` and the fixed
//! [`ACCESS_TOKEN_ISSUER`] tag as `iss`, and are never stored server-side.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use super::AuthError;
use crate::models::auth::TokenClaims;

/// Issuer tag identifying Chirpy access tokens.
pub const ACCESS_TOKEN_ISSUER: &str = "chirpy-access";

/// Generate a signed access token for `user_id`, valid for `ttl` from now.
pub fn issue_access_token(user_id: Uuid, secret: &[u8], ttl: Duration) -> Result<String, AuthError> {
    issue_access_token_at(user_id, secret, ttl, Utc::now())
}

/// Generate a signed access token as if issued at `now`.
pub fn issue_access_token_at(
    user_id: Uuid,
    secret: &[u8],
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<String, AuthError> {
    let exp = now
        .checked_add_signed(ttl)
        .ok_or_else(|| AuthError::Internal(format!("access token ttl {ttl} out of range")))?;
    let claims = TokenClaims {
        sub: user_id.to_string(),
        iss: ACCESS_TOKEN_ISSUER.to_string(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
}

/// Verify an access token, returning the user id it was issued to.
pub fn validate_access_token(token: &str, secret: &[u8]) -> Result<Uuid, AuthError> {
    validate_access_token_at(token, secret, Utc::now())
}

/// Verify an access token against the instant `now`.
///
/// Signature is checked before anything in the payload is trusted; expiry
/// is `now >= exp` with no leeway.
pub fn validate_access_token_at(
    token: &str,
    secret: &[u8],
    now: DateTime<Utc>,
) -> Result<Uuid, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    // Expiry is compared against the injected clock below.
    validation.validate_exp = false;
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);
    validation.set_issuer(&[ACCESS_TOKEN_ISSUER]);

    let data = decode::<TokenClaims>(token, &DecodingKey::from_secret(secret), &validation)
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => AuthError::SignatureInvalid,
            _ => AuthError::MalformedToken(e.to_string()),
        })?;

    if now.timestamp() >= data.claims.exp {
        return Err(AuthError::TokenExpired);
    }

    Uuid::parse_str(&data.claims.sub).map_err(|_| AuthError::SubjectInvalid)
}
