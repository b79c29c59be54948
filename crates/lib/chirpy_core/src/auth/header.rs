//! `Authorization` header parsing.
//!
//! The accepted grammar is exactly `scheme SP credential`: a case-sensitive
//! scheme, one space, and a non-empty credential with no whitespace. Every
//! deviation is reported as [`AuthError::MissingCredential`].

use http::HeaderMap;
use http::header::AUTHORIZATION;

use super::AuthError;

/// Scheme for user access and refresh tokens.
pub const BEARER_SCHEME: &str = "Bearer";

/// Scheme for the webhook caller's static key.
pub const API_KEY_SCHEME: &str = "ApiKey";

/// Extract the token from `Authorization: Bearer <token>`.
pub fn extract_bearer(headers: &HeaderMap) -> Result<String, AuthError> {
    extract_credential(headers, BEARER_SCHEME)
}

/// Extract the key from `Authorization: ApiKey <key>`.
pub fn extract_api_key(headers: &HeaderMap) -> Result<String, AuthError> {
    extract_credential(headers, API_KEY_SCHEME)
}

fn extract_credential(headers: &HeaderMap, scheme: &str) -> Result<String, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredential)?;

    parse_credential(value, scheme)
        .map(str::to_string)
        .ok_or(AuthError::MissingCredential)
}

fn parse_credential<'a>(value: &'a str, scheme: &str) -> Option<&'a str> {
    let (found, credential) = value.split_once(' ')?;
    if found != scheme || credential.is_empty() || credential.contains(char::is_whitespace) {
        return None;
    }
    Some(credential)
}
