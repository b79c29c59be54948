//! Authentication and authorization logic.
//!
//! Provides password hashing, access-token (JWT) issue/validation,
//! `Authorization` header parsing, the refresh-token lifecycle and the
//! [`Authorizer`] facade that composes them into request flows.

pub mod facade;
pub mod header;
pub mod jwt;
pub mod memory;
pub mod password;
pub mod queries;
pub mod refresh;
pub mod store;

use http::StatusCode;
use thiserror::Error;

pub use facade::Authorizer;
pub use store::StoreError;

/// Authentication errors.
///
/// Component-level variants are distinguishable for diagnostics; the
/// [`Authorizer`] collapses them with [`AuthError::normalize`] before they
/// reach a caller.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Login failed. Deliberately silent about whether the email exists.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthorized")]
    Unauthorized,

    /// Header absent or not of the form `<scheme> <credential>`.
    #[error("Missing or malformed credential")]
    MissingCredential,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token revoked")]
    TokenRevoked,

    #[error("Token not found")]
    TokenNotFound,

    #[error("Token signature invalid")]
    SignatureInvalid,

    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Token subject is not a valid user id")]
    SubjectInvalid,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Malformed password hash: {0}")]
    MalformedHash(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A flow referenced a user that does not exist.
    #[error("User not found")]
    UserNotFound,

    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Whether this is an authentication failure (as opposed to a server
    /// failure or bad input).
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials
                | AuthError::Unauthorized
                | AuthError::MissingCredential
                | AuthError::TokenExpired
                | AuthError::TokenRevoked
                | AuthError::TokenNotFound
                | AuthError::SignatureInvalid
                | AuthError::MalformedToken(_)
                | AuthError::SubjectInvalid
        )
    }

    /// Collapse authentication-semantic failures into [`AuthError::Unauthorized`].
    ///
    /// `InvalidCredentials` keeps its identity (login has its own generic
    /// message); server and validation errors pass through.
    pub fn normalize(self) -> Self {
        match self {
            AuthError::InvalidCredentials => AuthError::InvalidCredentials,
            e if e.is_auth_failure() => AuthError::Unauthorized,
            e => e,
        }
    }

    /// HTTP status the request-handling layer should answer with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            e if e.is_auth_failure() => StatusCode::UNAUTHORIZED,
            AuthError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
