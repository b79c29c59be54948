//! Password hashing via bcrypt.
//!
//! bcrypt only reads the first 72 bytes of its input, so passwords are
//! reduced to the hex SHA-256 digest (64 bytes) before they reach it. Every
//! byte of the password then contributes to the hash.

use sha2::{Digest, Sha256};

use super::AuthError;

/// bcrypt cost factor.
const BCRYPT_COST: u32 = 10;

fn prehash(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Hash a password with bcrypt (cost 10, random salt).
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    bcrypt::hash(prehash(password), BCRYPT_COST)
        .map_err(|e| AuthError::Hashing(format!("bcrypt hash: {e}")))
}

/// Verify a password against a bcrypt hash.
///
/// A mismatch is `Ok(false)`. A hash that bcrypt cannot parse is
/// [`AuthError::MalformedHash`], so callers can tell corrupt data apart
/// from a wrong password.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    bcrypt::verify(prehash(password), hash)
        .map_err(|e| AuthError::MalformedHash(format!("bcrypt verify: {e}")))
}
