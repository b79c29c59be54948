//! # chirpy_core
//!
//! Credential and token core for Chirpy: password hashing, access tokens,
//! refresh-token lifecycle and the authorization flows built on them.

pub mod auth;
pub mod clock;
pub mod config;
pub mod metrics;
pub mod migrate;
pub mod models;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
