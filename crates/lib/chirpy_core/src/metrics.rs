//! Atomic counters for observability.
//!
//! Counters are owned values with an explicit lifecycle; share them through
//! an `Arc` rather than a global.

use std::sync::atomic::{AtomicU64, Ordering};

/// A resettable, monotonically increasing counter.
#[derive(Debug, Default)]
pub struct HitCounter {
    hits: AtomicU64,
}

impl HitCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment and return the new value.
    pub fn increment(&self) -> u64 {
        self.hits.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn get(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Reset to zero, returning the value before the reset.
    pub fn reset(&self) -> u64 {
        self.hits.swap(0, Ordering::Relaxed)
    }
}

/// Outcome counters for the authorization flows.
#[derive(Debug, Default)]
pub struct AuthMetrics {
    /// Flows that produced an authenticated identity or token.
    pub granted: HitCounter,
    /// Flows rejected for any reason, server errors included.
    pub denied: HitCounter,
}

impl AuthMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        self.granted.reset();
        self.denied.reset();
    }
}
