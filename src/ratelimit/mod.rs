//! # Rate Limiting Module
//!
//! Per-client admission control for the chat endpoint. Every request is
//! checked against a sliding-window quota keyed by the client's address; the
//! decision carries the numbers reported back in the `X-RateLimit-*` headers.
//!
//! ## Key Components
//!
//! - `SlidingWindow`: the policy (requests per window) and its arithmetic
//! - `QuotaStore`: where counts live; consulted once per request
//! - `UpstashQuotaStore`: shared counts in Upstash Redis over its REST API
//! - `InMemoryQuotaStore`: process-local counts, for single instances and tests
//!
//! Both stores implement the same two-bucket approximation: the count of the
//! current fixed window plus the previous window's count weighted by how much
//! of it still overlaps the sliding window.

mod error;
mod memory;
mod upstash;

pub use error::QuotaError;
pub use memory::InMemoryQuotaStore;
pub use upstash::UpstashQuotaStore;

use std::time::Duration;

use async_trait::async_trait;

/// Key prefix shared by every bucket
pub const DEFAULT_PREFIX: &str = "@upstash/ratelimit";

/// Outcome of a single quota check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request may proceed
    pub allowed: bool,

    /// Requests allowed per window
    pub limit: u32,

    /// Requests left in the current window
    pub remaining: u32,

    /// Unix time in milliseconds at which the current window ends
    pub reset: u64,
}

/// Storage backend that counts requests per client
#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// Record a request from `identifier` and decide whether it is allowed
    async fn limit(&self, identifier: &str) -> Result<RateLimitDecision, QuotaError>;

    /// The policy this store enforces
    fn policy(&self) -> &SlidingWindow;
}

/// Sliding-window policy: at most `limit` requests in any `window`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlidingWindow {
    /// Requests allowed per window
    pub limit: u32,

    /// Length of the window
    pub window: Duration,
}

impl Default for SlidingWindow {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(10))
    }
}

impl SlidingWindow {
    /// Create a policy allowing `limit` requests per `window`
    pub fn new(limit: u32, window: Duration) -> Self {
        Self { limit, window }
    }

    /// Window length in milliseconds, never zero
    pub fn window_ms(&self) -> u64 {
        (self.window.as_millis() as u64).max(1)
    }

    /// Index of the fixed window containing `now_ms`
    pub fn bucket(&self, now_ms: u64) -> u64 {
        now_ms / self.window_ms()
    }

    /// End of the fixed window containing `now_ms`
    pub fn reset_at(&self, now_ms: u64) -> u64 {
        (self.bucket(now_ms) + 1) * self.window_ms()
    }

    /// Previous window's count, scaled by how much of it the sliding window still covers
    pub fn weighted_previous(&self, previous: u64, now_ms: u64) -> u64 {
        let window_ms = self.window_ms();
        let elapsed = (now_ms % window_ms) as f64 / window_ms as f64;
        ((1.0 - elapsed) * previous as f64).floor() as u64
    }

    /// Storage key for `identifier` in `bucket`
    pub fn bucket_key(prefix: &str, identifier: &str, bucket: u64) -> String {
        format!("{}:{}:{}", prefix, identifier, bucket)
    }
}

/// Current Unix time in milliseconds
pub(crate) fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
