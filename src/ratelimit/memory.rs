//! Process-local quota store

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::{QuotaError, QuotaStore, RateLimitDecision, SlidingWindow, now_ms};

/// Number of tracked clients above which stale entries are pruned
const PRUNE_THRESHOLD: usize = 1024;

type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

/// Request counts of one client in the current and previous fixed windows
#[derive(Debug, Clone, Copy, Default)]
struct WindowCounts {
    bucket: u64,
    current: u64,
    previous: u64,
}

impl WindowCounts {
    /// Move the counts forward so that `bucket` is the current window
    fn advance(&mut self, bucket: u64) {
        if self.bucket == bucket {
            return;
        }
        self.previous = if self.bucket + 1 == bucket {
            self.current
        } else {
            0
        };
        self.current = 0;
        self.bucket = bucket;
    }
}

/// Sliding-window counts kept in this process
///
/// Counts are not shared between instances, so this store only enforces the
/// policy exactly when a single server handles all traffic.
pub struct InMemoryQuotaStore {
    policy: SlidingWindow,
    counts: Mutex<HashMap<String, WindowCounts>>,
    clock: Clock,
}

impl InMemoryQuotaStore {
    /// Create a store using the system clock
    pub fn new(policy: SlidingWindow) -> Self {
        Self::with_clock(policy, now_ms)
    }

    /// Create a store reading the time, in Unix milliseconds, from `clock`
    pub fn with_clock<F>(policy: SlidingWindow, clock: F) -> Self
    where
        F: Fn() -> u64 + Send + Sync + 'static,
    {
        Self {
            policy,
            counts: Mutex::new(HashMap::new()),
            clock: Arc::new(clock),
        }
    }
}

#[async_trait]
impl QuotaStore for InMemoryQuotaStore {
    async fn limit(&self, identifier: &str) -> Result<RateLimitDecision, QuotaError> {
        let now = (self.clock)();
        let bucket = self.policy.bucket(now);
        let limit = u64::from(self.policy.limit);

        let mut counts = self.counts.lock().await;
        if counts.len() > PRUNE_THRESHOLD {
            counts.retain(|_, c| c.bucket + 1 >= bucket);
        }

        let entry = counts.entry(identifier.to_string()).or_default();
        entry.advance(bucket);

        let previous = self.policy.weighted_previous(entry.previous, now);
        let decision = if previous + entry.current >= limit {
            debug!(identifier, "Quota exhausted");
            RateLimitDecision {
                allowed: false,
                limit: self.policy.limit,
                remaining: 0,
                reset: self.policy.reset_at(now),
            }
        } else {
            entry.current += 1;
            RateLimitDecision {
                allowed: true,
                limit: self.policy.limit,
                remaining: (limit - (entry.current + previous)) as u32,
                reset: self.policy.reset_at(now),
            }
        };

        Ok(decision)
    }

    fn policy(&self) -> &SlidingWindow {
        &self.policy
    }
}
