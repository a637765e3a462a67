//! Quota store backed by Upstash Redis over its REST API

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, instrument};

use super::{DEFAULT_PREFIX, QuotaError, QuotaStore, RateLimitDecision, SlidingWindow, now_ms};
use crate::config::UpstashConfig;

/// Default timeout for quota checks in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Checks and increments the two buckets atomically.
///
/// Returns -1 when the request is denied, otherwise the remaining quota.
const SLIDING_WINDOW_SCRIPT: &str = r#"
local currentKey  = KEYS[1]
local previousKey = KEYS[2]
local tokens      = tonumber(ARGV[1])
local now         = ARGV[2]
local window      = ARGV[3]
local incrementBy = ARGV[4]

local requestsInCurrentWindow = redis.call("GET", currentKey)
if requestsInCurrentWindow == false then
  requestsInCurrentWindow = 0
end

local requestsInPreviousWindow = redis.call("GET", previousKey)
if requestsInPreviousWindow == false then
  requestsInPreviousWindow = 0
end
local percentageInCurrent = ( now % window ) / window
requestsInPreviousWindow = math.floor(( 1 - percentageInCurrent ) * requestsInPreviousWindow)
if requestsInPreviousWindow + requestsInCurrentWindow >= tokens then
  return -1
end

local newValue = redis.call("INCRBY", currentKey, incrementBy)
if newValue == tonumber(incrementBy) then
  redis.call("PEXPIRE", currentKey, window * 2 + 1000)
end
return tokens - ( newValue + requestsInPreviousWindow )
"#;

/// Body of an Upstash REST response
#[derive(Debug, Deserialize)]
struct RestResponse {
    result: Option<serde_json::Value>,
    error: Option<String>,
}

/// Sliding-window counts shared through Upstash Redis
#[derive(Clone)]
pub struct UpstashQuotaStore {
    client: ReqwestClient,
    url: String,
    token: String,
    prefix: String,
    policy: SlidingWindow,
}

impl std::fmt::Debug for UpstashQuotaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstashQuotaStore")
            .field("url", &self.url)
            .field("prefix", &self.prefix)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl UpstashQuotaStore {
    /// Create a store for the given connection and policy
    pub fn new(config: &UpstashConfig, policy: SlidingWindow) -> Result<Self, QuotaError> {
        let client = ReqwestClient::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            prefix: DEFAULT_PREFIX.to_string(),
            policy,
        })
    }

    /// Use a different key prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    async fn eval(&self, identifier: &str, now: u64) -> Result<i64, QuotaError> {
        let bucket = self.policy.bucket(now);
        let current_key = SlidingWindow::bucket_key(&self.prefix, identifier, bucket);
        let previous_key =
            SlidingWindow::bucket_key(&self.prefix, identifier, bucket.saturating_sub(1));

        let command = json!([
            "EVAL",
            SLIDING_WINDOW_SCRIPT,
            "2",
            current_key,
            previous_key,
            self.policy.limit.to_string(),
            now.to_string(),
            self.policy.window_ms().to_string(),
            "1"
        ]);

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&command)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let body: RestResponse = serde_json::from_str(&text).map_err(|e| {
            error!("Failed to parse quota store response: {}", e);
            QuotaError::UnexpectedResponse(format!("HTTP {}: {}", status, text))
        })?;

        if let Some(message) = body.error {
            error!("Quota store error: {} - {}", status, message);
            return Err(QuotaError::Store(message));
        }
        if !status.is_success() {
            return Err(QuotaError::UnexpectedResponse(format!("HTTP {}: {}", status, text)));
        }

        body.result
            .as_ref()
            .and_then(serde_json::Value::as_i64)
            .ok_or_else(|| QuotaError::UnexpectedResponse(text))
    }
}

#[async_trait]
impl QuotaStore for UpstashQuotaStore {
    #[instrument(skip(self), level = "debug")]
    async fn limit(&self, identifier: &str) -> Result<RateLimitDecision, QuotaError> {
        let now = now_ms();
        let result = self.eval(identifier, now).await?;
        debug!("Quota script returned {}", result);

        Ok(RateLimitDecision {
            allowed: result >= 0,
            limit: self.policy.limit,
            remaining: result.max(0) as u32,
            reset: self.policy.reset_at(now),
        })
    }

    fn policy(&self) -> &SlidingWindow {
        &self.policy
    }
}
