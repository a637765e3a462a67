//! # Service Configuration
//!
//! Everything the service needs from its environment: the completion-service
//! credential, the quota store connection, and the rate-limit policy. Values
//! are read once at startup and handed to the components that need them.
//!
//! | Variable | Default |
//! |---|---|
//! | `GROQ_API_KEY` | required |
//! | `GROQ_BASE_URL` | `https://api.groq.com/openai/v1` |
//! | `CHAT_MODEL` | `mixtral-8x7b-32768` |
//! | `UPSTASH_REDIS_REST_URL` | unset (in-memory quota store) |
//! | `UPSTASH_REDIS_REST_TOKEN` | required when the URL is set |
//! | `RATE_LIMIT_REQUESTS` | `5` |
//! | `RATE_LIMIT_WINDOW_SECS` | `10` |
//! | `TRUST_FORWARDED_FOR` | `false` |

use std::time::Duration;

use thiserror::Error;

use crate::ratelimit::SlidingWindow;

/// Default base URL of the OpenAI-compatible Groq endpoint
pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default model used for chat completions
pub const DEFAULT_CHAT_MODEL: &str = "mixtral-8x7b-32768";

/// Error type for configuration loading
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set
    #[error("{0} environment variable must be set")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed
    #[error("invalid value for {name}: {value}")]
    Invalid {
        /// Variable name
        name: &'static str,
        /// Offending value
        value: String,
    },
}

/// Connection details for the Upstash Redis REST API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstashConfig {
    /// REST endpoint URL
    pub url: String,

    /// Bearer token
    pub token: String,
}

/// Top-level configuration for the service
#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the completion service
    pub groq_api_key: String,

    /// Base URL of the completion service
    pub groq_base_url: String,

    /// Model identifier sent with every completion
    pub chat_model: String,

    /// Quota store connection; `None` selects the in-process store
    pub upstash: Option<UpstashConfig>,

    /// Rate-limit policy applied per client
    pub rate_limit: SlidingWindow,

    /// Whether the first `X-Forwarded-For` entry identifies the client
    pub trust_forwarded_for: bool,
}

impl Config {
    /// Load the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load the configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let groq_api_key = get("GROQ_API_KEY").ok_or(ConfigError::Missing("GROQ_API_KEY"))?;
        let groq_base_url =
            get("GROQ_BASE_URL").unwrap_or_else(|| DEFAULT_GROQ_BASE_URL.to_string());
        let chat_model = get("CHAT_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string());

        let upstash = match get("UPSTASH_REDIS_REST_URL") {
            Some(url) => {
                let token = get("UPSTASH_REDIS_REST_TOKEN")
                    .ok_or(ConfigError::Missing("UPSTASH_REDIS_REST_TOKEN"))?;
                Some(UpstashConfig { url, token })
            }
            None => None,
        };

        let defaults = SlidingWindow::default();
        let requests = match get("RATE_LIMIT_REQUESTS") {
            Some(value) => parse_positive("RATE_LIMIT_REQUESTS", &value)?,
            None => defaults.limit,
        };
        let window = match get("RATE_LIMIT_WINDOW_SECS") {
            Some(value) => Duration::from_secs(parse_positive("RATE_LIMIT_WINDOW_SECS", &value)?),
            None => defaults.window,
        };

        let trust_forwarded_for = match get("TRUST_FORWARDED_FOR") {
            Some(value) => parse_bool("TRUST_FORWARDED_FOR", &value)?,
            None => false,
        };

        Ok(Self {
            groq_api_key,
            groq_base_url,
            chat_model,
            upstash,
            rate_limit: SlidingWindow::new(requests, window),
            trust_forwarded_for,
        })
    }
}

fn parse_positive<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match value.trim().parse::<T>() {
        Ok(parsed) if parsed > T::default() => Ok(parsed),
        _ => Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        }),
    }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        }),
    }
}
