//! Error types for the linkchat crate

use thiserror::Error;

/// Result type for linkchat operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for linkchat operations
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The completion service failed or rejected the request
    #[error("Completion error: {0}")]
    Completion(#[from] rig::completion::CompletionError),

    /// Quota store failure
    #[error("Quota error: {0}")]
    Quota(String),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Web crawling error
    #[error("Crawl error: {0}")]
    Crawl(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}
