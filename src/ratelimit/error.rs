//! Error types for the rate limiter

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for quota store operations
#[derive(Debug, Error)]
pub enum QuotaError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with an error message
    #[error("quota store error: {0}")]
    Store(String),

    /// The store answered with something other than the expected shape
    #[error("unexpected quota store response: {0}")]
    UnexpectedResponse(String),
}

impl From<QuotaError> for CrateError {
    fn from(err: QuotaError) -> Self {
        match err {
            QuotaError::Http(e) => CrateError::Http(e),
            _ => CrateError::Quota(err.to_string()),
        }
    }
}
