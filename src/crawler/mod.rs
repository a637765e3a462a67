//! # Website Crawler Module
//!
//! Gathers the text behind the URLs a user pastes into a message. Each URL
//! is rendered, its visible body text extracted, and a bounded number of its
//! outbound links followed recursively.
//!
//! ## Key Components
//!
//! - `CrawlerConfig`: render timeout, user agent and revisit policy
//! - `PageRenderer`: the seam through which pages are loaded (`HttpRenderer`)
//! - `Crawler`: the sequential depth-first crawl
//! - `CrawlReport`: per-page outcomes, successful or failed, in visit order
//!
//! A failed page never aborts a crawl. It is kept as a `CrawlOutcome::Failed`
//! entry and only turned into text when the report is rendered for a prompt.

mod config;
mod content_extraction;
mod error;
#[cfg(test)]
pub(crate) mod fake;
mod recursive;
mod render;

pub use config::{CrawlerConfig, CrawlerConfigBuilder};
pub use content_extraction::{ExtractedPage, extract_body_text, extract_links, extract_page};
pub use error::CrawlError;
pub use recursive::Crawler;
pub use render::{HttpRenderer, PageRenderer};

use std::borrow::Cow;

use serde::Serialize;

/// Prefix for the text that stands in for a page that could not be crawled
pub const CRAWL_ERROR_PREFIX: &str = "Error crawling website: ";

/// Result of visiting a single page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CrawlOutcome {
    /// The page was rendered and its text extracted
    Page {
        /// URL of the page
        url: String,
        /// Distance from the root URL
        level: u32,
        /// Visible text of the page
        text: String,
    },

    /// The page could not be rendered or parsed
    Failed {
        /// URL of the page
        url: String,
        /// Distance from the root URL
        level: u32,
        /// What went wrong
        diagnostic: String,
    },
}

impl CrawlOutcome {
    /// URL of the visited page
    pub fn url(&self) -> &str {
        match self {
            Self::Page { url, .. } | Self::Failed { url, .. } => url,
        }
    }

    /// Distance of the page from the root URL
    pub fn level(&self) -> u32 {
        match self {
            Self::Page { level, .. } | Self::Failed { level, .. } => *level,
        }
    }

    /// Whether the visit failed
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Text this outcome contributes to a prompt
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Page { text, .. } => Cow::Borrowed(text),
            Self::Failed { diagnostic, .. } => {
                Cow::Owned(format!("{}{}", CRAWL_ERROR_PREFIX, diagnostic))
            }
        }
    }
}

/// Every outcome of crawling one root URL, in visit order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlReport {
    /// The URL the crawl started from
    pub root: String,

    /// Outcomes in depth-first visit order
    pub outcomes: Vec<CrawlOutcome>,
}

impl CrawlReport {
    /// Create an empty report for `root`
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            outcomes: Vec::new(),
        }
    }

    /// Number of pages rendered successfully
    pub fn pages_crawled(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_failure()).count()
    }

    /// Number of pages that failed
    pub fn pages_failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    /// Concatenate the text of every outcome in visit order
    pub fn to_text(&self) -> String {
        self.outcomes.iter().map(CrawlOutcome::as_text).collect()
    }
}
