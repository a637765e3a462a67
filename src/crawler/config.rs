//! # Crawler Configuration Module
//!
//! Controls how a single page is loaded and whether pages are revisited.
//! How far a crawl reaches is chosen per call to `Crawler::crawl`. A builder
//! is provided for callers that only want to override a couple of values.

use std::time::Duration;

/// Configuration for the crawler
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Time allowed for a single page to load, in seconds
    pub render_timeout_secs: u64,

    /// User agent to use for requests
    pub user_agent: String,

    /// Skip pages already visited during the same crawl
    pub dedupe_visits: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            render_timeout_secs: 60,
            user_agent: format!("linkchat-crawler/{}", env!("CARGO_PKG_VERSION")),
            dedupe_visits: false,
        }
    }
}

/// Builder for CrawlerConfig
#[derive(Debug, Default)]
pub struct CrawlerConfigBuilder {
    config: CrawlerConfig,
}

impl CrawlerConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: CrawlerConfig::default(),
        }
    }

    /// Set the render timeout in seconds
    pub fn render_timeout_secs(mut self, render_timeout_secs: u64) -> Self {
        self.config.render_timeout_secs = render_timeout_secs;
        self
    }

    /// Set the user agent to use for requests
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set whether pages already seen in a crawl are skipped
    pub fn dedupe_visits(mut self, dedupe_visits: bool) -> Self {
        self.config.dedupe_visits = dedupe_visits;
        self
    }

    /// Build the configuration
    pub fn build(self) -> CrawlerConfig {
        self.config
    }
}

impl CrawlerConfig {
    /// Create a new builder
    pub fn builder() -> CrawlerConfigBuilder {
        CrawlerConfigBuilder::new()
    }

    /// Get the render timeout as a Duration
    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }
}
