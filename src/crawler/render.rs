//! Page rendering: turning a URL into the HTML a visitor would receive

use async_trait::async_trait;
use reqwest::{redirect::Policy, Client as ReqwestClient};
use tracing::{debug, instrument};
use url::Url;

use crate::crawler::CrawlerConfig;
use crate::crawler::error::CrawlError;

/// Maximum number of redirects followed for a single page
const MAX_REDIRECTS: usize = 10;

/// Something that can turn a URL into HTML
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Load `url` and return the HTML of the page
    async fn render(&self, url: &str) -> Result<String, CrawlError>;
}

/// Renders pages with a plain HTTP GET
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: ReqwestClient,
    timeout_secs: u64,
}

impl HttpRenderer {
    /// Create a renderer using the timeout and user agent from `config`
    pub fn new(config: &CrawlerConfig) -> Result<Self, CrawlError> {
        let client = ReqwestClient::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.render_timeout())
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()?;

        Ok(Self {
            client,
            timeout_secs: config.render_timeout_secs,
        })
    }

    fn map_error(&self, url: &str, e: reqwest::Error) -> CrawlError {
        if e.is_timeout() {
            CrawlError::Timeout {
                url: url.to_string(),
                after_secs: self.timeout_secs,
            }
        } else {
            CrawlError::Http(e)
        }
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    #[instrument(skip(self), level = "debug")]
    async fn render(&self, url: &str) -> Result<String, CrawlError> {
        let parsed = Url::parse(url)?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| self.map_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let html = response
            .text()
            .await
            .map_err(|e| self.map_error(url, e))?;
        debug!("Rendered {} ({} bytes)", url, html.len());
        Ok(html)
    }
}
