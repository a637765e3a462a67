//! Canned page renderer for tests

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::crawler::error::CrawlError;
use crate::crawler::render::PageRenderer;

/// Serves canned HTML per URL and records every render
#[derive(Default)]
pub(crate) struct FakeRenderer {
    pages: HashMap<String, String>,
    rendered: Mutex<Vec<String>>,
}

impl FakeRenderer {
    /// Serve a page whose body is `text` followed by empty anchors to `links`
    pub(crate) fn with_page(mut self, url: &str, text: &str, links: &[&str]) -> Self {
        let anchors: String = links
            .iter()
            .map(|link| format!("<a href=\"{}\"></a>", link))
            .collect();
        self.pages.insert(
            url.to_string(),
            format!("<html><body><p>{}</p>{}</body></html>", text, anchors),
        );
        self
    }

    /// URLs rendered so far, in order
    pub(crate) fn rendered(&self) -> Vec<String> {
        self.rendered.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageRenderer for FakeRenderer {
    async fn render(&self, url: &str) -> Result<String, CrawlError> {
        self.rendered.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| CrawlError::Other(format!("no route to {}", url)))
    }
}
