//! Depth-first recursive crawl from a single root URL

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::crawler::content_extraction::extract_page;
use crate::crawler::render::PageRenderer;
use crate::crawler::{CrawlOutcome, CrawlReport, CrawlerConfig};

/// Crawls a page and the pages it links to, one at a time
#[derive(Clone)]
pub struct Crawler {
    renderer: Arc<dyn PageRenderer>,
    config: CrawlerConfig,
}

impl Crawler {
    /// Create a crawler that loads pages through `renderer`
    pub fn new(renderer: Arc<dyn PageRenderer>, config: CrawlerConfig) -> Self {
        Self { renderer, config }
    }

    /// The configuration this crawler was built with
    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// Crawl `url` and up to `max_links_per_page` links per page, `depth` levels deep
    ///
    /// A depth of zero renders nothing. Each linked page is fully crawled,
    /// including its own links, before the next sibling starts. Failures are
    /// recorded in the report and never stop the rest of the crawl.
    #[instrument(skip(self))]
    pub async fn crawl(&self, url: &str, depth: u32, max_links_per_page: usize) -> CrawlReport {
        let mut report = CrawlReport::new(url);
        let mut visited = HashSet::new();
        self.visit(
            url.to_string(),
            0,
            depth,
            max_links_per_page,
            &mut visited,
            &mut report.outcomes,
        )
        .await;

        info!(
            pages = report.pages_crawled(),
            failures = report.pages_failed(),
            "Crawl of {} finished",
            url
        );
        report
    }

    fn visit<'a>(
        &'a self,
        url: String,
        level: u32,
        depth: u32,
        max_links_per_page: usize,
        visited: &'a mut HashSet<String>,
        outcomes: &'a mut Vec<CrawlOutcome>,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            if depth == 0 {
                return;
            }

            if self.config.dedupe_visits && !visited.insert(visit_key(&url)) {
                debug!("Skipping already visited {}", url);
                return;
            }

            let html = match self.renderer.render(&url).await {
                Ok(html) => html,
                Err(e) => {
                    warn!(url = %url, error = %e, "Error crawling website");
                    outcomes.push(CrawlOutcome::Failed {
                        url,
                        level,
                        diagnostic: e.to_string(),
                    });
                    return;
                }
            };

            let page = match extract_page(&html, max_links_per_page) {
                Ok(page) => page,
                Err(e) => {
                    warn!(url = %url, error = %e, "Error extracting page content");
                    outcomes.push(CrawlOutcome::Failed {
                        url,
                        level,
                        diagnostic: e.to_string(),
                    });
                    return;
                }
            };

            debug!(
                "Crawled {} ({} chars, {} links)",
                url,
                page.text.len(),
                page.links.len()
            );
            outcomes.push(CrawlOutcome::Page {
                url,
                level,
                text: page.text,
            });

            for link in page.links {
                self.visit(
                    link,
                    level + 1,
                    depth - 1,
                    max_links_per_page,
                    visited,
                    outcomes,
                )
                .await;
            }
        })
    }
}

/// Key used to recognise a revisit: the URL without its fragment
fn visit_key(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fake::FakeRenderer;

    fn crawler(renderer: Arc<FakeRenderer>, dedupe: bool) -> Crawler {
        Crawler::new(
            renderer,
            CrawlerConfig::builder().dedupe_visits(dedupe).build(),
        )
    }

    #[tokio::test]
    async fn test_depth_zero_renders_nothing() {
        let renderer = Arc::new(FakeRenderer::default().with_page("https://a.test/", "A", &[]));
        let report = crawler(renderer.clone(), false)
            .crawl("https://a.test/", 0, 5)
            .await;

        assert!(report.outcomes.is_empty());
        assert!(renderer.rendered().is_empty());
        assert_eq!(report.to_text(), "");
    }

    #[tokio::test]
    async fn test_depth_first_order() {
        let renderer = Arc::new(
            FakeRenderer::default()
                .with_page("https://root.test/", "root", &["https://a.test/", "https://b.test/"])
                .with_page("https://a.test/", "a", &["https://a1.test/"])
                .with_page("https://a1.test/", "a1", &[])
                .with_page("https://b.test/", "b", &[]),
        );
        let report = crawler(renderer.clone(), false)
            .crawl("https://root.test/", 3, 5)
            .await;

        assert_eq!(
            renderer.rendered(),
            vec![
                "https://root.test/",
                "https://a.test/",
                "https://a1.test/",
                "https://b.test/"
            ]
        );
        assert_eq!(report.to_text(), "rootaa1b");
        let levels: Vec<u32> = report.outcomes.iter().map(CrawlOutcome::level).collect();
        assert_eq!(levels, vec![0, 1, 2, 1]);
    }

    #[tokio::test]
    async fn test_fanout_bound() {
        let children: Vec<String> = (0..8).map(|i| format!("https://c{}.test/", i)).collect();
        let child_refs: Vec<&str> = children.iter().map(String::as_str).collect();
        let mut fake = FakeRenderer::default().with_page("https://root.test/", "root", &child_refs);
        for child in &children {
            fake = fake.with_page(child, "child", &child_refs);
        }
        let renderer = Arc::new(fake);

        let report = crawler(renderer.clone(), false)
            .crawl("https://root.test/", 2, 5)
            .await;

        let renders = renderer.rendered().len();
        assert_eq!(renders, 6);
        assert!(renders <= 5usize.pow(2) + 1);
        assert_eq!(report.pages_crawled(), 6);
    }

    #[tokio::test]
    async fn test_failure_is_recorded_and_siblings_continue() {
        let renderer = Arc::new(
            FakeRenderer::default()
                .with_page(
                    "https://root.test/",
                    "root",
                    &["https://broken.test/", "https://ok.test/"],
                )
                .with_page("https://ok.test/", "ok", &[]),
        );
        let report = crawler(renderer, false)
            .crawl("https://root.test/", 2, 5)
            .await;

        assert_eq!(report.pages_crawled(), 2);
        assert_eq!(report.pages_failed(), 1);
        assert!(matches!(
            &report.outcomes[1],
            CrawlOutcome::Failed { url, .. } if url == "https://broken.test/"
        ));
        assert_eq!(
            report.to_text(),
            "rootError crawling website: no route to https://broken.test/ok"
        );
    }

    #[tokio::test]
    async fn test_cycles_bounded_by_depth_without_dedupe() {
        let renderer = Arc::new(
            FakeRenderer::default()
                .with_page("https://a.test/", "A", &["https://b.test/"])
                .with_page("https://b.test/", "B", &["https://a.test/"]),
        );
        let report = crawler(renderer.clone(), false)
            .crawl("https://a.test/", 4, 5)
            .await;

        assert_eq!(renderer.rendered().len(), 4);
        assert_eq!(report.to_text(), "ABAB");
    }

    #[tokio::test]
    async fn test_dedupe_skips_revisits() {
        let renderer = Arc::new(
            FakeRenderer::default()
                .with_page("https://a.test/", "A", &["https://b.test/"])
                .with_page("https://b.test/", "B", &["https://a.test/#top"]),
        );
        let report = crawler(renderer.clone(), true)
            .crawl("https://a.test/", 4, 5)
            .await;

        assert_eq!(
            renderer.rendered(),
            vec!["https://a.test/", "https://b.test/"]
        );
        assert_eq!(report.to_text(), "AB");
    }
}
