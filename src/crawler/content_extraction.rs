//! Content extraction functionality for the crawler module

use crate::crawler::error::CrawlError;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

/// Elements whose text never reaches the reader
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Text and outbound links of a rendered page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPage {
    /// Visible text of the page body, whitespace collapsed
    pub text: String,

    /// Absolute HTTP(S) link targets, in document order
    pub links: Vec<String>,
}

/// Extract the visible body text and up to `max_links` outbound links
///
/// # Arguments
///
/// * `html` - The rendered HTML of the page
/// * `max_links` - Maximum number of links to keep
///
/// # Returns
///
/// The page text and the first `max_links` absolute HTTP(S) links
pub fn extract_page(html: &str, max_links: usize) -> Result<ExtractedPage, CrawlError> {
    let document = Html::parse_document(html);
    Ok(ExtractedPage {
        text: body_text(&document)?,
        links: outbound_links(&document, max_links)?,
    })
}

/// Extract the visible text of the `<body>` element
pub fn extract_body_text(html: &str) -> Result<String, CrawlError> {
    body_text(&Html::parse_document(html))
}

/// Extract absolute HTTP(S) anchor targets in document order
pub fn extract_links(html: &str, max_links: usize) -> Result<Vec<String>, CrawlError> {
    outbound_links(&Html::parse_document(html), max_links)
}

fn body_text(document: &Html) -> Result<String, CrawlError> {
    let body_selector = Selector::parse("body")
        .map_err(|e| CrawlError::HtmlParse(format!("Failed to parse body selector: {}", e)))?;

    let mut raw = String::new();
    if let Some(body) = document.select(&body_selector).next() {
        collect_visible_text(body, &mut raw);
    }

    Ok(raw.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn collect_visible_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(el) if !HIDDEN_ELEMENTS.contains(&el.name()) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_visible_text(child_element, out);
                }
            }
            _ => {}
        }
    }
}

fn outbound_links(document: &Html, max_links: usize) -> Result<Vec<String>, CrawlError> {
    let anchor_selector = Selector::parse("a[href]")
        .map_err(|e| CrawlError::HtmlParse(format!("Failed to parse anchor selector: {}", e)))?;

    Ok(document
        .select(&anchor_selector)
        .filter_map(|anchor| anchor.value().attr("href"))
        .map(str::trim)
        .filter(|href| is_absolute_http(href))
        .take(max_links)
        .map(str::to_string)
        .collect())
}

fn is_absolute_http(href: &str) -> bool {
    Url::parse(href)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}
