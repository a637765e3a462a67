//! URL extraction from free-text chat messages

use std::sync::OnceLock;

use regex::Regex;

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"https?://[^\s]+").expect("URL pattern must compile"))
}

/// Extract every HTTP(S) URL from a message, in order of occurrence
///
/// A URL is the scheme followed by the longest run of non-whitespace
/// characters, so trailing punctuation is kept as part of the match.
pub fn extract_urls(text: &str) -> Vec<String> {
    url_pattern()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Remove every occurrence of the given URLs from a message
///
/// URLs are matched literally. Only the ends of the result are trimmed, so
/// the whitespace that surrounded a URL in the middle of the text remains.
pub fn strip_urls(text: &str, urls: &[String]) -> String {
    // Longest first, so a URL that prefixes another does not leave a tail behind.
    let mut ordered: Vec<&str> = urls.iter().map(String::as_str).collect();
    ordered.sort_by_key(|url| std::cmp::Reverse(url.len()));

    let mut clean = text.to_string();
    for url in ordered {
        clean = clean.replace(url, "");
    }
    clean.trim().to_string()
}
