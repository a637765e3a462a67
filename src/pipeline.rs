//! # Chat Pipeline
//!
//! Turns one chat message into one completion. URLs in the message are
//! crawled, their text is concatenated and cut to a fixed budget, and the
//! result is handed to the model next to the question with the URLs removed.
//!
//! ```text
//! message ─► extract URLs ─► crawl each ─► truncate ─► prompt ─► completion
//!        └─► strip URLs ───────────────────────────────┘
//! ```

use rig::completion::CompletionModel;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, instrument};

use crate::crawler::Crawler;
use crate::error::Result;
use crate::model::first_text;
use crate::urls::{extract_urls, strip_urls};

/// Instruction sent as the system turn of every completion
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. If URLs were provided, use the scraped content to inform your answers.";

/// Reply used when the model returns no text
pub const NO_RESPONSE: &str = "No response generated.";

/// Label that introduces crawled content in the user turn
pub const CONTEXT_LABEL: &str = "Context from URLs: ";

/// Configuration for the chat pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Depth crawled from each URL in the message
    pub crawl_depth: u32,

    /// Links followed per crawled page
    pub max_links_per_page: usize,

    /// Maximum characters of crawled text placed in the prompt
    pub context_char_limit: usize,

    /// System instruction
    pub system_prompt: String,

    /// Sampling temperature
    pub temperature: f64,

    /// Maximum tokens in the reply
    pub max_tokens: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            crawl_depth: 2,
            max_links_per_page: 5,
            context_char_limit: 5000,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: 0.5,
            max_tokens: 500,
        }
    }
}

/// The two turns sent to the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// System instruction
    pub system: String,

    /// User turn: the question, then the crawled context if any
    pub user: String,
}

impl Prompt {
    /// Assemble the prompt for `query`, appending `context` when URLs were given
    pub fn build(system: &str, query: &str, context: Option<&str>) -> Self {
        let user = match context {
            Some(context) => format!("{}\n\n{}{}", query, CONTEXT_LABEL, context),
            None => query.to_string(),
        };
        Self {
            system: system.to_string(),
            user,
        }
    }
}

/// Result of handling a chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatReply {
    /// Text returned by the model
    pub response: String,

    /// URLs found in the message
    pub urls: Vec<String>,

    /// Pages rendered successfully
    pub pages_crawled: usize,

    /// Pages that failed to render
    pub pages_failed: usize,
}

/// Cut `text` to at most `limit` characters
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Crawl-then-complete pipeline shared by every request
pub struct ChatPipeline<M>
where
    M: CompletionModel,
{
    crawler: Crawler,
    model: M,
    config: PipelineConfig,
}

impl<M> ChatPipeline<M>
where
    M: CompletionModel,
{
    /// Create a pipeline with the default configuration
    pub fn new(crawler: Crawler, model: M) -> Self {
        Self::with_config(crawler, model, PipelineConfig::default())
    }

    /// Create a pipeline with an explicit configuration
    pub fn with_config(crawler: Crawler, model: M, config: PipelineConfig) -> Self {
        Self {
            crawler,
            model,
            config,
        }
    }

    /// The configuration this pipeline was built with
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Answer `message`, grounding the answer in the pages its URLs point to
    #[instrument(skip(self, message), fields(message_len = message.len()))]
    pub async fn handle(&self, message: &str) -> Result<ChatReply> {
        let urls = extract_urls(message);
        let query = strip_urls(message, &urls);

        let mut pages_crawled = 0;
        let mut pages_failed = 0;
        let context = if urls.is_empty() {
            None
        } else {
            let mut scraped = String::new();
            for url in &urls {
                let report = self
                    .crawler
                    .crawl(
                        url,
                        self.config.crawl_depth,
                        self.config.max_links_per_page,
                    )
                    .await;
                pages_crawled += report.pages_crawled();
                pages_failed += report.pages_failed();
                scraped.push_str(&report.to_text());
            }
            debug!("Scraped {} chars from {} URLs", scraped.len(), urls.len());
            Some(truncate_chars(&scraped, self.config.context_char_limit).to_string())
        };

        let prompt = Prompt::build(&self.config.system_prompt, &query, context.as_deref());

        let completion = self
            .model
            .completion_request(prompt.user)
            .preamble(prompt.system)
            .temperature(self.config.temperature)
            .max_tokens(self.config.max_tokens)
            // OpenAI-compatible providers only forward the cap as a raw parameter
            .additional_params(json!({ "max_tokens": self.config.max_tokens }))
            .send()
            .await?;

        let response = first_text(&completion).unwrap_or_else(|| NO_RESPONSE.to_string());
        info!(
            urls = urls.len(),
            pages_crawled, pages_failed, "Chat message answered"
        );

        Ok(ChatReply {
            response,
            urls,
            pages_crawled,
            pages_failed,
        })
    }
}
