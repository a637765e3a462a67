//! # linkchat - URL-aware chat backend
//!
//! This crate answers chat messages with a language model, grounding the
//! answer in the web pages the message links to. URLs found in a message are
//! crawled recursively, their visible text is handed to the model as context,
//! and the model's reply is returned to the caller. A per-client sliding-window
//! quota sits in front of the HTTP endpoint.
//!
//! ## Features
//!
//! - URL extraction and stripping for free-text messages
//! - Depth- and fan-out-bounded recursive crawling with failures kept inline
//! - Completion through any `rig` model, with a Groq client provided
//! - Sliding-window rate limiting backed by Upstash Redis or process memory
//! - An `axum` router exposing `POST /api/chat`
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use linkchat::config::Config;
//! use linkchat::crawler::{Crawler, CrawlerConfig, HttpRenderer};
//! use linkchat::model::Client;
//! use linkchat::pipeline::ChatPipeline;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let client = Client::new_groq_from_config(&config);
//!
//!     let crawler_config = CrawlerConfig::default();
//!     let renderer = HttpRenderer::new(&crawler_config)?;
//!     let crawler = Crawler::new(Arc::new(renderer), crawler_config);
//!
//!     let pipeline = ChatPipeline::new(crawler, client.completion().clone());
//!     let reply = pipeline
//!         .handle("Summarize https://example.com please")
//!         .await?;
//!
//!     println!("{}", reply.response);
//!     Ok(())
//! }
//! ```

mod error;
pub mod config;
pub mod crawler;
pub mod model;
pub mod pipeline;
pub mod ratelimit;
pub mod server;
pub mod urls;

pub use error::{Error, Result};

/// Re-export of types module for public use
pub mod prelude {
    pub use crate::error::Error;
    pub use crate::error::Result;
}
