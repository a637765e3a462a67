//! # LLM Client Module
//!
//! The completion side of a chat request. A `Client` wraps any `rig`
//! completion model; the provided constructor targets Groq's
//! OpenAI-compatible endpoint and throttles outgoing calls client-side so a
//! burst of chat requests cannot exhaust the provider quota.
//!
//! ## Key Components
//!
//! - `Client`: owns the completion model shared by every request
//! - `RateLimitedCompletionModel`: adds a `governor` throttle to any completion model
//! - `first_text`: pulls the reply text out of a completion response

use std::num::NonZeroU32;

use governor::{Quota, RateLimiter};
use ratelimited_completion::RateLimitedCompletionModel;
use rig::{
    completion::{AssistantContent, CompletionModel, CompletionResponse},
    providers::openai,
};

use crate::config::Config;

#[cfg(test)]
pub mod mock_model;
pub mod ratelimited_completion;

/// Completions per minute sent to the provider from this process
const COMPLETIONS_PER_MINUTE: NonZeroU32 = match NonZeroU32::new(30) {
    Some(n) => n,
    None => unreachable!(),
};

/// Completion model used for Groq
pub type GroqCompletionModel = RateLimitedCompletionModel<openai::CompletionModel>;

/// Owns the completion model used by the chat pipeline
#[derive(Debug, Clone)]
pub struct Client<C>
where
    C: CompletionModel,
{
    completion_model: C,
}

/// Provider response passed through the rate-limited wrapper
pub struct RateLimitResponse<T> {
    #[allow(dead_code)]
    response: T,
}

impl Client<GroqCompletionModel> {
    /// Groq client using the key, base URL and model from `config`
    pub fn new_groq_from_config(config: &Config) -> Self {
        let groq_client = openai::Client::from_url(&config.groq_api_key, &config.groq_base_url);
        Self::new_groq(groq_client, &config.chat_model)
    }

    /// Throttled client for `model` on an existing OpenAI-compatible client
    pub fn new_groq(groq_client: openai::Client, model: &str) -> Self {
        let completion_limiter = RateLimiter::direct(Quota::per_minute(COMPLETIONS_PER_MINUTE));
        let completion_model = RateLimitedCompletionModel::new(
            groq_client.completion_model(model),
            completion_limiter,
        );
        Self { completion_model }
    }
}

impl<C> Client<C>
where
    C: CompletionModel,
{
    /// Wrap an arbitrary completion model
    pub fn new(completion_model: C) -> Self {
        Self { completion_model }
    }

    /// The wrapped completion model
    pub fn completion(&self) -> &C {
        &self.completion_model
    }
}

/// First non-empty text part of a completion, if any
pub fn first_text<R>(response: &CompletionResponse<R>) -> Option<String> {
    response.choice.iter().find_map(|content| match content {
        AssistantContent::Text(t) if !t.text.trim().is_empty() => Some(t.text.clone()),
        _ => None,
    })
}
