//! # Mock Completion Model for Testing
//!
//! Provides a `MockCompletionModel` that implements the `CompletionModel` trait
//! for use in tests. It returns a predefined response or error and records the
//! parts of every request the chat pipeline controls, so tests can inspect the
//! prompt without making API calls.

use rig::{
    completion::{
        AssistantContent, CompletionError, CompletionModel, CompletionRequest, CompletionResponse,
    },
    message::{Message, UserContent},
    one_or_many::OneOrMany,
};
use std::sync::Arc;
use tokio::sync::Mutex;

/// What the mock saw in a completion request
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// System instruction
    pub preamble: Option<String>,
    /// Text of the user turn
    pub prompt: String,
    /// Sampling temperature
    pub temperature: Option<f64>,
    /// Output token cap
    pub max_tokens: Option<u64>,
}

/// A mock completion model for testing purposes.
#[derive(Debug, Clone, Default)]
pub struct MockCompletionModel {
    response: Arc<Mutex<Option<Result<OneOrMany<AssistantContent>, String>>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockCompletionModel {
    /// Creates a new mock model that will return a default empty success response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the response that the mock model should return.
    pub async fn set_response(&self, response: OneOrMany<AssistantContent>) {
        *self.response.lock().await = Some(Ok(response));
    }

    /// Helper to create a simple text response.
    pub async fn set_text_response(&self, text: &str) {
        self.set_response(OneOrMany::one(AssistantContent::text(text)))
            .await;
    }

    /// Makes every call fail with a provider error.
    pub async fn set_error(&self, message: &str) {
        *self.response.lock().await = Some(Err(message.to_string()));
    }

    /// Requests received so far, oldest first.
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }
}

fn message_text(message: &Message) -> String {
    match message {
        Message::User { content } => content
            .iter()
            .filter_map(|c| match c {
                UserContent::Text(t) => Some(t.text.clone()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Message::Assistant { .. } => String::new(),
    }
}

impl CompletionModel for MockCompletionModel {
    type Response = String;

    async fn completion(
        &self,
        completion_request: CompletionRequest,
    ) -> Result<CompletionResponse<Self::Response>, CompletionError> {
        self.requests.lock().await.push(RecordedRequest {
            preamble: completion_request.preamble.clone(),
            prompt: message_text(&completion_request.prompt),
            temperature: completion_request.temperature,
            max_tokens: completion_request.max_tokens,
        });

        let response = self.response.lock().await.clone();
        match response {
            Some(Ok(choice)) => Ok(CompletionResponse {
                choice,
                raw_response: String::new(),
            }),
            Some(Err(message)) => Err(CompletionError::ProviderError(message)),
            None => Ok(CompletionResponse {
                choice: OneOrMany::one(AssistantContent::text("")),
                raw_response: String::new(),
            }),
        }
    }
}
