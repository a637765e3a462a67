//! The chat endpoint

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use rig::completion::CompletionModel;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use super::AppState;

/// Body of `POST /api/chat`
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    /// Free-text message, possibly containing URLs
    pub message: String,
}

/// Successful reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Text produced by the model
    pub response: String,
}

/// Error reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// What went wrong
    pub error: String,
}

/// Reply of the chat handler
pub type ChatResult = Result<Json<ChatResponse>, (StatusCode, Json<ErrorResponse>)>;

/// `POST /api/chat`: answer the message with the shared pipeline
pub async fn chat<M>(
    State(state): State<AppState<M>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ChatResult
where
    M: CompletionModel + 'static,
{
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejected chat request body");
        (
            rejection.status(),
            Json(ErrorResponse {
                error: rejection.body_text(),
            }),
        )
    })?;

    match state.pipeline.handle(&request.message).await {
        Ok(reply) => Ok(Json(ChatResponse {
            response: reply.response,
        })),
        Err(e) => {
            error!(error = %e, "Error handling chat message");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            ))
        }
    }
}
