//! # HTTP Server
//!
//! Exposes the chat pipeline as `POST /api/chat`. Every request except those
//! for static assets passes the rate-limit gate first; requests over quota
//! are answered by the gate without reaching the pipeline.

mod chat;
mod gate;

pub use chat::{ChatRequest, ChatResponse, ErrorResponse, chat};
pub use gate::{GateState, HEADER_LIMIT, HEADER_REMAINING, HEADER_RESET, LOOPBACK, is_gated};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    http::StatusCode,
    middleware,
    routing::post,
};
use rig::completion::CompletionModel;
use tracing::{error, info};

use crate::pipeline::ChatPipeline;
use crate::ratelimit::QuotaStore;

/// Process-wide singletons handed to every request
pub struct AppState<M>
where
    M: CompletionModel,
{
    /// Crawl-then-complete pipeline behind `POST /api/chat`
    pub pipeline: Arc<ChatPipeline<M>>,

    /// Quota store and client identification for the gate
    pub gate: GateState,
}

impl<M> Clone for AppState<M>
where
    M: CompletionModel,
{
    fn clone(&self) -> Self {
        Self {
            pipeline: self.pipeline.clone(),
            gate: self.gate.clone(),
        }
    }
}

impl<M> AppState<M>
where
    M: CompletionModel,
{
    /// Bundle the pipeline and quota store shared by every request
    pub fn new(
        pipeline: ChatPipeline<M>,
        quota: Arc<dyn QuotaStore>,
        trust_forwarded_for: bool,
    ) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            gate: GateState {
                quota,
                trust_forwarded_for,
            },
        }
    }
}

/// Build the router: the chat route and a JSON 404 fallback, both behind the gate
pub fn router<M>(state: AppState<M>) -> Router
where
    M: CompletionModel + 'static,
{
    Router::new()
        .route("/api/chat", post(chat::<M>))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            state.gate.clone(),
            gate::rate_limit,
        ))
        .with_state(state)
}

async fn not_found() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "Not found".to_string(),
        }),
    )
}

/// Bind `address` and serve until Ctrl-C, recording each peer's address
pub async fn serve<M>(address: &str, state: AppState<M>) -> std::io::Result<()>
where
    M: CompletionModel + 'static,
{
    let listener = tokio::net::TcpListener::bind(address).await?;
    info!(bind_address = %address, "chat server listening");

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fake::FakeRenderer;
    use crate::crawler::{Crawler, CrawlerConfig};
    use crate::model::mock_model::MockCompletionModel;
    use crate::ratelimit::{
        InMemoryQuotaStore, QuotaError, RateLimitDecision, SlidingWindow,
    };
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use axum::response::Response;
    use tower::ServiceExt;

    struct FailingStore {
        policy: SlidingWindow,
    }

    #[async_trait]
    impl QuotaStore for FailingStore {
        async fn limit(&self, _identifier: &str) -> Result<RateLimitDecision, QuotaError> {
            Err(QuotaError::Store("connection refused".to_string()))
        }

        fn policy(&self) -> &SlidingWindow {
            &self.policy
        }
    }

    fn app_with(
        renderer: FakeRenderer,
        model: MockCompletionModel,
        quota: Arc<dyn QuotaStore>,
        trust_forwarded_for: bool,
    ) -> Router {
        let crawler = Crawler::new(Arc::new(renderer), CrawlerConfig::default());
        let pipeline = ChatPipeline::new(crawler, model);
        router(AppState::new(pipeline, quota, trust_forwarded_for))
    }

    fn app(model: MockCompletionModel) -> Router {
        app_with(
            FakeRenderer::default(),
            model,
            Arc::new(InMemoryQuotaStore::with_clock(SlidingWindow::default(), || 1_000_000)),
            false,
        )
    }

    fn chat_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_chat_success_with_quota_headers() {
        let model = MockCompletionModel::new();
        model.set_text_response("Hello there").await;

        let response = app(model)
            .oneshot(chat_request(r#"{"message": "hi"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[HEADER_LIMIT], "5");
        assert_eq!(response.headers()[HEADER_REMAINING], "4");
        assert_eq!(response.headers()[HEADER_RESET], "1010000");

        let body: ChatResponse = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body.response, "Hello there");
    }

    #[tokio::test]
    async fn test_sixth_request_is_rejected() {
        let model = MockCompletionModel::new();
        model.set_text_response("ok").await;
        let app = app(model.clone());

        for _ in 0..5 {
            let response = app
                .clone()
                .oneshot(chat_request(r#"{"message": "hi"}"#))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .clone()
            .oneshot(chat_request(r#"{"message": "hi"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[HEADER_REMAINING], "0");
        assert_eq!(response.headers()[HEADER_LIMIT], "5");
        assert_eq!(body_string(response).await, "Too many requests");

        assert_eq!(model.requests().await.len(), 5);
    }

    #[tokio::test]
    async fn test_forwarded_clients_have_separate_quotas() {
        let model = MockCompletionModel::new();
        let app = app_with(
            FakeRenderer::default(),
            model,
            Arc::new(InMemoryQuotaStore::with_clock(
                SlidingWindow::new(1, std::time::Duration::from_secs(10)),
                || 0,
            )),
            true,
        );

        for ip in ["198.51.100.1", "198.51.100.2"] {
            let mut request = chat_request(r#"{"message": "hi"}"#);
            request
                .headers_mut()
                .insert("x-forwarded-for", ip.parse().unwrap());
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_quota_store_failure_fails_closed() {
        let model = MockCompletionModel::new();
        let app = app_with(
            FakeRenderer::default(),
            model.clone(),
            Arc::new(FailingStore {
                policy: SlidingWindow::default(),
            }),
            false,
        );

        let response = app
            .oneshot(chat_request(r#"{"message": "hi"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_string(response).await, "Internal Server Error");
        assert!(model.requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let response = app(MockCompletionModel::new())
            .oneshot(chat_request("not json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().contains_key(HEADER_REMAINING));
        let body: ErrorResponse = serde_json::from_str(&body_string(response).await).unwrap();
        assert!(!body.error.is_empty());
    }

    #[tokio::test]
    async fn test_pipeline_failure_is_500() {
        let model = MockCompletionModel::new();
        model.set_error("model overloaded").await;

        let response = app(model)
            .oneshot(chat_request(r#"{"message": "hi"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorResponse = serde_json::from_str(&body_string(response).await).unwrap();
        assert!(body.error.contains("model overloaded"));
    }

    #[tokio::test]
    async fn test_crawled_context_reaches_model() {
        let model = MockCompletionModel::new();
        model.set_text_response("summary").await;
        let app = app_with(
            FakeRenderer::default().with_page("https://example.com", "Example Domain", &[]),
            model.clone(),
            Arc::new(InMemoryQuotaStore::new(SlidingWindow::default())),
            false,
        );

        let response = app
            .oneshot(chat_request(
                r#"{"message": "Summarize https://example.com please"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let requests = model.requests().await;
        assert_eq!(
            requests[0].prompt,
            "Summarize  please\n\nContext from URLs: Example Domain"
        );
    }

    #[tokio::test]
    async fn test_static_paths_skip_the_gate() {
        let app = app_with(
            FakeRenderer::default(),
            MockCompletionModel::new(),
            Arc::new(FailingStore {
                policy: SlidingWindow::default(),
            }),
            false,
        );

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/favicon.ico")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(!response.headers().contains_key(HEADER_LIMIT));
    }

    #[tokio::test]
    async fn test_unknown_path_is_gated_json_404() {
        let response = app(MockCompletionModel::new())
            .oneshot(
                Request::builder()
                    .uri("/unknown")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[HEADER_REMAINING], "4");
        let body: ErrorResponse = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body.error, "Not found");
    }

    #[tokio::test]
    async fn test_unknown_path_fails_closed_when_quota_store_is_down() {
        let app = app_with(
            FakeRenderer::default(),
            MockCompletionModel::new(),
            Arc::new(FailingStore {
                policy: SlidingWindow::default(),
            }),
            false,
        );

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/unknown")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_string(response).await, "Internal Server Error");
    }
}
