//! Rate-limit middleware placed in front of every route

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, error, warn};

use crate::ratelimit::{QuotaStore, RateLimitDecision};

/// Identifier used when the client address is unknown
pub const LOOPBACK: &str = "127.0.0.1";

/// Paths served without a quota check
const UNGATED_PREFIXES: &[&str] = &["/_next/static", "/_next/image", "/favicon.ico", "/static/"];

pub const HEADER_LIMIT: &str = "x-ratelimit-limit";
pub const HEADER_REMAINING: &str = "x-ratelimit-remaining";
pub const HEADER_RESET: &str = "x-ratelimit-reset";

/// State shared by every invocation of the gate
#[derive(Clone)]
pub struct GateState {
    /// Where request counts are kept
    pub quota: Arc<dyn QuotaStore>,

    /// Identify clients by the first `X-Forwarded-For` entry when present
    pub trust_forwarded_for: bool,
}

/// Whether requests for `path` go through the quota check
pub fn is_gated(path: &str) -> bool {
    !UNGATED_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
}

/// The identifier a request is counted under
pub fn client_identifier(request: &Request, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| LOOPBACK.to_string())
}

fn apply_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    headers.insert(HEADER_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(HEADER_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(HEADER_RESET, HeaderValue::from(decision.reset));
}

/// Reject clients over quota; annotate every other response with the quota
pub async fn rate_limit(State(gate): State<GateState>, request: Request, next: Next) -> Response {
    if !is_gated(request.uri().path()) {
        return next.run(request).await;
    }

    let identifier = client_identifier(&request, gate.trust_forwarded_for);
    let decision = match gate.quota.limit(&identifier).await {
        Ok(decision) => decision,
        Err(e) => {
            error!(client = %identifier, error = %e, "Rate limiting error");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
        }
    };

    let mut response = if decision.allowed {
        debug!(client = %identifier, remaining = decision.remaining, "Request admitted");
        next.run(request).await
    } else {
        warn!(client = %identifier, reset = decision.reset, "Too many requests");
        (StatusCode::TOO_MANY_REQUESTS, "Too many requests").into_response()
    };

    apply_headers(response.headers_mut(), &decision);
    response
}
