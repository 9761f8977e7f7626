//! Metrics tracking middleware
//!
//! Records count, status and latency per route template for `/metrics`.
//! Requests that match no route share the [`UNMATCHED_ENDPOINT`] series.

use crate::state::AppState;
use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

/// Metrics tracking middleware
pub async fn metrics_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let endpoint = endpoint_label(&request);

    let response = next.run(request).await;

    let latency_us = start.elapsed().as_micros() as u64;
    state
        .record_request(endpoint, response.status().as_u16(), latency_us)
        .await;

    response
}

/// Series label for requests that reach no route
pub const UNMATCHED_ENDPOINT: &str = "unmatched";

/// Route template such as `/notes/:id`, so the label set stays fixed
fn endpoint_label(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ENDPOINT.to_string())
}
