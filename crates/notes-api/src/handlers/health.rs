//! Health check and metrics handlers

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::sync::Arc;
use utoipa::ToSchema;

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Liveness probe - basic health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub database: bool,
}

/// Readiness probe - checks the backing store
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Service is ready", body = ReadinessResponse),
        (status = 503, description = "Service not ready", body = ReadinessResponse)
    )
)]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = state.store_reachable().await;
    let ready = state.is_ready() && database;

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(ReadinessResponse { ready, database }))
}

/// Prometheus-compatible metrics endpoint
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "health",
    responses(
        (status = 200, description = "Metrics in Prometheus text format", body = String, content_type = "text/plain")
    )
)]
pub async fn prometheus_metrics(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let mut output = String::new();
    render_metrics(&state, &mut output)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to render metrics: {e}")))?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        output,
    ))
}

async fn render_metrics(state: &AppState, out: &mut String) -> std::fmt::Result {
    writeln!(out, "# HELP notes_uptime_seconds Time since server start")?;
    writeln!(out, "# TYPE notes_uptime_seconds gauge")?;
    writeln!(out, "notes_uptime_seconds {}\n", state.uptime_secs())?;

    writeln!(out, "# HELP notes_requests_total Total number of HTTP requests")?;
    writeln!(out, "# TYPE notes_requests_total counter")?;
    writeln!(out, "notes_requests_total {}\n", state.get_request_count())?;

    writeln!(out, "# HELP notes_build_info Build information")?;
    writeln!(out, "# TYPE notes_build_info gauge")?;
    writeln!(
        out,
        "notes_build_info{{version=\"{}\"}} 1\n",
        env!("CARGO_PKG_VERSION")
    )?;

    if let Some(db) = &state.db {
        let pool = db.pool();
        let size = pool.size();
        let idle = pool.num_idle() as u32;

        writeln!(out, "# HELP notes_db_pool_connections Database pool connections by state")?;
        writeln!(out, "# TYPE notes_db_pool_connections gauge")?;
        writeln!(
            out,
            "notes_db_pool_connections{{state=\"active\"}} {}",
            size.saturating_sub(idle)
        )?;
        writeln!(out, "notes_db_pool_connections{{state=\"idle\"}} {idle}\n")?;
    }

    let metrics = state.metrics.read().await;

    writeln!(out, "# HELP notes_http_requests_total HTTP requests by endpoint and status")?;
    writeln!(out, "# TYPE notes_http_requests_total counter")?;
    for (endpoint, m) in metrics.iter() {
        for (status, count) in &m.status_counts {
            writeln!(
                out,
                "notes_http_requests_total{{endpoint=\"{endpoint}\",status=\"{status}\"}} {count}"
            )?;
        }
    }
    out.push('\n');

    writeln!(out, "# HELP notes_http_request_duration_seconds HTTP request latency")?;
    writeln!(out, "# TYPE notes_http_request_duration_seconds histogram")?;
    for (endpoint, m) in metrics.iter().filter(|(_, m)| m.latency_count > 0) {
        let mut cumulative = 0u64;
        for (le, count) in m.latency_buckets.bounded() {
            cumulative += count;
            writeln!(
                out,
                "notes_http_request_duration_seconds_bucket{{endpoint=\"{endpoint}\",le=\"{le}\"}} {cumulative}"
            )?;
        }
        writeln!(
            out,
            "notes_http_request_duration_seconds_bucket{{endpoint=\"{endpoint}\",le=\"+Inf\"}} {}",
            m.latency_count
        )?;
        writeln!(
            out,
            "notes_http_request_duration_seconds_sum{{endpoint=\"{endpoint}\"}} {:.6}",
            m.total_latency_us as f64 / 1_000_000.0
        )?;
        writeln!(
            out,
            "notes_http_request_duration_seconds_count{{endpoint=\"{endpoint}\"}} {}",
            m.latency_count
        )?;
    }

    Ok(())
}
