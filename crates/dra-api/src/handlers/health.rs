//! Health check handlers
//!
//! Author: hephaex@gmail.com

use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use utoipa::ToSchema;

/// Health check response
#[derive(Serialize, ToSchema)]
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
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness response
#[derive(Serialize, ToSchema)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub checks: ReadinessChecks,
}

/// Configured collaborators
#[derive(Serialize, ToSchema)]
pub struct ReadinessChecks {
    pub classifier: String,
    pub recognizer: String,
    pub geocoder: String,
    pub gazetteer_phrases: usize,
}

/// Readiness probe - reports the configured collaborators
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Service is ready", body = ReadinessResponse)
    )
)]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    // State only exists once every collaborator client has been built
    let pipeline = state.pipeline();

    Json(ReadinessResponse {
        ready: true,
        checks: ReadinessChecks {
            classifier: pipeline.classifier().name().to_string(),
            recognizer: pipeline.extractor().recognizer_name().to_string(),
            geocoder: pipeline.geocoder().name().to_string(),
            gazetteer_phrases: pipeline.extractor().gazetteer().phrases().len(),
        },
    })
}

/// Per-route request statistics
#[derive(Serialize, ToSchema)]
pub struct EndpointStats {
    pub requests: u64,
    pub avg_latency_ms: f64,
    pub status_counts: BTreeMap<u16, u64>,
}

/// JSON metrics response
#[derive(Serialize, ToSchema)]
pub struct MetricsResponse {
    pub uptime_seconds: u64,
    pub total_requests: u64,
    pub requests_per_second: f64,
    pub pipeline_runs: u64,
    pub active_sessions: usize,
    pub endpoints: BTreeMap<String, EndpointStats>,
}

/// Server metrics
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "health",
    responses(
        (status = 200, description = "Server metrics", body = MetricsResponse)
    )
)]
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let uptime = state.uptime_secs();
    let total_requests = state.get_request_count();
    let rps = if uptime > 0 {
        total_requests as f64 / uptime as f64
    } else {
        0.0
    };

    let endpoints = state
        .metrics
        .read()
        .await
        .iter()
        .map(|(endpoint, m)| {
            let avg_latency_ms = if m.count > 0 {
                m.total_latency_us as f64 / m.count as f64 / 1000.0
            } else {
                0.0
            };
            let stats = EndpointStats {
                requests: m.count,
                avg_latency_ms,
                status_counts: m.status_counts.iter().map(|(k, v)| (*k, *v)).collect(),
            };
            (endpoint.clone(), stats)
        })
        .collect();

    Json(MetricsResponse {
        uptime_seconds: uptime,
        total_requests,
        requests_per_second: rps,
        pipeline_runs: state.get_pipeline_runs(),
        active_sessions: state.session_count().await,
        endpoints,
    })
}
