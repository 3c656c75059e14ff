//! DRA API - Web server for the disaster recovery assistant
//!
//! Serves the credential form and result table, plus a JSON API that runs
//! the pipeline for one bot token at a time.
//!
//! Author: hephaex@gmail.com

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::{guide, health, process};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Disaster Recovery Assistant API",
        description = "Reads a Telegram channel, keeps disaster-related posts and extracts names, addresses and phone numbers"
    ),
    paths(
        health::health_check,
        health::readiness_check,
        health::metrics,
        guide::guide_handler,
        process::process_handler,
    ),
    components(schemas(
        error::ApiError,
        health::HealthResponse,
        health::ReadinessResponse,
        health::ReadinessChecks,
        health::MetricsResponse,
        health::EndpointStats,
        guide::GuideResponse,
        process::ProcessRequest,
        process::ProcessResponse,
        process::CountsResponse,
    )),
    tags(
        (name = "health", description = "Liveness, readiness and metrics"),
        (name = "pipeline", description = "Channel processing"),
        (name = "guide", description = "Bot setup guide")
    )
)]
pub struct ApiDoc;

/// CORS for configured origins; none configured means same-origin only
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(allowed)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE]),
    )
}

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    let router = Router::new()
        .route("/", get(guide::index))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics))
        .nest("/api/v1", routes::api_routes())
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::metrics_middleware,
        ))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    match cors {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

/// Router over an offline pipeline (keyword classifier, rule-based NER)
#[cfg(any(test, feature = "test-utils"))]
pub fn create_router_for_testing() -> Router {
    let mut config = dra_core::AppConfig::default();
    config.classifier.backend = dra_core::ClassifierBackend::Keyword;
    config.ner.backend = dra_core::NerBackend::Rules;

    let state = AppState::new(config).expect("offline pipeline builds from defaults");
    create_router(Arc::new(state))
}
