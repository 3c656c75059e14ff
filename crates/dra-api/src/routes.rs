//! API route definitions
//!
//! Author: hephaex@gmail.com

use crate::handlers::{guide, process};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Create API v1 routes
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/guide", get(guide::guide_handler))
        .route("/process", post(process::process_handler))
}
