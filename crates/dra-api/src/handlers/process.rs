//! Pipeline handler: process a bot's new channel posts
//!
//! Author: hephaex@gmail.com

use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use dra_core::{ResultTable, Row};
use dra_pipeline::{RunCounts, RunReport};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

/// Request carrying the bot credential
#[derive(Deserialize, ToSchema)]
pub struct ProcessRequest {
    /// Telegram bot token
    #[schema(example = "123456789:AAExampleToken")]
    pub bot_token: String,
}

impl std::fmt::Debug for ProcessRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRequest")
            .field("bot_token", &"<redacted>")
            .finish()
    }
}

impl ProcessRequest {
    fn token(&self) -> Result<&str, AppError> {
        let token = self.bot_token.trim();
        if token.is_empty() {
            return Err(AppError::BadRequest("bot_token cannot be empty".to_string()));
        }
        Ok(token)
    }
}

/// Item counts for one run
#[derive(Debug, Serialize, ToSchema)]
pub struct CountsResponse {
    pub fetched: usize,
    pub skipped: usize,
    pub classified: usize,
    pub rows: usize,
    pub geocoded: usize,
}

impl From<RunCounts> for CountsResponse {
    fn from(counts: RunCounts) -> Self {
        Self {
            fetched: counts.fetched,
            skipped: counts.skipped,
            classified: counts.classified,
            rows: counts.rows,
            geocoded: counts.geocoded,
        }
    }
}

/// Result table plus run diagnostics
#[derive(Debug, Serialize, ToSchema)]
pub struct ProcessResponse {
    /// Column headers, fixed order
    #[schema(example = json!(["Text", "NAME", "STREET", "NEIGHBORHOOD", "CITY", "PHONE_NUMBER", "EASTER_EGG_TAG", "Address", "Coordinates"]))]
    pub columns: Vec<String>,

    /// One object per row keyed by column, keys in column order
    #[schema(value_type = Vec<Object>)]
    pub rows: Vec<Row>,

    pub generated_at: DateTime<Utc>,

    pub run_id: String,

    pub counts: CountsResponse,

    /// Upstream failures observed during the run
    #[schema(example = json!(["channel fetch failed: Transport error: Telegram API error: Unauthorized"]))]
    pub diagnostics: Vec<String>,

    pub processing_time_ms: u64,
}

impl ProcessResponse {
    fn from_report(report: RunReport) -> Self {
        let diagnostics = report.diagnostic_messages();
        let table = report.table;

        Self {
            columns: ResultTable::columns().into_iter().map(String::from).collect(),
            rows: table.rows,
            generated_at: table.generated_at,
            run_id: report.run_id.to_string(),
            counts: report.counts.into(),
            diagnostics,
            processing_time_ms: report.processing_time_ms,
        }
    }
}

/// Fetch new channel posts for the bot and return the disaster table
#[utoipa::path(
    post,
    path = "/api/v1/process",
    tag = "pipeline",
    request_body = ProcessRequest,
    responses(
        (status = 200, description = "Pipeline ran", body = ProcessResponse),
        (status = 400, description = "Missing bot token", body = crate::error::ApiError),
        (status = 500, description = "Internal error", body = crate::error::ApiError)
    )
)]
pub async fn process_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProcessRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();
    let token = req.token()?;

    let report = state.process(token).await?;
    info!(
        run_id = %report.run_id,
        rows = report.table.len(),
        diagnostics = report.diagnostics.len(),
        "processed channel"
    );

    Ok(Json(ProcessResponse::from_report(report)))
}
