//! DRA Pipeline - Fetch, classify, extract and enrich channel posts
//!
//! Composes the stages into one linear run:
//! channel fetch → disaster classification → entity extraction →
//! address derivation and geocoding → result table.
//!
//! Every collaborator call is awaited in turn. A failing call degrades the
//! affected item and is recorded as a [`Diagnostic`]; a run never errors.
//!
//! Author: hephaex@gmail.com

use std::time::Instant;

use dra_channel::ChannelSession;
use dra_classifier::{classify_posts, create_classifier};
use dra_core::{
    AppConfig, DraError, GeocodeOutcome, Geocoder, Result, ResultTable, TextClassifier, UpdateId,
};
use dra_extractor::Extractor;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub mod enrich;
pub mod geocoder;
pub mod render;

pub use enrich::{derive_address, enrich_and_render, ExtractedPost};
pub use geocoder::NominatimGeocoder;
pub use render::{render_json, render_table};

// ============================================================================
// Run Report
// ============================================================================

/// Pipeline stage that produced a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetch,
    Classify,
    Extract,
    Geocode,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Fetch => "channel fetch",
            Self::Classify => "classification",
            Self::Extract => "extraction",
            Self::Geocode => "geocoding",
        };
        f.write_str(name)
    }
}

/// An upstream failure observed during a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub stage: Stage,
    pub kind: String,
    pub message: String,
}

impl Diagnostic {
    pub fn from_error(stage: Stage, error: &DraError) -> Self {
        Self {
            stage,
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.message)
    }
}

/// Item counts for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounts {
    /// Post texts read from the channel
    pub fetched: usize,
    /// Updates without a channel post text
    pub skipped: usize,
    /// Posts labeled disaster-related
    pub classified: usize,
    pub rows: usize,
    /// Rows with coordinates
    pub geocoded: usize,
}

/// Everything one pipeline invocation produced
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub table: ResultTable,
    pub counts: RunCounts,
    pub diagnostics: Vec<Diagnostic>,
    /// Session cursor after the fetch
    pub cursor: Option<UpdateId>,
    pub processing_time_ms: u64,
}

impl RunReport {
    /// Diagnostics as display strings
    pub fn diagnostic_messages(&self) -> Vec<String> {
        self.diagnostics.iter().map(ToString::to_string).collect()
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Linear pipeline over the classifier, extractor and geocoder
pub struct Pipeline {
    classifier: Box<dyn TextClassifier>,
    extractor: Extractor,
    geocoder: Box<dyn Geocoder>,
}

impl Pipeline {
    pub fn new(
        classifier: Box<dyn TextClassifier>,
        extractor: Extractor,
        geocoder: Box<dyn Geocoder>,
    ) -> Self {
        Self {
            classifier,
            extractor,
            geocoder,
        }
    }

    /// Build every collaborator from the application config
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let classifier = create_classifier(&config.classifier, &config.http)?;
        let extractor = Extractor::from_config(config)?;
        let geocoder = NominatimGeocoder::from_config(&config.geocoder, &config.http)?;

        info!(
            classifier = classifier.name(),
            gazetteer_mode = ?extractor.mode(),
            "pipeline ready"
        );
        Ok(Self::new(classifier, extractor, Box::new(geocoder)))
    }

    pub fn classifier(&self) -> &dyn TextClassifier {
        self.classifier.as_ref()
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    pub fn geocoder(&self) -> &dyn Geocoder {
        self.geocoder.as_ref()
    }

    /// Fetch new posts for the session and process them
    pub async fn run(&self, session: &mut ChannelSession) -> RunReport {
        let start_time = Instant::now();
        let fetched = session.fetch().await;

        let mut diagnostics = Vec::new();
        if let Some(error) = &fetched.failure {
            diagnostics.push(Diagnostic::from_error(Stage::Fetch, error));
        }

        let mut report = self.process_texts(fetched.texts).await;
        report.counts.skipped = fetched.skipped;
        report.cursor = fetched.cursor;
        diagnostics.append(&mut report.diagnostics);
        report.diagnostics = diagnostics;
        report.processing_time_ms = start_time.elapsed().as_millis() as u64;

        info!(
            run_id = %report.run_id,
            fetched = report.counts.fetched,
            skipped = report.counts.skipped,
            classified = report.counts.classified,
            rows = report.counts.rows,
            geocoded = report.counts.geocoded,
            diagnostics = report.diagnostics.len(),
            elapsed_ms = report.processing_time_ms,
            "pipeline run finished"
        );
        report
    }

    /// Classify, extract and enrich already-fetched texts
    pub async fn process_texts(&self, texts: Vec<String>) -> RunReport {
        let start_time = Instant::now();
        let run_id = Uuid::new_v4();
        let mut counts = RunCounts {
            fetched: texts.len(),
            ..Default::default()
        };
        let mut diagnostics = Vec::new();

        debug!(%run_id, texts = texts.len(), "processing texts");

        let classified = classify_posts(self.classifier.as_ref(), texts).await;
        diagnostics.extend(
            classified
                .failures
                .iter()
                .map(|e| Diagnostic::from_error(Stage::Classify, e)),
        );
        counts.classified = classified.retained.len();

        let mut posts = Vec::with_capacity(classified.retained.len());
        for post in classified.retained {
            let extraction = self.extractor.extract(&post.text).await;
            if let Some(error) = &extraction.failure {
                diagnostics.push(Diagnostic::from_error(Stage::Extract, error));
            }
            posts.push(ExtractedPost::new(post.text, extraction.record));
        }

        let table = enrich_and_render(posts, self.geocoder.as_ref()).await;
        for row in &table.rows {
            if let GeocodeOutcome::Failed(message) = &row.geocode {
                warn!(%run_id, address = %row.address, "row left without coordinates");
                diagnostics.push(Diagnostic {
                    stage: Stage::Geocode,
                    kind: "geocode".to_string(),
                    message: message.clone(),
                });
            }
        }
        counts.rows = table.len();
        counts.geocoded = table.rows.iter().filter(|r| r.coordinates().is_some()).count();

        RunReport {
            run_id,
            table,
            counts,
            diagnostics,
            cursor: None,
            processing_time_ms: start_time.elapsed().as_millis() as u64,
        }
    }
}
