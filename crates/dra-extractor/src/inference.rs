//! Hosted token-classification client
//!
//! Sends a post to `POST {endpoint}/models/{model}` and converts the
//! aggregated entity groups into [`ExtractedEntity`] values.
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use dra_core::{DraError, HttpConfig, NerConfig, Result};
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{EntityRecognizer, ExtractedEntity};

/// Inference API entity recognizer
pub struct InferenceNer {
    client: Client,
    endpoint: String,
    model: String,
    api_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
}

#[derive(Debug, Deserialize)]
struct EntityGroup {
    #[serde(alias = "entity")]
    entity_group: String,
    #[serde(default)]
    word: String,
    #[serde(default)]
    start: Option<usize>,
    #[serde(default)]
    end: Option<usize>,
    #[serde(default)]
    score: f32,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Entities(Vec<EntityGroup>),
    Error { error: String },
}

impl InferenceNer {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_token: None,
        }
    }

    /// Create from config
    pub fn from_config(config: &NerConfig, http: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(http.timeout())
            .build()
            .map_err(|e| DraError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_token: config.api_token.clone(),
        })
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    fn url(&self) -> String {
        format!("{}/models/{}", self.endpoint, self.model)
    }
}

/// Strip IOB prefixes ("B-CITY" -> "CITY")
fn normalize_label(label: &str) -> String {
    let label = label.trim();
    label
        .strip_prefix("B-")
        .or_else(|| label.strip_prefix("I-"))
        .unwrap_or(label)
        .to_string()
}

/// Byte range of the characters `start..end`
fn char_span(text: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    if start >= end {
        return None;
    }
    let mut offsets = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()));
    let byte_start = offsets.nth(start)?;
    let byte_end = offsets.nth(end - start - 1)?;
    Some((byte_start, byte_end))
}

/// Byte range of `word` in `text`, exact first, then ignoring case
fn find_word(text: &str, word: &str) -> Option<(usize, usize)> {
    if let Some(start) = text.find(word) {
        return Some((start, start + word.len()));
    }
    Regex::new(&format!("(?i){}", regex::escape(word)))
        .ok()?
        .find(text)
        .map(|m| (m.start(), m.end()))
}

/// Convert entity groups into spans of `text`.
///
/// Endpoints report character offsets. The offset span is used when it
/// agrees with the reported word; otherwise the word is searched for.
fn to_entities(groups: Vec<EntityGroup>, text: &str) -> Vec<ExtractedEntity> {
    let mut entities: Vec<ExtractedEntity> = groups
        .into_iter()
        .filter_map(|group| {
            let word = group.word.trim();
            let offsets = match (group.start, group.end) {
                (Some(start), Some(end)) => char_span(text, start, end),
                _ => None,
            };
            let agrees = |(s, e): (usize, usize)| {
                word.is_empty() || text[s..e].trim().to_lowercase() == word.to_lowercase()
            };

            let (start, end) = match offsets {
                Some(span) if agrees(span) => span,
                _ if word.is_empty() => return None,
                _ => find_word(text, word).or(offsets)?,
            };

            Some(ExtractedEntity {
                text: text[start..end].to_string(),
                entity_type: normalize_label(&group.entity_group),
                start,
                end,
                confidence: group.score,
            })
        })
        .collect();

    entities.sort_by_key(|e| e.start);
    entities
}

#[async_trait]
impl EntityRecognizer for InferenceNer {
    async fn recognize(&self, text: &str) -> Result<Vec<ExtractedEntity>> {
        let mut request = self.client.post(self.url()).json(&InferenceRequest { inputs: text });
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DraError::Transport(format!("NER request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(DraError::Extraction(format!(
                "NER endpoint returned HTTP {status}: {error_text}"
            )));
        }

        let body: InferenceResponse = response
            .json()
            .await
            .map_err(|e| DraError::MalformedResponse(format!("Failed to parse NER response: {e}")))?;

        match body {
            InferenceResponse::Entities(groups) => {
                let entities = to_entities(groups, text);
                trace!(count = entities.len(), "recognized entities");
                Ok(entities)
            }
            InferenceResponse::Error { error } => {
                Err(DraError::Extraction(format!("Inference error: {error}")))
            }
        }
    }

    fn name(&self) -> &str {
        "inference"
    }
}
