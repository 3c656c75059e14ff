//! Hosted text-classification client
//!
//! Calls an inference endpoint serving the disaster message classifier
//! (`POST {endpoint}/models/{model}` with `{"inputs": text}`).
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use dra_core::{Classification, ClassifierConfig, DraError, HttpConfig, Result, TextClassifier};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Inference API classifier
pub struct InferenceClassifier {
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
struct LabelScore {
    label: String,
    score: f32,
}

/// The endpoint nests scores per input for pipelines, but returns a flat
/// list for some deployments
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
    Error { error: String },
}

impl InferenceClassifier {
    /// Create a new classifier client
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_token: None,
        }
    }

    /// Create from config
    pub fn from_config(config: &ClassifierConfig, http: &HttpConfig) -> Result<Self> {
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

    /// Set the bearer token
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!("{}/models/{}", self.endpoint, self.model)
    }
}

/// Pick the highest-scoring label from a response body
fn top_label(body: InferenceResponse) -> Result<Classification> {
    let scores = match body {
        InferenceResponse::Nested(mut nested) => {
            if nested.is_empty() {
                Vec::new()
            } else {
                nested.swap_remove(0)
            }
        }
        InferenceResponse::Flat(flat) => flat,
        InferenceResponse::Error { error } => {
            return Err(DraError::Classification(format!("Inference error: {error}")))
        }
    };

    scores
        .into_iter()
        .max_by(|a, b| a.score.total_cmp(&b.score))
        .map(|top| Classification::from_model(top.label, top.score))
        .ok_or_else(|| DraError::Classification("No label returned".to_string()))
}

#[async_trait]
impl TextClassifier for InferenceClassifier {
    async fn classify(&self, text: &str) -> Result<Classification> {
        let mut request = self.client.post(self.url()).json(&InferenceRequest { inputs: text });
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DraError::Transport(format!("Classifier request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(DraError::Classification(format!(
                "Classifier returned HTTP {status}: {error_text}"
            )));
        }

        let body: InferenceResponse = response
            .json()
            .await
            .map_err(|e| DraError::MalformedResponse(format!("Failed to parse classifier response: {e}")))?;

        let classification = top_label(body)?;
        trace!(label = %classification.raw_label, score = classification.score, "classified");
        Ok(classification)
    }

    fn name(&self) -> &str {
        "inference"
    }
}
