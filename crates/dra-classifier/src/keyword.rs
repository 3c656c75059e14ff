//! Offline keyword classifier
//!
//! Labels a text disaster-related when it mentions any configured keyword
//! as a whole word. Useful for development without an inference endpoint.

use async_trait::async_trait;
use dra_core::{Classification, DisasterLabel, DraError, Result, TextClassifier};
use regex::Regex;

/// Keyword-based disaster classifier
pub struct KeywordClassifier {
    pattern: Option<Regex>,
}

impl KeywordClassifier {
    /// Build from a keyword list (case-insensitive, whole words)
    pub fn new<I, S>(keywords: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let alternatives: Vec<String> = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_string())
            .filter(|k| !k.is_empty())
            .map(|k| regex::escape(&k))
            .collect();

        if alternatives.is_empty() {
            return Ok(Self { pattern: None });
        }

        let pattern = Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives.join("|")))
            .map_err(|e| DraError::Config(format!("Invalid classifier keywords: {e}")))?;

        Ok(Self {
            pattern: Some(pattern),
        })
    }

    fn matches(&self, text: &str) -> usize {
        self.pattern
            .as_ref()
            .map(|p| p.find_iter(text).count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl TextClassifier for KeywordClassifier {
    async fn classify(&self, text: &str) -> Result<Classification> {
        let label = if self.matches(text) > 0 {
            DisasterLabel::DisasterRelated
        } else {
            DisasterLabel::NotDisasterRelated
        };
        Ok(Classification::from_model(label.as_str(), 1.0))
    }

    fn name(&self) -> &str {
        "keyword"
    }
}
