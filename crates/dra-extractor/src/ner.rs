//! Named Entity Recognition (NER) module
//!
//! Provides two recognizers:
//! - Rule-based: regex patterns + dictionary matching, fully offline
//! - Inference: hosted token-classification model (see [`crate::inference`])

use std::collections::HashSet;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use crate::{EntityRecognizer, ExtractedEntity, InferenceNer};
use dra_core::{EntityType, HttpConfig, NerBackend, NerConfig, Result};

// ============================================================================
// Rule-based NER
// ============================================================================

/// Street suffixes recognized after a house number and capitalized words
const STREET_SUFFIXES: &str =
    r"Street|St|Avenue|Ave|Road|Rd|Boulevard|Blvd|Lane|Ln|Drive|Dr|Highway|Hwy|Way";

/// Regex rule; when the regex has a capture group, group 1 is the entity span
struct PatternRule {
    regex: Regex,
    entity_type: EntityType,
    confidence: f32,
}

/// Dictionary entry for entity matching
#[derive(Debug, Clone)]
pub struct DictionaryEntry {
    pub term: String,
    pub entity_type: EntityType,
    matcher: Regex,
}

/// Rule-based NER using regex patterns and dictionaries
pub struct RuleBasedNer {
    patterns: Vec<PatternRule>,
    dictionary: Vec<DictionaryEntry>,
}

impl RuleBasedNer {
    /// Create a rule-based NER with the default emergency-report rules
    pub fn new() -> Self {
        let mut ner = Self {
            patterns: Vec::new(),
            dictionary: Vec::new(),
        };

        ner.init_patterns();
        ner
    }

    /// Create from config, loading known cities and neighborhoods
    pub fn from_config(config: &NerConfig) -> Self {
        let mut ner = Self::new();
        for city in &config.cities {
            ner.add_term(city, EntityType::City);
        }
        for neighborhood in &config.neighborhoods {
            ner.add_term(neighborhood, EntityType::Neighborhood);
        }
        ner
    }

    fn init_patterns(&mut self) {
        // Phone numbers: optional country code and area code
        self.add_pattern(
            r"(?:\+\d{1,3}[\s-]?)?(?:\(\d{2,4}\)[\s-]?)?\b\d{3,5}[\s-]?\d{3,4}(?:[\s-]?\d{2,4})?\b",
            EntityType::PhoneNumber,
            0.9,
        );

        // House number followed by capitalized words and a suffix
        self.add_pattern(
            &format!(r"\b\d+[A-Za-z]?\s+(?:[A-Z][a-zA-Z]*\s+){{1,3}}(?:{STREET_SUFFIXES})\b\.?"),
            EntityType::Street,
            0.85,
        );

        // Capitalized words right after a street suffix
        self.add_pattern(
            r"\b(?:Street|St|Avenue|Ave|Road|Rd|Boulevard|Blvd|Lane|Ln|Drive)\.?,?\s+([A-Z][a-z]+(?:\s[A-Z][a-z]+)?)",
            EntityType::City,
            0.6,
        );
        self.add_pattern(
            r"\b(?:in|at|near)\s+(?:the\s+city\s+of\s+)([A-Z][a-z]+(?:\s[A-Z][a-z]+)?)",
            EntityType::City,
            0.7,
        );

        // Self-introductions
        self.add_pattern(
            r"(?:[Mm]y name is|I am|I'm|[Tt]his is|[Cc]ontact)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)",
            EntityType::Name,
            0.75,
        );

        // Neighborhoods
        self.add_pattern(
            r"\b([A-Z][a-z]+(?:\s[A-Z][a-z]+)?)\s+(?:neighbou?rhood|area|colony|district|locality)\b",
            EntityType::Neighborhood,
            0.7,
        );
        self.add_pattern(r"\b[A-Z][a-z]+\s?[Nn]agar\b", EntityType::Neighborhood, 0.8);
    }

    fn add_pattern(&mut self, pattern: &str, entity_type: EntityType, confidence: f32) {
        if let Ok(regex) = Regex::new(pattern) {
            self.patterns.push(PatternRule {
                regex,
                entity_type,
                confidence,
            });
        }
    }

    /// Add a dictionary term (case-insensitive, whole words)
    pub fn add_term(&mut self, term: &str, entity_type: EntityType) {
        let term = term.trim();
        if term.is_empty() {
            return;
        }
        if let Ok(matcher) = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(term))) {
            self.dictionary.push(DictionaryEntry {
                term: term.to_string(),
                entity_type,
                matcher,
            });
        }
    }

    pub fn dictionary(&self) -> &[DictionaryEntry] {
        &self.dictionary
    }

    fn extract_by_patterns(&self, text: &str) -> Vec<ExtractedEntity> {
        let mut entities = Vec::new();

        for rule in &self.patterns {
            for caps in rule.regex.captures_iter(text) {
                let Some(mat) = caps.get(1).or_else(|| caps.get(0)) else {
                    continue;
                };
                let span = mat.as_str().trim_end_matches(',');
                if span.trim().is_empty() {
                    continue;
                }
                entities.push(ExtractedEntity {
                    text: span.to_string(),
                    entity_type: rule.entity_type.as_str().to_string(),
                    start: mat.start(),
                    end: mat.start() + span.len(),
                    confidence: rule.confidence,
                });
            }
        }

        entities
    }

    fn extract_by_dictionary(&self, text: &str) -> Vec<ExtractedEntity> {
        let mut entities = Vec::new();

        for entry in &self.dictionary {
            for mat in entry.matcher.find_iter(text) {
                entities.push(ExtractedEntity {
                    text: mat.as_str().to_string(),
                    entity_type: entry.entity_type.as_str().to_string(),
                    start: mat.start(),
                    end: mat.end(),
                    confidence: 0.95,
                });
            }
        }

        entities
    }

    /// Remove overlapping entities, keeping the highest confidence
    fn deduplicate(&self, mut entities: Vec<ExtractedEntity>) -> Vec<ExtractedEntity> {
        entities.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then(a.start.cmp(&b.start))
                .then((b.end - b.start).cmp(&(a.end - a.start)))
        });

        let mut result = Vec::new();
        let mut covered: HashSet<usize> = HashSet::new();

        for entity in entities {
            let overlaps = (entity.start..entity.end).any(|i| covered.contains(&i));

            if !overlaps {
                covered.extend(entity.start..entity.end);
                result.push(entity);
            }
        }

        result.sort_by_key(|e| e.start);
        result
    }

    /// Run patterns and dictionary over `text`
    pub fn extract(&self, text: &str) -> Vec<ExtractedEntity> {
        let mut entities = self.extract_by_patterns(text);
        entities.extend(self.extract_by_dictionary(text));
        self.deduplicate(entities)
    }
}

impl Default for RuleBasedNer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntityRecognizer for RuleBasedNer {
    async fn recognize(&self, text: &str) -> Result<Vec<ExtractedEntity>> {
        Ok(self.extract(text))
    }

    fn name(&self) -> &str {
        "rules"
    }
}

/// Create an entity recognizer from config
pub fn create_recognizer(
    config: &NerConfig,
    http: &HttpConfig,
) -> Result<Box<dyn EntityRecognizer>> {
    debug!(backend = ?config.backend, "creating entity recognizer");
    match config.backend {
        NerBackend::Rules => Ok(Box::new(RuleBasedNer::from_config(config))),
        NerBackend::Inference => Ok(Box::new(InferenceNer::from_config(config, http)?)),
    }
}
