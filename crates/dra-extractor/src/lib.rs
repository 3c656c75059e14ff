//! DRA Extractor - Entity extraction for disaster posts
//!
//! Runs a named-entity recognizer over each disaster post, adds exact
//! gazetteer phrase matches, and maps the result onto the fixed entity
//! columns of the result table.

use async_trait::async_trait;
use dra_core::{
    AppConfig, DraError, EntityRecord, EntityType, ExtractorConfig, GazetteerMode, Result,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub mod gazetteer;
pub mod inference;
pub mod ner;

pub use gazetteer::PhraseMatcher;
pub use inference::InferenceNer;
pub use ner::{create_recognizer, RuleBasedNer};

/// Extracted entity from text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub text: String,
    pub entity_type: String,
    pub start: usize,
    pub end: usize,
    pub confidence: f32,
}

impl ExtractedEntity {
    pub fn overlaps(&self, other: &ExtractedEntity) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Trait for entity recognizers
#[async_trait]
pub trait EntityRecognizer: Send + Sync {
    async fn recognize(&self, text: &str) -> Result<Vec<ExtractedEntity>>;

    /// Get recognizer name for logging
    fn name(&self) -> &str;
}

/// Extraction result for one post
#[derive(Debug)]
pub struct Extraction {
    /// One value per entity column
    pub record: EntityRecord,
    /// Final entity set after the gazetteer pass, sorted by position
    pub entities: Vec<ExtractedEntity>,
    /// Recognizer failure; the record then holds gazetteer matches only
    pub failure: Option<DraError>,
}

/// Map entities onto the fixed columns, first match per type
pub fn to_record(entities: &[ExtractedEntity]) -> EntityRecord {
    let mut record = EntityRecord::new();
    for entity in entities {
        if let Some(entity_type) = EntityType::from_label(&entity.entity_type) {
            if !record.has(entity_type) {
                record.set(entity_type, entity.text.clone());
            }
        }
    }
    record
}

/// Recognizer + gazetteer pipeline
pub struct Extractor {
    recognizer: Box<dyn EntityRecognizer>,
    gazetteer: PhraseMatcher,
    mode: GazetteerMode,
}

impl Extractor {
    pub fn new(recognizer: Box<dyn EntityRecognizer>, gazetteer: PhraseMatcher) -> Self {
        Self {
            recognizer,
            gazetteer,
            mode: GazetteerMode::default(),
        }
    }

    /// Set how gazetteer matches combine with recognized entities
    pub fn with_mode(mut self, mode: GazetteerMode) -> Self {
        self.mode = mode;
        self
    }

    /// Build with a recognizer and the gazetteer settings from config
    pub fn with_config(recognizer: Box<dyn EntityRecognizer>, config: &ExtractorConfig) -> Self {
        Self::new(recognizer, PhraseMatcher::new(&config.gazetteer)).with_mode(config.gazetteer_mode)
    }

    /// Create recognizer and gazetteer from the application config
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let recognizer = create_recognizer(&config.ner, &config.http)?;
        Ok(Self::with_config(recognizer, &config.extractor))
    }

    pub fn mode(&self) -> GazetteerMode {
        self.mode
    }

    pub fn gazetteer(&self) -> &PhraseMatcher {
        &self.gazetteer
    }

    pub fn recognizer_name(&self) -> &str {
        self.recognizer.name()
    }

    /// Extract entities, propagating recognizer failures
    pub async fn try_extract(&self, text: &str) -> Result<EntityRecord> {
        let recognized = self.recognizer.recognize(text).await?;
        let entities = self.gazetteer.apply(self.mode, recognized, text);
        Ok(to_record(&entities))
    }

    /// Extract entities; a recognizer failure degrades to gazetteer matches
    pub async fn extract(&self, text: &str) -> Extraction {
        let (recognized, failure) = match self.recognizer.recognize(text).await {
            Ok(entities) => (entities, None),
            Err(e) => {
                warn!(recognizer = self.recognizer.name(), error = %e, "entity recognition failed");
                (Vec::new(), Some(e))
            }
        };

        let entities = self.gazetteer.apply(self.mode, recognized, text);
        let record = to_record(&entities);
        debug!(entities = entities.len(), "extracted entities");

        Extraction {
            record,
            entities,
            failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(text: &str, label: &str, start: usize) -> ExtractedEntity {
        ExtractedEntity {
            text: text.to_string(),
            entity_type: label.to_string(),
            start,
            end: start + text.len(),
            confidence: 0.9,
        }
    }

    /// Recognizer returning a fixed entity list
    struct FixedRecognizer(Vec<ExtractedEntity>);

    #[async_trait]
    impl EntityRecognizer for FixedRecognizer {
        async fn recognize(&self, _text: &str) -> Result<Vec<ExtractedEntity>> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct FailingRecognizer;

    #[async_trait]
    impl EntityRecognizer for FailingRecognizer {
        async fn recognize(&self, _text: &str) -> Result<Vec<ExtractedEntity>> {
            Err(DraError::Extraction("model offline".to_string()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[test]
    fn test_first_match_wins() {
        let record = to_record(&[
            entity("Springfield", "CITY", 0),
            entity("Shelbyville", "CITY", 20),
            entity("555-1234", "PHONE NUMBER", 40),
        ]);

        assert_eq!(record.get(EntityType::City), "Springfield");
        assert_eq!(record.get(EntityType::PhoneNumber), "555-1234");
        assert_eq!(record.get(EntityType::Name), "");
    }

    #[test]
    fn test_unknown_labels_ignored() {
        let record = to_record(&[entity("Tuesday", "DATE", 0)]);
        assert_eq!(record, EntityRecord::new());
    }

    #[tokio::test]
    async fn test_merge_keeps_recognized_entities() {
        let text = "மதனா பாலா at 12 Beach Rd";
        let street_start = text.find("12 Beach Rd").unwrap();
        let extractor = Extractor::new(
            Box::new(FixedRecognizer(vec![entity("12 Beach Rd", "STREET", street_start)])),
            PhraseMatcher::new(["மதனா பாலா"]),
        );

        let extraction = extractor.extract(text).await;

        assert_eq!(extraction.record.get(EntityType::EasterEggTag), "மதனா பாலா");
        assert_eq!(extraction.record.get(EntityType::Street), "12 Beach Rd");
        assert!(extraction.failure.is_none());
    }

    #[tokio::test]
    async fn test_replace_mode_keeps_only_gazetteer() {
        let text = "மதனா பாலா at 12 Beach Rd";
        let street_start = text.find("12 Beach Rd").unwrap();
        let extractor = Extractor::new(
            Box::new(FixedRecognizer(vec![entity("12 Beach Rd", "STREET", street_start)])),
            PhraseMatcher::new(["மதனா பாலா"]),
        )
        .with_mode(GazetteerMode::Replace);

        let record = extractor.try_extract(text).await.unwrap();

        assert_eq!(record.get(EntityType::EasterEggTag), "மதனா பாலா");
        assert_eq!(record.get(EntityType::Street), "");
    }

    #[tokio::test]
    async fn test_recognizer_failure_degrades() {
        let extractor = Extractor::new(Box::new(FailingRecognizer), PhraseMatcher::new(["Relief Camp"]));

        let extraction = extractor.extract("Go to Relief Camp now").await;

        assert_eq!(extraction.record.get(EntityType::EasterEggTag), "Relief Camp");
        assert!(matches!(extraction.failure, Some(DraError::Extraction(_))));
        assert!(extractor.try_extract("anything").await.is_err());
    }
}
