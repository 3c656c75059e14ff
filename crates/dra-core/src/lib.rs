//! DRA Core - Domain model, error types and collaborator traits
//!
//! This crate defines the abstractions shared by the disaster recovery
//! assistant pipeline:
//! - Error taxonomy for the external collaborators
//! - Disaster labels and classified posts
//! - The fixed entity-type columns and per-post entity records
//! - Result rows and the result table
//! - Traits for the classifier and geocoder collaborators
//! - Configuration management
//!
//! Author: hephaex@gmail.com

pub mod config;
pub mod guide;

pub use config::{
    AppConfig, ClassifierBackend, ClassifierConfig, ConfigError, ExtractorConfig, GazetteerMode,
    GeocoderConfig, HttpConfig, NerBackend, NerConfig, TelegramConfig,
};

use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised by the pipeline collaborators
#[derive(Error, Debug)]
pub enum DraError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Classification failed: {0}")]
    Classification(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Geocoding failed: {0}")]
    Geocode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DraError {
    /// Short machine-readable kind, used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Classification(_) => "classification",
            Self::Extraction(_) => "extraction",
            Self::Geocode(_) => "geocode",
            Self::Config(_) => "config",
            Self::Other(_) => "other",
        }
    }
}

impl From<ConfigError> for DraError {
    fn from(err: ConfigError) -> Self {
        DraError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DraError>;

// ============================================================================
// Channel
// ============================================================================

/// Identifier of a channel update, monotonically increasing per bot
pub type UpdateId = i64;

// ============================================================================
// Classification
// ============================================================================

/// Closed set of labels produced by the disaster classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisasterLabel {
    DisasterRelated,
    NotDisasterRelated,
}

impl DisasterLabel {
    /// Map a raw model label onto the closed set.
    ///
    /// Only `DISASTER` (any case) counts as disaster-related; every other
    /// label the model emits is treated as not disaster-related.
    pub fn from_model_label(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("DISASTER") {
            Self::DisasterRelated
        } else {
            Self::NotDisasterRelated
        }
    }

    pub fn is_disaster(&self) -> bool {
        matches!(self, Self::DisasterRelated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DisasterRelated => "DISASTER",
            Self::NotDisasterRelated => "NOT_DISASTER",
        }
    }
}

impl std::fmt::Display for DisasterLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Top label returned by a classifier for one text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Normalized label
    pub label: DisasterLabel,
    /// Label exactly as the model returned it
    pub raw_label: String,
    /// Model score for the top label
    pub score: f32,
}

impl Classification {
    pub fn from_model(raw_label: impl Into<String>, score: f32) -> Self {
        let raw_label = raw_label.into();
        Self {
            label: DisasterLabel::from_model_label(&raw_label),
            raw_label,
            score,
        }
    }
}

/// A fetched post paired with its classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedPost {
    pub text: String,
    pub classification: Classification,
}

// ============================================================================
// Entities
// ============================================================================

/// Fixed set of entity columns in the result table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Name,
    Street,
    Neighborhood,
    City,
    PhoneNumber,
    EasterEggTag,
}

impl EntityType {
    /// All entity types, in column order
    pub const ALL: [EntityType; 6] = [
        Self::Name,
        Self::Street,
        Self::Neighborhood,
        Self::City,
        Self::PhoneNumber,
        Self::EasterEggTag,
    ];

    /// Column header for this entity type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "NAME",
            Self::Street => "STREET",
            Self::Neighborhood => "NEIGHBORHOOD",
            Self::City => "CITY",
            Self::PhoneNumber => "PHONE_NUMBER",
            Self::EasterEggTag => "EASTER_EGG_TAG",
        }
    }

    /// Parse a recognizer label, accepting the aliases used by the
    /// disaster NER model (`PHONE NUMBER`, `YO!`).
    ///
    /// Returns `None` for labels outside the fixed set (e.g. `GPE`).
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_ascii_uppercase().replace(&[' ', '-'][..], "_");
        match normalized.as_str() {
            "NAME" | "PERSON" => Some(Self::Name),
            "STREET" => Some(Self::Street),
            "NEIGHBORHOOD" | "NEIGHBOURHOOD" => Some(Self::Neighborhood),
            "CITY" => Some(Self::City),
            "PHONE_NUMBER" | "PHONE" => Some(Self::PhoneNumber),
            "EASTER_EGG_TAG" | "YO!" => Some(Self::EasterEggTag),
            _ => None,
        }
    }

    fn index(&self) -> usize {
        match self {
            Self::Name => 0,
            Self::Street => 1,
            Self::Neighborhood => 2,
            Self::City => 3,
            Self::PhoneNumber => 4,
            Self::EasterEggTag => 5,
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Entity values extracted from one post.
///
/// Every entity type always has a value; types that were not found hold
/// the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityRecord {
    values: [String; 6],
}

impl EntityRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for an entity type (`""` when absent)
    pub fn get(&self, entity_type: EntityType) -> &str {
        &self.values[entity_type.index()]
    }

    pub fn set(&mut self, entity_type: EntityType, value: impl Into<String>) {
        self.values[entity_type.index()] = value.into();
    }

    /// Builder-style setter
    pub fn with(mut self, entity_type: EntityType, value: impl Into<String>) -> Self {
        self.set(entity_type, value);
        self
    }

    /// Whether a value was extracted for this type
    pub fn has(&self, entity_type: EntityType) -> bool {
        !self.get(entity_type).is_empty()
    }

    /// `(type, value)` pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (EntityType, &str)> {
        EntityType::ALL.into_iter().map(move |t| (t, self.get(t)))
    }
}

impl Serialize for EntityRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(EntityType::ALL.len()))?;
        for (entity_type, value) in self.iter() {
            map.serialize_entry(entity_type.as_str(), value)?;
        }
        map.end()
    }
}

// ============================================================================
// Geocoding
// ============================================================================

/// A latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// Result of resolving one address.
///
/// Separates "no match" from "the geocoder failed" while both still leave
/// the row without coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum GeocodeOutcome {
    Resolved(Coordinates),
    NotFound,
    Failed(String),
}

impl GeocodeOutcome {
    pub fn coordinates(&self) -> Option<Coordinates> {
        match self {
            Self::Resolved(coords) => Some(*coords),
            _ => None,
        }
    }
}

// ============================================================================
// Result Table
// ============================================================================

/// Header of the leading text column
pub const TEXT_COLUMN: &str = "Text";
/// Header of the derived address column
pub const ADDRESS_COLUMN: &str = "Address";
/// Header of the derived coordinates column
pub const COORDINATES_COLUMN: &str = "Coordinates";

/// One presented row: a disaster post with its entities and derived fields
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub text: String,
    pub entities: EntityRecord,
    pub address: String,
    pub geocode: GeocodeOutcome,
}

impl Row {
    pub fn coordinates(&self) -> Option<Coordinates> {
        self.geocode.coordinates()
    }

    /// Cell values as display strings, in column order
    pub fn cells(&self) -> Vec<String> {
        let mut cells = Vec::with_capacity(EntityType::ALL.len() + 3);
        cells.push(self.text.clone());
        cells.extend(self.entities.iter().map(|(_, v)| v.to_string()));
        cells.push(self.address.clone());
        cells.push(
            self.coordinates()
                .map(|c| c.to_string())
                .unwrap_or_default(),
        );
        cells
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(EntityType::ALL.len() + 3))?;
        map.serialize_entry(TEXT_COLUMN, &self.text)?;
        for (entity_type, value) in self.entities.iter() {
            map.serialize_entry(entity_type.as_str(), value)?;
        }
        map.serialize_entry(ADDRESS_COLUMN, &self.address)?;
        let coords = self.coordinates().map(|c| (c.latitude, c.longitude));
        map.serialize_entry(COORDINATES_COLUMN, &coords)?;
        map.end()
    }
}

/// Ordered rows produced by one pipeline invocation
#[derive(Debug, Clone)]
pub struct ResultTable {
    pub rows: Vec<Row>,
    pub generated_at: DateTime<Utc>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            generated_at: Utc::now(),
        }
    }

    /// Column headers; identical for every table
    pub fn columns() -> Vec<&'static str> {
        let mut columns = Vec::with_capacity(EntityType::ALL.len() + 3);
        columns.push(TEXT_COLUMN);
        columns.extend(EntityType::ALL.iter().map(|t| t.as_str()));
        columns.push(ADDRESS_COLUMN);
        columns.push(COORDINATES_COLUMN);
        columns
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows as display cells
    pub fn cells(&self) -> Vec<Vec<String>> {
        self.rows.iter().map(Row::cells).collect()
    }
}

impl Default for ResultTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Serialize for ResultTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ResultTable", 3)?;
        state.serialize_field("columns", &Self::columns())?;
        state.serialize_field("rows", &self.rows)?;
        state.serialize_field("generated_at", &self.generated_at)?;
        state.end()
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Trait for disaster classifiers
#[async_trait::async_trait]
pub trait TextClassifier: Send + Sync {
    /// Classify a single text, returning its top label
    async fn classify(&self, text: &str) -> Result<Classification>;

    /// Get classifier name for logging
    fn name(&self) -> &str;
}

/// Trait for geocoding services
#[async_trait::async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve a free-text address.
    ///
    /// `Ok(None)` means the service answered but found no match.
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>>;

    /// Get geocoder name for logging
    fn name(&self) -> &str;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_mapping() {
        assert_eq!(
            DisasterLabel::from_model_label("DISASTER"),
            DisasterLabel::DisasterRelated
        );
        assert_eq!(
            DisasterLabel::from_model_label("disaster"),
            DisasterLabel::DisasterRelated
        );
        assert_eq!(
            DisasterLabel::from_model_label("NOT_DISASTER"),
            DisasterLabel::NotDisasterRelated
        );
        assert_eq!(
            DisasterLabel::from_model_label("LABEL_0"),
            DisasterLabel::NotDisasterRelated
        );
    }

    #[test]
    fn test_entity_label_aliases() {
        assert_eq!(
            EntityType::from_label("PHONE NUMBER"),
            Some(EntityType::PhoneNumber)
        );
        assert_eq!(EntityType::from_label("YO!"), Some(EntityType::EasterEggTag));
        assert_eq!(EntityType::from_label("street"), Some(EntityType::Street));
        assert_eq!(EntityType::from_label("GPE"), None);
    }

    #[test]
    fn test_record_defaults_to_empty() {
        let record = EntityRecord::new().with(EntityType::City, "Springfield");

        assert_eq!(record.get(EntityType::City), "Springfield");
        for entity_type in EntityType::ALL {
            if entity_type != EntityType::City {
                assert_eq!(record.get(entity_type), "");
                assert!(!record.has(entity_type));
            }
        }
    }

    #[test]
    fn test_columns_fixed_order() {
        assert_eq!(
            ResultTable::columns(),
            vec![
                "Text",
                "NAME",
                "STREET",
                "NEIGHBORHOOD",
                "CITY",
                "PHONE_NUMBER",
                "EASTER_EGG_TAG",
                "Address",
                "Coordinates",
            ]
        );
    }

    #[test]
    fn test_row_serializes_in_column_order() {
        let row = Row {
            text: "fire".to_string(),
            entities: EntityRecord::new().with(EntityType::Street, "123 Main St"),
            address: "123 Main St, , ".to_string(),
            geocode: GeocodeOutcome::Resolved(Coordinates::new(1.5, -2.5)),
        };

        let json = serde_json::to_string(&row).unwrap();
        assert!(json.starts_with(r#"{"Text":"fire","NAME":"","STREET":"123 Main St""#));
        assert!(json.ends_with(r#""Address":"123 Main St, , ","Coordinates":[1.5,-2.5]}"#));
    }

    #[test]
    fn test_row_without_coordinates() {
        let row = Row {
            text: "flood".to_string(),
            entities: EntityRecord::new(),
            address: ", , ".to_string(),
            geocode: GeocodeOutcome::Failed("timeout".to_string()),
        };

        assert!(row.coordinates().is_none());
        let value = serde_json::to_value(&row).unwrap();
        assert!(value["Coordinates"].is_null());
        assert_eq!(row.cells().len(), ResultTable::columns().len());
        assert_eq!(row.cells().last().unwrap(), "");
    }

    #[test]
    fn test_empty_table_keeps_columns() {
        let table = ResultTable::new();
        let value = serde_json::to_value(&table).unwrap();

        assert_eq!(value["columns"].as_array().unwrap().len(), 9);
        assert!(value["rows"].as_array().unwrap().is_empty());
    }

    proptest::proptest! {
        #[test]
        fn prop_row_cells_match_columns(
            text in ".*",
            values in proptest::collection::vec(".*", 6),
            coords in proptest::option::of((-90.0f64..90.0, -180.0f64..180.0)),
        ) {
            let mut entities = EntityRecord::new();
            for (entity_type, value) in EntityType::ALL.iter().zip(values) {
                entities.set(*entity_type, value);
            }
            let geocode = match coords {
                Some((lat, lon)) => GeocodeOutcome::Resolved(Coordinates::new(lat, lon)),
                None => GeocodeOutcome::NotFound,
            };
            let row = Row { text, entities, address: String::new(), geocode };

            proptest::prop_assert_eq!(row.cells().len(), ResultTable::columns().len());
            let value = serde_json::to_value(&row).unwrap();
            proptest::prop_assert_eq!(value.as_object().unwrap().len(), ResultTable::columns().len());
        }
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(DraError::Transport("x".into()).kind(), "transport");
        assert_eq!(DraError::Geocode("x".into()).kind(), "geocode");
    }
}
