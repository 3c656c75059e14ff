//! DRA Configuration Management
//!
//! Handles configuration from environment variables and TOML files
//! with sensible defaults for local development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Telegram Bot API access
    pub telegram: TelegramConfig,

    /// Shared HTTP client settings
    pub http: HttpConfig,

    /// Disaster classifier
    pub classifier: ClassifierConfig,

    /// Named-entity recognizer
    pub ner: NerConfig,

    /// Gazetteer and field mapping
    pub extractor: ExtractorConfig,

    /// Geocoding service
    pub geocoder: GeocoderConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_override()
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Load from an optional file, then apply environment overrides
    pub fn load(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        base.with_env_override()
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server
        if let Some(host) = lookup("API_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("API_PORT") {
            self.server.port = parse_value("API_PORT", &port)?;
        }
        if let Some(origins) = lookup("CORS_ORIGINS") {
            self.server.cors_origins = split_list(&origins, ',');
        }

        // Telegram
        if let Some(url) = lookup("TELEGRAM_API_URL") {
            self.telegram.base_url = url;
        }

        // HTTP
        if let Some(secs) = lookup("HTTP_TIMEOUT_SECS") {
            self.http.timeout_secs = parse_value("HTTP_TIMEOUT_SECS", &secs)?;
        }

        // Inference credentials are shared by classifier and NER
        if let Some(token) = lookup("HF_API_TOKEN") {
            self.classifier.api_token = Some(token.clone());
            self.ner.api_token = Some(token);
        }

        // Classifier
        if let Some(backend) = lookup("CLASSIFIER_BACKEND") {
            self.classifier.backend = backend.parse()?;
        }
        if let Some(endpoint) = lookup("CLASSIFIER_ENDPOINT") {
            self.classifier.endpoint = endpoint;
        }
        if let Some(model) = lookup("CLASSIFIER_MODEL") {
            self.classifier.model = model;
        }

        // NER
        if let Some(backend) = lookup("NER_BACKEND") {
            self.ner.backend = backend.parse()?;
        }
        if let Some(endpoint) = lookup("NER_ENDPOINT") {
            self.ner.endpoint = endpoint;
        }
        if let Some(model) = lookup("NER_MODEL") {
            self.ner.model = model;
        }

        // Gazetteer (phrases separated by '|', since phrases contain spaces)
        if let Some(phrases) = lookup("GAZETTEER_PHRASES") {
            self.extractor.gazetteer = split_list(&phrases, '|');
        }
        if let Some(mode) = lookup("GAZETTEER_MODE") {
            self.extractor.gazetteer_mode = mode.parse()?;
        }

        // Geocoder
        if let Some(url) = lookup("NOMINATIM_URL") {
            self.geocoder.base_url = url;
        }
        if let Some(agent) = lookup("GEOCODER_USER_AGENT") {
            self.geocoder.user_agent = agent;
        }

        // Logging
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = lookup("LOG_JSON") {
            self.logging.json_format = parse_value("LOG_JSON", &json)?;
        }

        Ok(self)
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn split_list(value: &str, separator: char) -> Vec<String> {
    value
        .split(separator)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed origins for CORS (empty = same-origin only)
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec![],
        }
    }
}

/// Telegram Bot API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// API root; the bot path `/bot{token}` is appended per request
    pub base_url: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.telegram.org".to_string(),
        }
    }
}

/// Shared HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

/// Classifier backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierBackend {
    /// Hosted text-classification inference endpoint
    Inference,
    /// Offline keyword rules
    Keyword,
}

impl std::str::FromStr for ClassifierBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inference" => Ok(Self::Inference),
            "keyword" => Ok(Self::Keyword),
            _ => Err(ConfigError::InvalidValue {
                key: "CLASSIFIER_BACKEND".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Disaster classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub backend: ClassifierBackend,

    /// Inference API root (model path is appended)
    pub endpoint: String,

    /// Model identifier
    pub model: String,

    /// Bearer token for the inference API
    pub api_token: Option<String>,

    /// Keywords used by the offline backend
    pub keywords: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            backend: ClassifierBackend::Inference,
            endpoint: "https://api-inference.huggingface.co".to_string(),
            model: "Madhana/disaster_msges_classifier_v1".to_string(),
            api_token: None,
            keywords: [
                "fire",
                "flood",
                "earthquake",
                "cyclone",
                "storm",
                "landslide",
                "trapped",
                "rescue",
                "collapsed",
                "injured",
                "evacuate",
                "tsunami",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// NER backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NerBackend {
    /// Hosted token-classification inference endpoint
    Inference,
    /// Offline regex + dictionary rules
    Rules,
}

impl std::str::FromStr for NerBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inference" => Ok(Self::Inference),
            "rules" => Ok(Self::Rules),
            _ => Err(ConfigError::InvalidValue {
                key: "NER_BACKEND".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Named-entity recognizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NerConfig {
    pub backend: NerBackend,

    /// Inference API root (model path is appended)
    pub endpoint: String,

    /// Model identifier
    pub model: String,

    /// Bearer token for the inference API
    pub api_token: Option<String>,

    /// Known city names for the offline backend
    pub cities: Vec<String>,

    /// Known neighborhood names for the offline backend
    pub neighborhoods: Vec<String>,
}

impl Default for NerConfig {
    fn default() -> Self {
        Self {
            backend: NerBackend::Rules,
            endpoint: "https://api-inference.huggingface.co".to_string(),
            model: "en_pipeline".to_string(),
            api_token: None,
            cities: vec![],
            neighborhoods: vec![],
        }
    }
}

/// How gazetteer matches combine with recognizer entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GazetteerMode {
    /// Add gazetteer matches; they win on overlapping spans
    #[default]
    Merge,
    /// Keep only gazetteer matches
    Replace,
}

impl std::str::FromStr for GazetteerMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "merge" => Ok(Self::Merge),
            "replace" => Ok(Self::Replace),
            _ => Err(ConfigError::InvalidValue {
                key: "GAZETTEER_MODE".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Extractor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Exact phrases tagged as EASTER_EGG_TAG
    pub gazetteer: Vec<String>,

    pub gazetteer_mode: GazetteerMode,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            gazetteer: vec!["மதனா பாலா".to_string()],
            gazetteer_mode: GazetteerMode::Merge,
        }
    }
}

/// Geocoder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    /// Nominatim root URL
    pub base_url: String,

    /// User-Agent header required by the Nominatim usage policy
    pub user_agent: String,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: "disaster-ner-app".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.telegram.base_url, "https://api.telegram.org");
        assert_eq!(config.classifier.model, "Madhana/disaster_msges_classifier_v1");
        assert_eq!(config.geocoder.user_agent, "disaster-ner-app");
        assert_eq!(config.extractor.gazetteer.len(), 1);
        assert_eq!(config.extractor.gazetteer_mode, GazetteerMode::Merge);
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::default()
            .with_overrides(lookup_from(&[
                ("API_PORT", "9090"),
                ("HF_API_TOKEN", "hf_test"),
                ("NER_BACKEND", "rules"),
                ("GAZETTEER_PHRASES", "Jane Doe | John Roe"),
                ("GAZETTEER_MODE", "replace"),
                ("HTTP_TIMEOUT_SECS", "5"),
            ]))
            .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.classifier.api_token.as_deref(), Some("hf_test"));
        assert_eq!(config.ner.api_token.as_deref(), Some("hf_test"));
        assert_eq!(config.ner.backend, NerBackend::Rules);
        assert_eq!(config.extractor.gazetteer, vec!["Jane Doe", "John Roe"]);
        assert_eq!(config.extractor.gazetteer_mode, GazetteerMode::Replace);
        assert_eq!(config.http.timeout(), std::time::Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_override() {
        let err = AppConfig::default()
            .with_overrides(lookup_from(&[("API_PORT", "not-a-port")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "API_PORT"));
    }

    #[test]
    fn test_backend_parse() {
        assert_eq!(
            "keyword".parse::<ClassifierBackend>().unwrap(),
            ClassifierBackend::Keyword
        );
        assert_eq!("Rules".parse::<NerBackend>().unwrap(), NerBackend::Rules);
        assert!("invalid".parse::<ClassifierBackend>().is_err());
        assert!("invalid".parse::<GazetteerMode>().is_err());
    }

    #[test]
    fn test_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [extractor]
            gazetteer = ["Relief Camp"]

            [geocoder]
            user_agent = "test-agent"
            "#,
        )
        .unwrap();

        assert_eq!(config.extractor.gazetteer, vec!["Relief Camp"]);
        assert_eq!(config.extractor.gazetteer_mode, GazetteerMode::Merge);
        assert_eq!(config.geocoder.user_agent, "test-agent");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_example_file_parses() {
        let config: AppConfig =
            toml::from_str(include_str!("../../../dra.example.toml")).unwrap();
        assert_eq!(config.ner.backend, NerBackend::Rules);
        assert_eq!(config.ner.cities, vec!["Chennai", "Madurai"]);
        assert_eq!(config.extractor.gazetteer, vec!["மதனா பாலா"]);
    }
}
