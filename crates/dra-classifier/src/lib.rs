//! DRA Classifier - Disaster message classification
//!
//! Labels each fetched post as disaster-related or not and keeps only the
//! disaster-related ones, in their original order.
//!
//! Author: hephaex@gmail.com

use dra_core::{
    ClassifiedPost, ClassifierBackend, ClassifierConfig, DraError, HttpConfig, Result,
    TextClassifier,
};
use tracing::{debug, info, warn};

pub mod inference;
pub mod keyword;

pub use inference::InferenceClassifier;
pub use keyword::KeywordClassifier;

/// Result of classifying a batch of texts
#[derive(Debug, Default)]
pub struct ClassifyOutcome {
    /// Disaster-related posts, in input order
    pub retained: Vec<ClassifiedPost>,
    /// Posts labeled not disaster-related
    pub dropped: usize,
    /// Calls that failed; the corresponding texts were skipped
    pub failures: Vec<DraError>,
}

impl ClassifyOutcome {
    /// Texts of the retained posts
    pub fn texts(&self) -> Vec<String> {
        self.retained.iter().map(|p| p.text.clone()).collect()
    }
}

/// Classify every text once, keeping disaster-related posts.
///
/// A failed call skips that text; the rest of the batch still runs.
pub async fn classify_posts(classifier: &dyn TextClassifier, texts: Vec<String>) -> ClassifyOutcome {
    let mut outcome = ClassifyOutcome::default();

    for text in texts {
        match classifier.classify(&text).await {
            Ok(classification) if classification.label.is_disaster() => {
                debug!(score = classification.score, "post is disaster-related");
                outcome.retained.push(ClassifiedPost {
                    text,
                    classification,
                });
            }
            Ok(classification) => {
                debug!(label = %classification.raw_label, "dropping post");
                outcome.dropped += 1;
            }
            Err(e) => {
                warn!(classifier = classifier.name(), error = %e, "classification failed; skipping post");
                outcome.failures.push(e);
            }
        }
    }

    info!(
        retained = outcome.retained.len(),
        dropped = outcome.dropped,
        failed = outcome.failures.len(),
        "classified posts"
    );
    outcome
}

/// Classify texts and return only the disaster-related ones
pub async fn classify(classifier: &dyn TextClassifier, texts: Vec<String>) -> Vec<String> {
    classify_posts(classifier, texts).await.texts()
}

/// Create a classifier from config
pub fn create_classifier(
    config: &ClassifierConfig,
    http: &HttpConfig,
) -> Result<Box<dyn TextClassifier>> {
    match config.backend {
        ClassifierBackend::Inference => {
            Ok(Box::new(InferenceClassifier::from_config(config, http)?))
        }
        ClassifierBackend::Keyword => Ok(Box::new(KeywordClassifier::new(&config.keywords)?)),
    }
}
