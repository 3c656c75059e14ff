//! Gazetteer phrase matching
//!
//! Flags exact occurrences of known phrases as `EASTER_EGG_TAG` entities,
//! independent of the statistical recognizer.

use dra_core::{EntityType, GazetteerMode};

use crate::ExtractedEntity;

/// Exact, case-sensitive phrase matcher
#[derive(Debug, Clone, Default)]
pub struct PhraseMatcher {
    /// Phrases, longest first so longer matches claim their span first
    phrases: Vec<String>,
}

impl PhraseMatcher {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut phrases: Vec<String> = phrases
            .into_iter()
            .map(|p| p.as_ref().trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        phrases.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        phrases.dedup();
        Self { phrases }
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    /// Non-overlapping phrase matches, sorted by position
    pub fn find(&self, text: &str) -> Vec<ExtractedEntity> {
        let mut matches: Vec<ExtractedEntity> = Vec::new();

        for phrase in &self.phrases {
            for (start, matched) in text.match_indices(phrase.as_str()) {
                let end = start + matched.len();
                if !is_word_boundary(text, start, end) {
                    continue;
                }
                let candidate = ExtractedEntity {
                    text: matched.to_string(),
                    entity_type: EntityType::EasterEggTag.as_str().to_string(),
                    start,
                    end,
                    confidence: 1.0,
                };
                if !matches.iter().any(|m| m.overlaps(&candidate)) {
                    matches.push(candidate);
                }
            }
        }

        matches.sort_by_key(|m| m.start);
        matches
    }

    /// Combine recognized entities with the phrase matches for `text`
    pub fn apply(
        &self,
        mode: GazetteerMode,
        recognized: Vec<ExtractedEntity>,
        text: &str,
    ) -> Vec<ExtractedEntity> {
        let mut entities = self.find(text);

        if mode == GazetteerMode::Merge {
            let kept: Vec<ExtractedEntity> = recognized
                .into_iter()
                .filter(|e| !entities.iter().any(|m| m.overlaps(e)))
                .collect();
            entities.extend(kept);
        }

        entities.sort_by_key(|e| e.start);
        entities
    }
}

/// The match must not start or end inside a word
fn is_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}
