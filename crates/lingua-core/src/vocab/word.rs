//! Word - The fundamental unit of vocabulary
//!
//! Each word carries:
//! - The original term and its main translation
//! - Additional accepted translations
//! - Example sentences with optional translations
//! - Free-form notes

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Tag;
use crate::sm2::MemoryState;

// ============================================================================
// WORD
// ============================================================================

/// A word/translation pair stored in a dictionary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Owning dictionary
    pub dictionary_id: String,
    /// The term being learned
    pub original: String,
    /// Primary translation shown on flash cards
    pub main_translation: String,
    /// Other translations accepted as correct answers
    #[serde(default)]
    pub additional_translations: Vec<String>,
    /// Example sentence -> optional translation of that sentence
    #[serde(default)]
    pub examples: BTreeMap<String, Option<String>>,
    /// Free-form notes
    #[serde(default)]
    pub notes: String,
    /// When the word was added
    pub created_at: DateTime<Utc>,
}

/// Normalize learner input and stored answers the same way
fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

impl Word {
    /// Main translation followed by the additional ones
    pub fn all_translations(&self) -> Vec<&str> {
        std::iter::once(self.main_translation.as_str())
            .chain(self.additional_translations.iter().map(String::as_str))
            .collect()
    }

    /// Whether `input` matches any accepted translation
    ///
    /// Comparison ignores surrounding whitespace and letter case.
    pub fn is_correct_answer(&self, input: &str) -> bool {
        let input = normalize(input);
        self.all_translations()
            .into_iter()
            .any(|t| normalize(t) == input)
    }

    /// Whether `input` is a non-empty prefix of any accepted translation
    pub fn is_partial_match(&self, input: &str) -> bool {
        let input = normalize(input);
        !input.is_empty()
            && self
                .all_translations()
                .into_iter()
                .any(|t| normalize(t).starts_with(&input))
    }

    /// Whether `input` matches the original term
    pub fn matches_original(&self, input: &str) -> bool {
        normalize(input) == normalize(&self.original)
    }

    /// Whether `input` is a non-empty prefix of the original term
    pub fn is_partial_original(&self, input: &str) -> bool {
        let input = normalize(input);
        !input.is_empty() && normalize(&self.original).starts_with(&input)
    }
}

// ============================================================================
// INPUT TYPES
// ============================================================================

/// Input for adding a word
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWord {
    /// Dictionary to add the word to
    pub dictionary_id: String,
    /// The term being learned
    pub original: String,
    /// Primary translation
    pub main_translation: String,
    /// Other accepted translations
    #[serde(default)]
    pub additional_translations: Vec<String>,
    /// Example sentences
    #[serde(default)]
    pub examples: BTreeMap<String, Option<String>>,
    /// Free-form notes
    #[serde(default)]
    pub notes: String,
}

impl NewWord {
    /// Minimal input: dictionary, original and main translation
    pub fn new(
        dictionary_id: impl Into<String>,
        original: impl Into<String>,
        main_translation: impl Into<String>,
    ) -> Self {
        Self {
            dictionary_id: dictionary_id.into(),
            original: original.into(),
            main_translation: main_translation.into(),
            ..Default::default()
        }
    }

    /// Add an accepted alternative translation
    pub fn with_translation(mut self, translation: impl Into<String>) -> Self {
        self.additional_translations.push(translation.into());
        self
    }

    /// Add an example sentence
    pub fn with_example(mut self, sentence: impl Into<String>, translation: Option<String>) -> Self {
        self.examples.insert(sentence.into(), translation);
        self
    }

    /// Set notes
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}

// ============================================================================
// COMPOSITES
// ============================================================================

/// A word together with its tags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordWithTags {
    pub word: Word,
    pub tags: Vec<Tag>,
}

/// A word with its tags and memory state (None = never reviewed)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordWithProgress {
    pub word: Word,
    pub tags: Vec<Tag>,
    pub progress: Option<MemoryState>,
}
