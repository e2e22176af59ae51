//! Vocabulary module - Core types and data structures
//!
//! Implements the learner-facing model:
//! - Users and their language settings
//! - Dictionaries of word/translation pairs
//! - Tags for organizing words across dictionaries
//! - Progress aggregates derived from SM-2 memory states

mod word;

pub use word::{NewWord, Word, WordWithProgress, WordWithTags};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// USERS
// ============================================================================

/// A learner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier (UUID v4)
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

/// Per-user preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub user_id: String,
    /// Language being learned (ISO 639-1)
    pub target_language: String,
    /// Learner's native language (ISO 639-1)
    pub native_language: String,
    pub dark_theme: bool,
}

impl UserSettings {
    /// Default settings for a user
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            target_language: "en".to_string(),
            native_language: "ru".to_string(),
            dark_theme: false,
        }
    }
}

// ============================================================================
// DICTIONARIES
// ============================================================================

/// Origin of a dictionary
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum DictionaryType {
    /// Created by the learner
    #[default]
    Custom,
    /// Shipped with the application
    Franco,
    /// Shared by other learners
    Community,
}

impl DictionaryType {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            DictionaryType::Custom => "custom",
            DictionaryType::Franco => "franco",
            DictionaryType::Community => "community",
        }
    }
}

impl std::fmt::Display for DictionaryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DictionaryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "custom" => Ok(DictionaryType::Custom),
            "franco" => Ok(DictionaryType::Franco),
            "community" => Ok(DictionaryType::Community),
            _ => Err(format!("Unknown dictionary type: {}", s)),
        }
    }
}

/// A named collection of words owned by one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dictionary {
    /// Unique identifier (UUID v4)
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub dictionary_type: DictionaryType,
    /// Inactive dictionaries are skipped by due-word selection
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a dictionary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDictionary {
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub dictionary_type: DictionaryType,
}

impl NewDictionary {
    /// A custom dictionary with no description
    pub fn new(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Learning progress of one dictionary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DictionaryProgress {
    pub dictionary_id: String,
    pub total_words: u32,
    /// Words whose repetition level reached the learned threshold
    pub learned_words: u32,
    /// 0.0 - 100.0
    pub progress_percent: f64,
}

impl DictionaryProgress {
    /// Build from counts, computing the percentage
    pub fn from_counts(dictionary_id: impl Into<String>, total_words: u32, learned_words: u32) -> Self {
        let progress_percent = if total_words > 0 {
            f64::from(learned_words) / f64::from(total_words) * 100.0
        } else {
            0.0
        };
        Self {
            dictionary_id: dictionary_id.into(),
            total_words,
            learned_words,
            progress_percent,
        }
    }
}

/// A dictionary together with its progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DictionaryWithProgress {
    pub dictionary: Dictionary,
    pub progress: DictionaryProgress,
}

// ============================================================================
// TAGS
// ============================================================================

/// Default tag color (material green)
pub const DEFAULT_TAG_COLOR: &str = "#4CAF50";

/// A user-defined label attachable to any of the user's words
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    /// Unique identifier (UUID v4)
    pub id: String,
    pub user_id: String,
    pub name: String,
    /// Hex color, `#RRGGBB`
    pub color: String,
}

// ============================================================================
// STATISTICS
// ============================================================================

/// Learning statistics for one user
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningStats {
    /// Number of dictionaries
    pub total_dictionaries: i64,
    /// Number of words across all dictionaries
    pub total_words: i64,
    /// Words reviewed at least once
    pub reviewed_words: i64,
    /// Words at or above the learned threshold
    pub learned_words: i64,
    /// Words due now (never reviewed or past due, active dictionaries only)
    pub due_words: i64,
    /// Sum of correct answers across all words
    pub total_correct: i64,
    /// Sum of incorrect answers across all words
    pub total_incorrect: i64,
    /// Average ease factor of reviewed words
    pub average_ease_factor: Option<f64>,
}

impl LearningStats {
    /// Share of correct answers over all reviews, 0.0 - 100.0
    pub fn accuracy_percent(&self) -> f64 {
        let total = self.total_correct + self.total_incorrect;
        if total > 0 {
            self.total_correct as f64 / total as f64 * 100.0
        } else {
            0.0
        }
    }
}
