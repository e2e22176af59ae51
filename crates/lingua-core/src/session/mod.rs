//! Learning Sessions
//!
//! A session walks a batch of due words one at a time. Each answer turns
//! into a [`ReviewEvent`] that the caller hands to
//! [`Storage::record_answer`](crate::Storage::record_answer).
//!
//! Three modes are supported:
//! - Flash cards: show the original, reveal translations, learner judges
//! - Write word: show the main translation, learner types the original
//! - Write translation: show the original, learner types any translation

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::sm2::Quality;
use crate::vocab::WordWithProgress;

/// Default number of words per session
pub const DEFAULT_SESSION_SIZE: u32 = 20;

// ============================================================================
// TYPES
// ============================================================================

/// How words are presented and answered
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SessionType {
    /// Self-graded cards
    #[default]
    FlashCards,
    /// Type the original given its translation
    WriteWord,
    /// Type a translation given the original
    WriteTranslation,
}

impl SessionType {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::FlashCards => "flash",
            SessionType::WriteWord => "write-word",
            SessionType::WriteTranslation => "write-translation",
        }
    }

    /// Whether the learner types the answer
    pub fn is_written(&self) -> bool {
        !matches!(self, SessionType::FlashCards)
    }
}

impl std::fmt::Display for SessionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SessionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "flash" | "flashcards" | "flash-cards" => Ok(SessionType::FlashCards),
            "write-word" => Ok(SessionType::WriteWord),
            "write-translation" => Ok(SessionType::WriteTranslation),
            _ => Err(format!("Unknown session type: {}", s)),
        }
    }
}

/// Result of checking typed input against the current word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerCheck {
    /// Nothing typed (or a flash-card session)
    Empty,
    /// A prefix of an accepted answer
    Partial,
    Correct,
    Incorrect,
}

/// One answered word, ready to be recorded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEvent {
    pub word_id: String,
    pub quality: Quality,
}

/// Outcome of a session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// Words in the session
    pub total: usize,
    pub correct: usize,
    pub incorrect: usize,
    /// Correct share of answered words, 0.0 - 100.0
    pub accuracy_percent: f64,
}

// ============================================================================
// SESSION
// ============================================================================

/// A batch of words being learned
#[derive(Debug, Clone)]
pub struct LearningSession {
    session_type: SessionType,
    words: Vec<WordWithProgress>,
    index: usize,
    revealed: bool,
    correct: usize,
    incorrect: usize,
}

impl LearningSession {
    /// Start a session over `words` in the given order
    pub fn new(words: Vec<WordWithProgress>, session_type: SessionType) -> Self {
        Self {
            session_type,
            words,
            index: 0,
            revealed: false,
            correct: 0,
            incorrect: 0,
        }
    }

    /// Shuffle the words that have not been answered yet
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let start = self.index.min(self.words.len());
        self.words[start..].shuffle(rng);
    }

    pub fn session_type(&self) -> SessionType {
        self.session_type
    }

    /// Number of words in the session
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Zero-based position of the current word
    pub fn position(&self) -> usize {
        self.index
    }

    /// Words not answered yet, including the current one
    pub fn remaining(&self) -> usize {
        self.words.len().saturating_sub(self.index)
    }

    /// The word being asked, None once the session is complete
    pub fn current(&self) -> Option<&WordWithProgress> {
        self.words.get(self.index)
    }

    /// Text shown to the learner for the current word
    pub fn prompt(&self) -> Option<&str> {
        let word = &self.current()?.word;
        Some(match self.session_type {
            SessionType::WriteWord => word.main_translation.as_str(),
            SessionType::FlashCards | SessionType::WriteTranslation => word.original.as_str(),
        })
    }

    /// The answer side of the current word
    pub fn expected_answer(&self) -> Option<String> {
        let word = &self.current()?.word;
        Some(match self.session_type {
            SessionType::WriteWord => word.original.clone(),
            SessionType::FlashCards | SessionType::WriteTranslation => {
                word.all_translations().join(", ")
            }
        })
    }

    /// Show the answer side of the current card
    pub fn reveal(&mut self) {
        if self.current().is_some() {
            self.revealed = true;
        }
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    /// Check typed input without advancing
    pub fn check_input(&self, input: &str) -> AnswerCheck {
        let Some(current) = self.current() else {
            return AnswerCheck::Empty;
        };
        if input.trim().is_empty() || !self.session_type.is_written() {
            return AnswerCheck::Empty;
        }

        let word = &current.word;
        let (correct, partial) = match self.session_type {
            SessionType::WriteWord => (word.matches_original(input), word.is_partial_original(input)),
            _ => (word.is_correct_answer(input), word.is_partial_match(input)),
        };

        if correct {
            AnswerCheck::Correct
        } else if partial {
            AnswerCheck::Partial
        } else {
            AnswerCheck::Incorrect
        }
    }

    /// Record whether the learner knew the current word and advance
    pub fn answer(&mut self, knew: bool) -> Option<ReviewEvent> {
        let word_id = self.current()?.word.id.clone();
        let quality = if knew {
            self.correct += 1;
            Quality::KNEW_IT
        } else {
            self.incorrect += 1;
            Quality::FORGOT
        };
        self.advance();
        Some(ReviewEvent { word_id, quality })
    }

    /// Check typed input, then answer with the outcome
    pub fn submit(&mut self, input: &str) -> Option<(AnswerCheck, ReviewEvent)> {
        let check = self.check_input(input);
        let event = self.answer(check == AnswerCheck::Correct)?;
        Some((check, event))
    }

    /// Skip the current word; it counts as forgotten
    pub fn skip(&mut self) -> Option<ReviewEvent> {
        self.answer(false)
    }

    pub fn is_complete(&self) -> bool {
        self.index >= self.words.len()
    }

    /// Totals so far
    pub fn summary(&self) -> SessionSummary {
        let answered = self.correct + self.incorrect;
        let accuracy_percent = if answered > 0 {
            self.correct as f64 / answered as f64 * 100.0
        } else {
            0.0
        };
        SessionSummary {
            total: self.words.len(),
            correct: self.correct,
            incorrect: self.incorrect,
            accuracy_percent,
        }
    }

    fn advance(&mut self) {
        self.index += 1;
        self.revealed = false;
    }
}
