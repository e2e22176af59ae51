//! Test Data Factory
//!
//! Provides utilities for generating realistic test data:
//! - Word/translation pairs with alternatives and examples
//! - Batch generation for stress testing
//! - Review histories that follow the schedule

use chrono::{DateTime, TimeZone, Utc};
use lingua_core::{MemoryState, NewWord, Storage, Word};

/// English/Russian pairs used by fixtures
const VOCABULARY: &[(&str, &str, &[&str])] = &[
    ("house", "дом", &[]),
    ("cat", "кошка", &["кот"]),
    ("water", "вода", &[]),
    ("friend", "друг", &["подруга"]),
    ("book", "книга", &[]),
    ("city", "город", &[]),
    ("road", "дорога", &["путь"]),
    ("window", "окно", &[]),
];

/// Review histories with a known outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewScenario {
    /// Never reviewed
    New,
    /// Three good answers in a row, reviewed on schedule
    Learned,
    /// Repeated failures after a success
    Struggling,
}

impl ReviewScenario {
    /// Qualities applied in order
    pub fn qualities(&self) -> &'static [i32] {
        match self {
            ReviewScenario::New => &[],
            ReviewScenario::Learned => &[5, 4, 4],
            ReviewScenario::Struggling => &[4, 1, 2, 0],
        }
    }
}

/// Factory for creating test data
///
/// # Example
///
/// ```rust,ignore
/// let words = TestDataFactory::add_vocabulary(&db.storage, &db.dictionary.id);
/// let history = TestDataFactory::review_on_schedule(&db.storage, &words[0].id, &[5, 4], start);
/// ```
pub struct TestDataFactory;

impl TestDataFactory {
    /// Fixed starting instant for deterministic schedules
    pub fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    /// Add the fixture vocabulary to a dictionary
    pub fn add_vocabulary(storage: &Storage, dictionary_id: &str) -> Vec<Word> {
        let inputs = VOCABULARY
            .iter()
            .map(|(original, translation, also)| {
                also.iter().fold(
                    NewWord::new(dictionary_id, *original, *translation),
                    |input, alt| input.with_translation(*alt),
                )
            })
            .collect();
        storage
            .add_words(inputs)
            .expect("Failed to add fixture vocabulary")
    }

    /// Add `count` generated words
    pub fn add_batch(storage: &Storage, dictionary_id: &str, count: usize) -> Vec<Word> {
        let inputs = (0..count)
            .map(|i| {
                NewWord::new(dictionary_id, format!("word-{i}"), format!("слово-{i}"))
                    .with_notes(format!("batch item {i}"))
            })
            .collect();
        storage.add_words(inputs).expect("Failed to add batch")
    }

    /// Apply qualities in order, each review exactly when the word is due
    ///
    /// Returns the state after every review.
    pub fn review_on_schedule(
        storage: &Storage,
        word_id: &str,
        qualities: &[i32],
        start: DateTime<Utc>,
    ) -> Vec<MemoryState> {
        let mut now = start;
        let mut history = Vec::with_capacity(qualities.len());
        for &quality in qualities {
            let state = storage
                .record_answer(word_id, quality, now)
                .expect("Failed to record answer");
            now = state.next_review_due_at;
            history.push(state);
        }
        history
    }

    /// Put a word through a scenario, returning its final state
    pub fn apply_scenario(
        storage: &Storage,
        word_id: &str,
        scenario: ReviewScenario,
        start: DateTime<Utc>,
    ) -> Option<MemoryState> {
        Self::review_on_schedule(storage, word_id, scenario.qualities(), start).pop()
    }
}
