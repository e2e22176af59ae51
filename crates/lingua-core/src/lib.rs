//! # Lingua Core
//!
//! Vocabulary learning engine. Words live in personal dictionaries and are
//! scheduled for review with the SM-2 spaced repetition algorithm.
//!
//! - **SM-2 scheduling**: pure transition from (prior state, quality, now) to next state
//! - **Dictionaries & tags**: organize word/translation pairs per user
//! - **SQLite storage**: versioned migrations, WAL, serialized review recording
//! - **Learning sessions**: flash cards and written answers mapped to quality ratings
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lingua_core::{NewDictionary, NewWord, Quality, Storage};
//! use chrono::Utc;
//!
//! let storage = Storage::new(None)?;
//! let user = storage.create_user("ana@example.com", "Ana")?;
//! let dict = storage.create_dictionary(NewDictionary::new(&user.id, "Basics"))?;
//! let word = storage.add_word(NewWord::new(&dict.id, "house", "дом"))?;
//!
//! // Review the word
//! let state = storage.record_answer(&word.id, Quality::KNEW_IT, Utc::now())?;
//! println!("next review in {} day(s)", state.interval_days);
//! ```
//!
//! ## Feature Flags
//!
//! - `bundled-sqlite` (default): statically linked SQLite
//! - `encryption`: SQLCipher, keyed by `LINGUA_ENCRYPTION_KEY`

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod config;
pub mod session;
pub mod sm2;
pub mod storage;
pub mod vocab;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// SM-2 algorithm
pub use sm2::{
    compute_next_state, format_interval, is_due, MemoryState, PreviewResults, Quality,
    ReviewScheduler, INITIAL_EASE_FACTOR, MIN_EASE_FACTOR,
};

// Vocabulary types
pub use vocab::{
    Dictionary, DictionaryProgress, DictionaryType, DictionaryWithProgress, LearningStats,
    NewDictionary, NewWord, Tag, User, UserSettings, Word, WordWithProgress, WordWithTags,
    DEFAULT_TAG_COLOR,
};

// Storage layer
pub use storage::{ProgressRecord, Result, Storage, StorageError};

// Sessions
pub use session::{
    AnswerCheck, LearningSession, ReviewEvent, SessionSummary, SessionType, DEFAULT_SESSION_SIZE,
};

// Configuration
pub use config::{Config, ConfigError, DEFAULT_LEARNED_LEVEL};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        Config, Dictionary, LearningSession, MemoryState, NewDictionary, NewWord, Quality,
        Result, ReviewScheduler, SessionType, Storage, StorageError, Tag, Word,
    };
}
