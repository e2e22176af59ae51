//! SQLite Storage Implementation
//!
//! Core storage layer for users, dictionaries, words, tags and SM-2 progress.

use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension, ToSql, TransactionBehavior};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::sm2::{MemoryState, Quality, ReviewScheduler, MIN_EASE_FACTOR};
use crate::vocab::{
    Dictionary, DictionaryProgress, DictionaryWithProgress, LearningStats, NewDictionary,
    NewWord, Tag, User, UserSettings, Word, WordWithProgress, WordWithTags, DEFAULT_TAG_COLOR,
};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Storage error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Entity not found
    #[error("Not found: {0}")]
    NotFound(String),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Invalid timestamp
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
    /// Initialization error
    #[error("Initialization error: {0}")]
    Init(String),
    /// JSON column could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Input rejected before reaching the database
    #[error("Constraint violated: {0}")]
    Constraint(String),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

/// Stored SM-2 state of one word
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    /// Row identity, stable across reviews
    pub id: String,
    pub word_id: String,
    pub state: MemoryState,
}

// ============================================================================
// HELPERS
// ============================================================================

/// Last instant with a four-digit year
fn latest_storable() -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(9999, 12, 31)?
        .and_hms_micro_opt(23, 59, 59, 999_999)
        .map(|dt| dt.and_utc())
}

/// Timestamps of a state as they read back from the database
fn storable_state(mut state: MemoryState) -> MemoryState {
    let max = latest_storable();
    let fit = |at: DateTime<Utc>| {
        let at = max.map_or(at, |max| at.min(max));
        at.trunc_subsecs(6)
    };
    state.last_reviewed_at = fit(state.last_reviewed_at);
    state.next_review_due_at = fit(state.next_review_due_at);
    state
}

/// Reject memory states the scheduler can never produce
fn validate_state(state: &MemoryState) -> Result<()> {
    if !state.ease_factor.is_finite() || state.ease_factor < MIN_EASE_FACTOR {
        return Err(StorageError::Constraint(format!(
            "ease factor {} is below {}",
            state.ease_factor, MIN_EASE_FACTOR
        )));
    }
    if state.interval_days < 1 {
        return Err(StorageError::Constraint(
            "interval must be at least one day".to_string(),
        ));
    }
    if state.next_review_due_at < state.last_reviewed_at {
        return Err(StorageError::Constraint(
            "next review is before the last review".to_string(),
        ));
    }
    Ok(())
}

/// Fixed-width RFC 3339 so that text order equals chronological order
///
/// Instants past year 9999 are stored as the last storable instant.
fn format_timestamp(value: DateTime<Utc>) -> String {
    let value = latest_storable().map_or(value, |max| value.min(max));
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse RFC3339 timestamp
fn parse_timestamp(value: &str, field_name: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(StorageError::InvalidTimestamp(format!(
                    "{} '{}': {}",
                    field_name, value, e
                ))),
            )
        })
}

/// Decode a JSON text column, falling back to the empty value
fn parse_json_column<T>(raw: &str, column: &str, row_id: &str) -> T
where
    T: serde::de::DeserializeOwned + Default,
{
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!("Malformed {} on {}: {}", column, row_id, e);
        T::default()
    })
}

fn require_text(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StorageError::Constraint(format!("{} must not be empty", field)));
    }
    Ok(trimmed.to_string())
}

fn is_valid_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Case-insensitive substring match; SQLite's LOWER() only folds ASCII
fn contains_folded(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

// ============================================================================
// STORAGE
// ============================================================================

/// Main storage struct
///
/// Uses separate reader/writer connections for interior mutability.
/// All methods take `&self`, making Storage `Send + Sync` so callers can
/// share an `Arc<Storage>` across threads.
pub struct Storage {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    scheduler: ReviewScheduler,
}

impl Storage {
    /// Apply PRAGMAs and optional encryption to a connection
    fn configure_connection(conn: &Connection) -> Result<()> {
        // Apply encryption key if SQLCipher is enabled and key is provided
        #[cfg(feature = "encryption")]
        {
            if let Ok(key) = std::env::var("LINGUA_ENCRYPTION_KEY") {
                if !key.is_empty() {
                    conn.pragma_update(None, "key", &key)?;
                }
            }
        }

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;

        Ok(())
    }

    /// Platform default database location
    pub fn default_db_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "linguafranca", "lingua").ok_or_else(|| {
            StorageError::Init("Could not determine project directories".to_string())
        })?;
        Ok(proj_dirs.data_dir().join("lingua.db"))
    }

    /// Create new storage instance with the classic SM-2 scheduler
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        Self::with_scheduler(db_path, ReviewScheduler::default())
    }

    /// Create new storage instance with a custom scheduler
    pub fn with_scheduler(db_path: Option<PathBuf>, scheduler: ReviewScheduler) -> Result<Self> {
        let path = match db_path {
            Some(p) => p,
            None => Self::default_db_path()?,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
                // Restrict directory permissions to owner-only on Unix
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    let perms = std::fs::Permissions::from_mode(0o700);
                    let _ = std::fs::set_permissions(parent, perms);
                }
            }
        }

        let writer_conn = Connection::open(&path)?;
        Self::configure_connection(&writer_conn)?;

        // Apply migrations on writer only
        let applied = super::migrations::apply_migrations(&writer_conn)?;
        if applied > 0 {
            tracing::info!("Applied {} migration(s) to {}", applied, path.display());
        }

        let reader_conn = Connection::open(&path)?;
        Self::configure_connection(&reader_conn)?;

        tracing::debug!("Storage opened at {}", path.display());

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
            scheduler,
        })
    }

    /// Scheduler used by [`Storage::record_answer`]
    pub fn scheduler(&self) -> &ReviewScheduler {
        &self.scheduler
    }

    fn writer(&self) -> Result<MutexGuard<'_, Connection>> {
        self.writer
            .lock()
            .map_err(|_| StorageError::Init("Writer lock poisoned".into()))
    }

    fn reader(&self) -> Result<MutexGuard<'_, Connection>> {
        self.reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))
    }

    // ========================================================================
    // ROW MAPPING
    // ========================================================================

    fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
        let created_at: String = row.get("created_at")?;
        Ok(User {
            id: row.get("id")?,
            email: row.get("email")?,
            display_name: row.get("display_name")?,
            created_at: parse_timestamp(&created_at, "created_at")?,
        })
    }

    fn row_to_settings(row: &rusqlite::Row) -> rusqlite::Result<UserSettings> {
        Ok(UserSettings {
            user_id: row.get("user_id")?,
            target_language: row.get("target_language")?,
            native_language: row.get("native_language")?,
            dark_theme: row.get("dark_theme")?,
        })
    }

    fn row_to_dictionary(row: &rusqlite::Row) -> rusqlite::Result<Dictionary> {
        let id: String = row.get("id")?;
        let type_name: String = row.get("dictionary_type")?;
        let dictionary_type = type_name.parse().unwrap_or_else(|e| {
            tracing::warn!("{} on dictionary {}, treating as custom", e, id);
            Default::default()
        });
        let created_at: String = row.get("created_at")?;
        let updated_at: String = row.get("updated_at")?;

        Ok(Dictionary {
            user_id: row.get("user_id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            dictionary_type,
            is_active: row.get("is_active")?,
            created_at: parse_timestamp(&created_at, "created_at")?,
            updated_at: parse_timestamp(&updated_at, "updated_at")?,
            id,
        })
    }

    fn row_to_word(row: &rusqlite::Row) -> rusqlite::Result<Word> {
        let id: String = row.get("id")?;
        let translations: String = row.get("additional_translations")?;
        let examples: String = row.get("examples")?;
        let created_at: String = row.get("created_at")?;

        Ok(Word {
            dictionary_id: row.get("dictionary_id")?,
            original: row.get("original")?,
            main_translation: row.get("main_translation")?,
            additional_translations: parse_json_column::<Vec<String>>(
                &translations,
                "additional_translations",
                &id,
            ),
            examples: parse_json_column::<BTreeMap<String, Option<String>>>(
                &examples, "examples", &id,
            ),
            notes: row.get("notes")?,
            created_at: parse_timestamp(&created_at, "created_at")?,
            id,
        })
    }

    fn row_to_tag(row: &rusqlite::Row) -> rusqlite::Result<Tag> {
        Ok(Tag {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            name: row.get("name")?,
            color: row.get("color")?,
        })
    }

    fn row_to_progress(row: &rusqlite::Row) -> rusqlite::Result<ProgressRecord> {
        let last_reviewed: String = row.get("last_reviewed")?;
        let next_review: String = row.get("next_review")?;

        Ok(ProgressRecord {
            id: row.get("id")?,
            word_id: row.get("word_id")?,
            state: MemoryState {
                repetition_level: row.get("level")?,
                ease_factor: row.get("ease_factor")?,
                correct_count: row.get("correct_count")?,
                incorrect_count: row.get("incorrect_count")?,
                interval_days: row.get("interval_days")?,
                last_reviewed_at: parse_timestamp(&last_reviewed, "last_reviewed")?,
                next_review_due_at: parse_timestamp(&next_review, "next_review")?,
            },
        })
    }

    // ========================================================================
    // USERS
    // ========================================================================

    /// Create a user together with default settings
    pub fn create_user(&self, email: &str, display_name: &str) -> Result<User> {
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: require_text(email, "email")?,
            display_name: require_text(display_name, "display name")?,
            created_at: Utc::now(),
        };
        let settings = UserSettings::new(&user.id);

        let mut writer = self.writer()?;
        let tx = writer.transaction()?;
        tx.execute(
            "INSERT INTO users (id, email, display_name, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![user.id, user.email, user.display_name, format_timestamp(user.created_at)],
        )?;
        tx.execute(
            "INSERT INTO user_settings (user_id, target_language, native_language, dark_theme)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                settings.user_id,
                settings.target_language,
                settings.native_language,
                settings.dark_theme
            ],
        )?;
        tx.commit()?;

        tracing::info!("Created user {}", user.id);
        Ok(user)
    }

    /// Get a user by ID
    pub fn get_user(&self, id: &str) -> Result<Option<User>> {
        let reader = self.reader()?;
        let user = reader
            .query_row("SELECT * FROM users WHERE id = ?1", params![id], |row| {
                Self::row_to_user(row)
            })
            .optional()?;
        Ok(user)
    }

    /// The earliest created user, if any
    pub fn get_current_user(&self) -> Result<Option<User>> {
        let reader = self.reader()?;
        let user = reader
            .query_row(
                "SELECT * FROM users ORDER BY created_at ASC, rowid ASC LIMIT 1",
                [],
                |row| Self::row_to_user(row),
            )
            .optional()?;
        Ok(user)
    }

    /// Update email and display name
    pub fn update_user(&self, user: &User) -> Result<()> {
        let email = require_text(&user.email, "email")?;
        let display_name = require_text(&user.display_name, "display name")?;
        let writer = self.writer()?;
        let rows = writer.execute(
            "UPDATE users SET email = ?1, display_name = ?2 WHERE id = ?3",
            params![email, display_name, user.id],
        )?;
        if rows == 0 {
            return Err(StorageError::NotFound(format!("user {}", user.id)));
        }
        Ok(())
    }

    /// Delete a user and everything they own
    pub fn delete_user(&self, id: &str) -> Result<bool> {
        let writer = self.writer()?;
        let rows = writer.execute("DELETE FROM users WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    /// Get settings for a user
    pub fn get_user_settings(&self, user_id: &str) -> Result<Option<UserSettings>> {
        let reader = self.reader()?;
        let settings = reader
            .query_row(
                "SELECT * FROM user_settings WHERE user_id = ?1",
                params![user_id],
                |row| Self::row_to_settings(row),
            )
            .optional()?;
        Ok(settings)
    }

    /// Insert or replace settings for a user
    pub fn save_user_settings(&self, settings: &UserSettings) -> Result<()> {
        let writer = self.writer()?;
        writer.execute(
            "INSERT INTO user_settings (user_id, target_language, native_language, dark_theme)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id) DO UPDATE SET
                target_language = excluded.target_language,
                native_language = excluded.native_language,
                dark_theme = excluded.dark_theme",
            params![
                settings.user_id,
                settings.target_language,
                settings.native_language,
                settings.dark_theme
            ],
        )?;
        Ok(())
    }

    // ========================================================================
    // DICTIONARIES
    // ========================================================================

    /// Create a dictionary
    pub fn create_dictionary(&self, input: NewDictionary) -> Result<Dictionary> {
        let now = Utc::now();
        let dictionary = Dictionary {
            id: Uuid::new_v4().to_string(),
            user_id: input.user_id,
            name: require_text(&input.name, "dictionary name")?,
            description: input.description.trim().to_string(),
            dictionary_type: input.dictionary_type,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let writer = self.writer()?;
        writer.execute(
            "INSERT INTO dictionaries (
                id, user_id, name, description, dictionary_type, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                dictionary.id,
                dictionary.user_id,
                dictionary.name,
                dictionary.description,
                dictionary.dictionary_type.as_str(),
                dictionary.is_active,
                format_timestamp(dictionary.created_at),
                format_timestamp(dictionary.updated_at),
            ],
        )?;

        Ok(dictionary)
    }

    /// Get a dictionary by ID
    pub fn get_dictionary(&self, id: &str) -> Result<Option<Dictionary>> {
        let reader = self.reader()?;
        let dictionary = reader
            .query_row(
                "SELECT * FROM dictionaries WHERE id = ?1",
                params![id],
                |row| Self::row_to_dictionary(row),
            )
            .optional()?;
        Ok(dictionary)
    }

    /// Find one of a user's dictionaries by name (case-insensitive)
    pub fn find_dictionary_by_name(&self, user_id: &str, name: &str) -> Result<Option<Dictionary>> {
        let needle = name.trim().to_lowercase();
        Ok(self
            .list_dictionaries(user_id)?
            .into_iter()
            .find(|d| d.name.to_lowercase() == needle))
    }

    /// List a user's dictionaries, most recently updated first
    pub fn list_dictionaries(&self, user_id: &str) -> Result<Vec<Dictionary>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare(
            "SELECT * FROM dictionaries WHERE user_id = ?1
             ORDER BY updated_at DESC, rowid DESC",
        )?;
        let dictionaries = stmt
            .query_map(params![user_id], |row| Self::row_to_dictionary(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(dictionaries)
    }

    /// Update name, description, type and active flag; bumps `updated_at`
    pub fn update_dictionary(&self, dictionary: &Dictionary) -> Result<Dictionary> {
        let name = require_text(&dictionary.name, "dictionary name")?;
        let now = Utc::now();
        {
            let writer = self.writer()?;
            let rows = writer.execute(
                "UPDATE dictionaries SET
                    name = ?1,
                    description = ?2,
                    dictionary_type = ?3,
                    is_active = ?4,
                    updated_at = ?5
                WHERE id = ?6",
                params![
                    name,
                    dictionary.description.trim(),
                    dictionary.dictionary_type.as_str(),
                    dictionary.is_active,
                    format_timestamp(now),
                    dictionary.id,
                ],
            )?;
            if rows == 0 {
                return Err(StorageError::NotFound(format!("dictionary {}", dictionary.id)));
            }
        }

        self.get_dictionary(&dictionary.id)?
            .ok_or_else(|| StorageError::NotFound(format!("dictionary {}", dictionary.id)))
    }

    /// Include or exclude a dictionary from due-word selection
    pub fn set_dictionary_active(&self, id: &str, active: bool) -> Result<bool> {
        let writer = self.writer()?;
        let rows = writer.execute(
            "UPDATE dictionaries SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
            params![active, format_timestamp(Utc::now()), id],
        )?;
        Ok(rows > 0)
    }

    /// Delete a dictionary and its words
    pub fn delete_dictionary(&self, id: &str) -> Result<bool> {
        let writer = self.writer()?;
        let rows = writer.execute("DELETE FROM dictionaries WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    /// Word count and learned share of one dictionary
    pub fn get_dictionary_progress(
        &self,
        dictionary_id: &str,
        learned_level: u32,
    ) -> Result<DictionaryProgress> {
        if self.get_dictionary(dictionary_id)?.is_none() {
            return Err(StorageError::NotFound(format!("dictionary {}", dictionary_id)));
        }
        let total = self.word_count(dictionary_id)?;
        let learned = self.learned_word_count(dictionary_id, learned_level)?;
        Ok(DictionaryProgress::from_counts(dictionary_id, total, learned))
    }

    /// All of a user's dictionaries with progress
    pub fn list_dictionaries_with_progress(
        &self,
        user_id: &str,
        learned_level: u32,
    ) -> Result<Vec<DictionaryWithProgress>> {
        self.list_dictionaries(user_id)?
            .into_iter()
            .map(|dictionary| {
                let total = self.word_count(&dictionary.id)?;
                let learned = self.learned_word_count(&dictionary.id, learned_level)?;
                let progress = DictionaryProgress::from_counts(&dictionary.id, total, learned);
                Ok(DictionaryWithProgress { dictionary, progress })
            })
            .collect()
    }

    // ========================================================================
    // WORDS
    // ========================================================================

    fn build_word(input: NewWord, created_at: DateTime<Utc>) -> Result<Word> {
        let additional_translations = input
            .additional_translations
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Word {
            id: Uuid::new_v4().to_string(),
            original: require_text(&input.original, "original")?,
            main_translation: require_text(&input.main_translation, "main translation")?,
            dictionary_id: input.dictionary_id,
            additional_translations,
            examples: input.examples,
            notes: input.notes.trim().to_string(),
            created_at,
        })
    }

    fn insert_word(conn: &Connection, word: &Word) -> Result<()> {
        conn.execute(
            "INSERT INTO words (
                id, dictionary_id, original, main_translation,
                additional_translations, examples, notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                word.id,
                word.dictionary_id,
                word.original,
                word.main_translation,
                serde_json::to_string(&word.additional_translations)?,
                serde_json::to_string(&word.examples)?,
                word.notes,
                format_timestamp(word.created_at),
            ],
        )?;
        Ok(())
    }

    /// Add a word to a dictionary
    pub fn add_word(&self, input: NewWord) -> Result<Word> {
        let word = Self::build_word(input, Utc::now())?;
        let writer = self.writer()?;
        Self::insert_word(&writer, &word)?;
        Ok(word)
    }

    /// Add several words in one transaction; nothing is stored if any fails
    pub fn add_words(&self, inputs: Vec<NewWord>) -> Result<Vec<Word>> {
        let now = Utc::now();
        let words = inputs
            .into_iter()
            .map(|input| Self::build_word(input, now))
            .collect::<Result<Vec<_>>>()?;

        let mut writer = self.writer()?;
        let tx = writer.transaction()?;
        for word in &words {
            Self::insert_word(&tx, word)?;
        }
        tx.commit()?;

        Ok(words)
    }

    /// Get a word by ID
    pub fn get_word(&self, id: &str) -> Result<Option<Word>> {
        let reader = self.reader()?;
        let word = reader
            .query_row("SELECT * FROM words WHERE id = ?1", params![id], |row| {
                Self::row_to_word(row)
            })
            .optional()?;
        Ok(word)
    }

    /// Words of a dictionary, newest first
    pub fn list_words(&self, dictionary_id: &str) -> Result<Vec<Word>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare(
            "SELECT * FROM words WHERE dictionary_id = ?1
             ORDER BY created_at DESC, rowid DESC",
        )?;
        let words = stmt
            .query_map(params![dictionary_id], |row| Self::row_to_word(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(words)
    }

    /// Every word in every dictionary of a user, newest first
    pub fn list_user_words(&self, user_id: &str) -> Result<Vec<Word>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare(
            "SELECT w.* FROM words w
             JOIN dictionaries d ON w.dictionary_id = d.id
             WHERE d.user_id = ?1
             ORDER BY w.created_at DESC, w.rowid DESC",
        )?;
        let words = stmt
            .query_map(params![user_id], |row| Self::row_to_word(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(words)
    }

    /// Update a word's content; `id` and `created_at` are kept
    pub fn update_word(&self, word: &Word) -> Result<()> {
        let original = require_text(&word.original, "original")?;
        let main_translation = require_text(&word.main_translation, "main translation")?;
        let writer = self.writer()?;
        let rows = writer.execute(
            "UPDATE words SET
                dictionary_id = ?1,
                original = ?2,
                main_translation = ?3,
                additional_translations = ?4,
                examples = ?5,
                notes = ?6
            WHERE id = ?7",
            params![
                word.dictionary_id,
                original,
                main_translation,
                serde_json::to_string(&word.additional_translations)?,
                serde_json::to_string(&word.examples)?,
                word.notes,
                word.id,
            ],
        )?;
        if rows == 0 {
            return Err(StorageError::NotFound(format!("word {}", word.id)));
        }
        Ok(())
    }

    /// Delete a word; its tags links and progress go with it
    pub fn delete_word(&self, id: &str) -> Result<bool> {
        let writer = self.writer()?;
        let rows = writer.execute("DELETE FROM words WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    /// Number of words in a dictionary
    pub fn word_count(&self, dictionary_id: &str) -> Result<u32> {
        let reader = self.reader()?;
        let count = reader.query_row(
            "SELECT COUNT(*) FROM words WHERE dictionary_id = ?1",
            params![dictionary_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn word_matches(word: &Word, needle: &str) -> bool {
        contains_folded(&word.original, needle)
            || contains_folded(&word.main_translation, needle)
            || word
                .additional_translations
                .iter()
                .any(|t| contains_folded(t, needle))
            || contains_folded(&word.notes, needle)
    }

    /// Search one dictionary by original, translations or notes
    pub fn search_words_in_dictionary(&self, dictionary_id: &str, query: &str) -> Result<Vec<Word>> {
        let needle = query.trim().to_lowercase();
        let words = self.list_words(dictionary_id)?;
        if needle.is_empty() {
            return Ok(words);
        }
        Ok(words
            .into_iter()
            .filter(|w| Self::word_matches(w, &needle))
            .collect())
    }

    /// Search all of a user's dictionaries
    pub fn search_words(&self, user_id: &str, query: &str) -> Result<Vec<Word>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .list_user_words(user_id)?
            .into_iter()
            .filter(|w| Self::word_matches(w, &needle))
            .collect())
    }

    /// Words carrying a tag
    pub fn words_by_tag(&self, tag_id: &str) -> Result<Vec<Word>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare(
            "SELECT w.* FROM words w
             JOIN word_tags wt ON wt.word_id = w.id
             WHERE wt.tag_id = ?1
             ORDER BY w.created_at DESC, w.rowid DESC",
        )?;
        let words = stmt
            .query_map(params![tag_id], |row| Self::row_to_word(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(words)
    }

    /// A user's words carrying any of the given tags
    pub fn words_by_tags(&self, user_id: &str, tag_ids: &[String]) -> Result<Vec<Word>> {
        if tag_ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = (0..tag_ids.len())
            .map(|i| format!("?{}", i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT DISTINCT w.* FROM words w
             JOIN dictionaries d ON w.dictionary_id = d.id
             JOIN word_tags wt ON wt.word_id = w.id
             WHERE d.user_id = ?1 AND wt.tag_id IN ({})
             ORDER BY w.created_at DESC, w.rowid DESC",
            placeholders
        );

        let mut values: Vec<&dyn ToSql> = Vec::with_capacity(tag_ids.len() + 1);
        values.push(&user_id);
        values.extend(tag_ids.iter().map(|id| id as &dyn ToSql));

        let reader = self.reader()?;
        let mut stmt = reader.prepare(&sql)?;
        let words = stmt
            .query_map(values.as_slice(), |row| Self::row_to_word(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(words)
    }

    /// A word with its tags
    pub fn get_word_with_tags(&self, id: &str) -> Result<Option<WordWithTags>> {
        let Some(word) = self.get_word(id)? else {
            return Ok(None);
        };
        let tags = self.tags_for_word(id)?;
        Ok(Some(WordWithTags { word, tags }))
    }

    /// A word with its tags and memory state
    pub fn get_word_with_progress(&self, id: &str) -> Result<Option<WordWithProgress>> {
        let Some(word) = self.get_word(id)? else {
            return Ok(None);
        };
        self.attach_progress(word).map(Some)
    }

    fn attach_progress(&self, word: Word) -> Result<WordWithProgress> {
        let tags = self.tags_for_word(&word.id)?;
        let progress = self.get_progress(&word.id)?;
        Ok(WordWithProgress { word, tags, progress })
    }

    // ========================================================================
    // TAGS
    // ========================================================================

    /// Create a tag; `color` defaults to green
    pub fn create_tag(&self, user_id: &str, name: &str, color: Option<&str>) -> Result<Tag> {
        let color = color.unwrap_or(DEFAULT_TAG_COLOR);
        if !is_valid_color(color) {
            return Err(StorageError::Constraint(format!(
                "tag color must look like #RRGGBB, got '{}'",
                color
            )));
        }
        let tag = Tag {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: require_text(name, "tag name")?,
            color: color.to_uppercase(),
        };

        let writer = self.writer()?;
        writer.execute(
            "INSERT INTO tags (id, user_id, name, color) VALUES (?1, ?2, ?3, ?4)",
            params![tag.id, tag.user_id, tag.name, tag.color],
        )?;
        Ok(tag)
    }

    /// Get a tag by ID
    pub fn get_tag(&self, id: &str) -> Result<Option<Tag>> {
        let reader = self.reader()?;
        let tag = reader
            .query_row("SELECT * FROM tags WHERE id = ?1", params![id], |row| {
                Self::row_to_tag(row)
            })
            .optional()?;
        Ok(tag)
    }

    /// A user's tags ordered by name
    pub fn list_tags(&self, user_id: &str) -> Result<Vec<Tag>> {
        let reader = self.reader()?;
        let mut stmt =
            reader.prepare("SELECT * FROM tags WHERE user_id = ?1 ORDER BY name COLLATE NOCASE")?;
        let tags = stmt
            .query_map(params![user_id], |row| Self::row_to_tag(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tags)
    }

    /// A user's tags whose name contains `query`
    pub fn search_tags(&self, user_id: &str, query: &str) -> Result<Vec<Tag>> {
        let needle = query.trim().to_lowercase();
        Ok(self
            .list_tags(user_id)?
            .into_iter()
            .filter(|t| contains_folded(&t.name, &needle))
            .collect())
    }

    /// Find one of a user's tags by exact name (case-insensitive)
    pub fn find_tag_by_name(&self, user_id: &str, name: &str) -> Result<Option<Tag>> {
        let needle = name.trim().to_lowercase();
        Ok(self
            .list_tags(user_id)?
            .into_iter()
            .find(|t| t.name.to_lowercase() == needle))
    }

    /// Rename or recolor a tag
    pub fn update_tag(&self, tag: &Tag) -> Result<()> {
        if !is_valid_color(&tag.color) {
            return Err(StorageError::Constraint(format!(
                "tag color must look like #RRGGBB, got '{}'",
                tag.color
            )));
        }
        let name = require_text(&tag.name, "tag name")?;
        let writer = self.writer()?;
        let rows = writer.execute(
            "UPDATE tags SET name = ?1, color = ?2 WHERE id = ?3",
            params![name, tag.color.to_uppercase(), tag.id],
        )?;
        if rows == 0 {
            return Err(StorageError::NotFound(format!("tag {}", tag.id)));
        }
        Ok(())
    }

    /// Delete a tag and detach it from all words
    pub fn delete_tag(&self, id: &str) -> Result<bool> {
        let writer = self.writer()?;
        let rows = writer.execute("DELETE FROM tags WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    /// Tags attached to a word, ordered by name
    pub fn tags_for_word(&self, word_id: &str) -> Result<Vec<Tag>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare(
            "SELECT t.* FROM tags t
             JOIN word_tags wt ON wt.tag_id = t.id
             WHERE wt.word_id = ?1
             ORDER BY t.name COLLATE NOCASE",
        )?;
        let tags = stmt
            .query_map(params![word_id], |row| Self::row_to_tag(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tags)
    }

    /// Replace the full tag set of a word
    pub fn set_word_tags(&self, word_id: &str, tag_ids: &[String]) -> Result<()> {
        let mut writer = self.writer()?;
        let tx = writer.transaction()?;
        tx.execute("DELETE FROM word_tags WHERE word_id = ?1", params![word_id])?;
        for tag_id in tag_ids {
            tx.execute(
                "INSERT OR IGNORE INTO word_tags (word_id, tag_id) VALUES (?1, ?2)",
                params![word_id, tag_id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Attach a tag; returns false when it was already attached
    pub fn tag_word(&self, word_id: &str, tag_id: &str) -> Result<bool> {
        let writer = self.writer()?;
        let rows = writer.execute(
            "INSERT OR IGNORE INTO word_tags (word_id, tag_id) VALUES (?1, ?2)",
            params![word_id, tag_id],
        )?;
        Ok(rows > 0)
    }

    /// Detach a tag; returns false when it was not attached
    pub fn untag_word(&self, word_id: &str, tag_id: &str) -> Result<bool> {
        let writer = self.writer()?;
        let rows = writer.execute(
            "DELETE FROM word_tags WHERE word_id = ?1 AND tag_id = ?2",
            params![word_id, tag_id],
        )?;
        Ok(rows > 0)
    }

    // ========================================================================
    // LEARNING PROGRESS
    // ========================================================================

    fn read_progress(conn: &Connection, word_id: &str) -> Result<Option<ProgressRecord>> {
        let record = conn
            .query_row(
                "SELECT * FROM learning_progress WHERE word_id = ?1",
                params![word_id],
                |row| Self::row_to_progress(row),
            )
            .optional()?;
        Ok(record)
    }

    fn upsert_progress(conn: &Connection, word_id: &str, state: &MemoryState) -> Result<()> {
        conn.execute(
            "INSERT INTO learning_progress (
                id, word_id, correct_count, incorrect_count, level, ease_factor,
                interval_days, last_reviewed, next_review
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(word_id) DO UPDATE SET
                correct_count = excluded.correct_count,
                incorrect_count = excluded.incorrect_count,
                level = excluded.level,
                ease_factor = excluded.ease_factor,
                interval_days = excluded.interval_days,
                last_reviewed = excluded.last_reviewed,
                next_review = excluded.next_review",
            params![
                Uuid::new_v4().to_string(),
                word_id,
                state.correct_count,
                state.incorrect_count,
                state.repetition_level,
                state.ease_factor,
                state.interval_days,
                format_timestamp(state.last_reviewed_at),
                format_timestamp(state.next_review_due_at),
            ],
        )?;
        Ok(())
    }

    /// Memory state of a word (None = never reviewed)
    pub fn get_progress(&self, word_id: &str) -> Result<Option<MemoryState>> {
        Ok(self.get_progress_record(word_id)?.map(|r| r.state))
    }

    /// Memory state with its row identity
    pub fn get_progress_record(&self, word_id: &str) -> Result<Option<ProgressRecord>> {
        let reader = self.reader()?;
        Self::read_progress(&reader, word_id)
    }

    /// Progress of every reviewed word in a dictionary
    pub fn progress_by_dictionary(&self, dictionary_id: &str) -> Result<Vec<ProgressRecord>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare(
            "SELECT lp.* FROM learning_progress lp
             JOIN words w ON lp.word_id = w.id
             WHERE w.dictionary_id = ?1
             ORDER BY lp.next_review ASC",
        )?;
        let records = stmt
            .query_map(params![dictionary_id], |row| Self::row_to_progress(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Overwrite (or create) the memory state of a word
    ///
    /// Fails with [`StorageError::Constraint`] if the ease factor is below
    /// the SM-2 floor or not finite, the interval is shorter than a day, or
    /// the due date precedes the last review.
    pub fn save_progress(&self, word_id: &str, state: &MemoryState) -> Result<()> {
        validate_state(state)?;
        let writer = self.writer()?;
        Self::upsert_progress(&writer, word_id, state)
    }

    /// Forget all review history of a word
    pub fn delete_progress(&self, word_id: &str) -> Result<bool> {
        let writer = self.writer()?;
        let rows = writer.execute(
            "DELETE FROM learning_progress WHERE word_id = ?1",
            params![word_id],
        )?;
        Ok(rows > 0)
    }

    /// Number of words in a dictionary at or above `min_level`
    pub fn learned_word_count(&self, dictionary_id: &str, min_level: u32) -> Result<u32> {
        let reader = self.reader()?;
        let count = reader.query_row(
            "SELECT COUNT(*) FROM learning_progress lp
             JOIN words w ON lp.word_id = w.id
             WHERE w.dictionary_id = ?1 AND lp.level >= ?2",
            params![dictionary_id, min_level],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Record one review of a word and persist the new memory state
    ///
    /// The prior state is read, rescheduled and written back inside a single
    /// immediate transaction on the writer connection, so concurrent reviews
    /// of the same word are applied one after the other.
    pub fn record_answer(
        &self,
        word_id: &str,
        quality: impl Into<Quality>,
        now: DateTime<Utc>,
    ) -> Result<MemoryState> {
        let quality = quality.into();

        let mut writer = self.writer()?;
        let tx = writer.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM words WHERE id = ?1)",
            params![word_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(StorageError::NotFound(format!("word {}", word_id)));
        }

        let prior = Self::read_progress(&tx, word_id)?.map(|r| r.state);
        let next = storable_state(
            self.scheduler
                .compute_next_state(prior.as_ref(), quality, now),
        );
        Self::upsert_progress(&tx, word_id, &next)?;
        tx.commit()?;

        tracing::debug!(
            word_id,
            quality = quality.value(),
            level = next.repetition_level,
            interval_days = next.interval_days,
            "Recorded review"
        );

        Ok(next)
    }

    // ========================================================================
    // DUE SELECTION
    // ========================================================================

    /// Words due at `now` in a user's active dictionaries
    ///
    /// Never-reviewed words come first, then by due date ascending.
    pub fn words_due_for_review(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Word>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare(
            "SELECT w.* FROM words w
             JOIN dictionaries d ON w.dictionary_id = d.id
             LEFT JOIN learning_progress lp ON lp.word_id = w.id
             WHERE d.user_id = ?1
             AND d.is_active = 1
             AND (lp.next_review IS NULL OR lp.next_review <= ?2)
             ORDER BY lp.next_review IS NOT NULL, lp.next_review ASC, w.created_at ASC, w.rowid ASC
             LIMIT ?3",
        )?;
        let words = stmt
            .query_map(params![user_id, format_timestamp(now), limit], |row| {
                Self::row_to_word(row)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(words)
    }

    /// Words due at `now` in specific dictionaries (active or not)
    pub fn words_due_from_dictionaries(
        &self,
        dictionary_ids: &[String],
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Word>> {
        if dictionary_ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = (0..dictionary_ids.len())
            .map(|i| format!("?{}", i + 3))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT w.* FROM words w
             LEFT JOIN learning_progress lp ON lp.word_id = w.id
             WHERE w.dictionary_id IN ({})
             AND (lp.next_review IS NULL OR lp.next_review <= ?1)
             ORDER BY lp.next_review IS NOT NULL, lp.next_review ASC, w.created_at ASC, w.rowid ASC
             LIMIT ?2",
            placeholders
        );

        let now = format_timestamp(now);
        let mut values: Vec<&dyn ToSql> = Vec::with_capacity(dictionary_ids.len() + 2);
        values.push(&now);
        values.push(&limit);
        values.extend(dictionary_ids.iter().map(|id| id as &dyn ToSql));

        let reader = self.reader()?;
        let mut stmt = reader.prepare(&sql)?;
        let words = stmt
            .query_map(values.as_slice(), |row| Self::row_to_word(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(words)
    }

    /// Due words with tags and progress, ready for a learning session
    pub fn words_for_learning(
        &self,
        user_id: &str,
        dictionary_ids: Option<&[String]>,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<WordWithProgress>> {
        let words = match dictionary_ids {
            Some(ids) => self.words_due_from_dictionaries(ids, now, limit)?,
            None => self.words_due_for_review(user_id, now, limit)?,
        };
        words
            .into_iter()
            .map(|word| self.attach_progress(word))
            .collect()
    }

    // ========================================================================
    // STATISTICS & MAINTENANCE
    // ========================================================================

    /// Learning statistics for a user
    pub fn get_stats(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        learned_level: u32,
    ) -> Result<LearningStats> {
        let reader = self.reader()?;

        let total_dictionaries: i64 = reader.query_row(
            "SELECT COUNT(*) FROM dictionaries WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;

        let total_words: i64 = reader.query_row(
            "SELECT COUNT(*) FROM words w
             JOIN dictionaries d ON w.dictionary_id = d.id
             WHERE d.user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;

        let (reviewed_words, learned_words, total_correct, total_incorrect, average_ease_factor) =
            reader.query_row(
                "SELECT
                    COUNT(lp.id),
                    COALESCE(SUM(CASE WHEN lp.level >= ?2 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(lp.correct_count), 0),
                    COALESCE(SUM(lp.incorrect_count), 0),
                    AVG(lp.ease_factor)
                 FROM learning_progress lp
                 JOIN words w ON lp.word_id = w.id
                 JOIN dictionaries d ON w.dictionary_id = d.id
                 WHERE d.user_id = ?1",
                params![user_id, learned_level],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, Option<f64>>(4)?,
                    ))
                },
            )?;

        let due_words: i64 = reader.query_row(
            "SELECT COUNT(*) FROM words w
             JOIN dictionaries d ON w.dictionary_id = d.id
             LEFT JOIN learning_progress lp ON lp.word_id = w.id
             WHERE d.user_id = ?1
             AND d.is_active = 1
             AND (lp.next_review IS NULL OR lp.next_review <= ?2)",
            params![user_id, format_timestamp(now)],
            |row| row.get(0),
        )?;

        Ok(LearningStats {
            total_dictionaries,
            total_words,
            reviewed_words,
            learned_words,
            due_words,
            total_correct,
            total_incorrect,
            average_ease_factor,
        })
    }

    /// Create a consistent backup using VACUUM INTO
    pub fn backup_to(&self, path: &Path) -> Result<()> {
        let path_str = path
            .to_str()
            .ok_or_else(|| StorageError::Init("Invalid backup path encoding".to_string()))?;
        // Reject control characters (except tab)
        if path_str.bytes().any(|b| b < 0x20 && b != b'\t') {
            return Err(StorageError::Init(
                "Backup path contains invalid characters".to_string(),
            ));
        }
        let reader = self.reader()?;
        // VACUUM INTO doesn't support parameterized queries; escape single quotes
        reader.execute_batch(&format!("VACUUM INTO '{}'", path_str.replace('\'', "''")))?;
        tracing::info!("Backup written to {}", path.display());
        Ok(())
    }
}
