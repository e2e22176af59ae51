//! Database Migrations
//!
//! Schema migration definitions for the storage layer.

/// Migration definitions
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema: users, dictionaries, words, tags, learning progress",
        up: MIGRATION_V1_UP,
    },
    Migration {
        version: 2,
        description: "Track scheduled interval on learning progress",
        up: MIGRATION_V2_UP,
    },
];

/// A database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Version number
    pub version: u32,
    /// Description
    pub description: &'static str,
    /// SQL to apply
    pub up: &'static str,
}

/// V1: Initial schema
const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL,
    display_name TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_settings (
    user_id TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
    target_language TEXT NOT NULL DEFAULT 'en',
    native_language TEXT NOT NULL DEFAULT 'ru',
    dark_theme INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS dictionaries (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    dictionary_type TEXT NOT NULL DEFAULT 'custom',
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_dictionaries_user ON dictionaries(user_id);

CREATE TABLE IF NOT EXISTS words (
    id TEXT PRIMARY KEY,
    dictionary_id TEXT NOT NULL REFERENCES dictionaries(id) ON DELETE CASCADE,
    original TEXT NOT NULL,
    main_translation TEXT NOT NULL,
    -- JSON array of strings
    additional_translations TEXT NOT NULL DEFAULT '[]',
    -- JSON object: sentence -> translation or null
    examples TEXT NOT NULL DEFAULT '{}',
    notes TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_words_dictionary ON words(dictionary_id);
CREATE INDEX IF NOT EXISTS idx_words_created ON words(created_at);

CREATE TABLE IF NOT EXISTS tags (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    color TEXT NOT NULL DEFAULT '#4CAF50'
);

CREATE INDEX IF NOT EXISTS idx_tags_user ON tags(user_id);

CREATE TABLE IF NOT EXISTS word_tags (
    word_id TEXT NOT NULL REFERENCES words(id) ON DELETE CASCADE,
    tag_id TEXT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (word_id, tag_id)
);

CREATE INDEX IF NOT EXISTS idx_word_tags_tag ON word_tags(tag_id);

-- SM-2 memory state, at most one row per word
CREATE TABLE IF NOT EXISTS learning_progress (
    id TEXT PRIMARY KEY,
    word_id TEXT NOT NULL UNIQUE REFERENCES words(id) ON DELETE CASCADE,
    correct_count INTEGER NOT NULL DEFAULT 0,
    incorrect_count INTEGER NOT NULL DEFAULT 0,
    level INTEGER NOT NULL DEFAULT 0,
    ease_factor REAL NOT NULL DEFAULT 2.5,
    last_reviewed TEXT NOT NULL,
    next_review TEXT NOT NULL
);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, datetime('now'));
"#;

/// V2: Persist the interval chosen by the scheduler
///
/// Rows written before this version get the relearn interval; the scheduler
/// never reads this column back, it re-derives the previous interval.
const MIGRATION_V2_UP: &str = r#"
ALTER TABLE learning_progress ADD COLUMN interval_days INTEGER NOT NULL DEFAULT 1;

CREATE INDEX IF NOT EXISTS idx_progress_next_review ON learning_progress(next_review);
CREATE INDEX IF NOT EXISTS idx_progress_level ON learning_progress(level);

UPDATE schema_version SET version = 2, applied_at = datetime('now');
"#;

/// Get current schema version from database
pub fn get_current_version(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .or(Ok(0))
}

/// Apply pending migrations
pub fn apply_migrations(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    apply_migration_list(conn, MIGRATIONS)
}

/// Apply every migration newer than the current version, each in its own transaction
///
/// A failing migration is rolled back whole and leaves the version untouched.
fn apply_migration_list(
    conn: &rusqlite::Connection,
    migrations: &[Migration],
) -> rusqlite::Result<u32> {
    let current_version = get_current_version(conn)?;
    let mut applied = 0;

    for migration in migrations {
        if migration.version > current_version {
            tracing::info!(
                "Applying migration v{}: {}",
                migration.version,
                migration.description
            );

            let tx = conn.unchecked_transaction()?;
            tx.execute_batch(migration.up)?;
            tx.commit()?;
            applied += 1;
        }
    }

    Ok(applied)
}
