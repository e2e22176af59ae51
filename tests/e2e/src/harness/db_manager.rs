//! Test Database Manager
//!
//! Provides isolated database instances for testing:
//! - Temporary databases that are automatically cleaned up
//! - A learner profile and a first dictionary ready to use
//! - Reopening the same file to check persistence

use lingua_core::{Dictionary, LearningStats, NewDictionary, Storage, User};
use std::path::PathBuf;
use tempfile::TempDir;

/// Manager for test databases
///
/// Creates isolated database instances for each test to prevent interference.
/// Automatically cleans up temporary databases when dropped.
///
/// # Example
///
/// ```rust,ignore
/// let db = TestDatabaseManager::new_temp();
/// let word = db.storage.add_word(NewWord::new(&db.dictionary.id, "cat", "кошка"))?;
/// // Database is automatically deleted when `db` goes out of scope
/// ```
pub struct TestDatabaseManager {
    /// The storage instance
    pub storage: Storage,
    /// Learner created on setup
    pub user: User,
    /// Dictionary created on setup
    pub dictionary: Dictionary,
    /// Temporary directory (kept alive to prevent premature deletion)
    _temp_dir: Option<TempDir>,
    /// Path to the database file
    db_path: PathBuf,
}

impl TestDatabaseManager {
    /// Create a new test database in a temporary directory
    ///
    /// The database is automatically deleted when the manager is dropped.
    pub fn new_temp() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test_lingua.db");
        let mut manager = Self::new_at_path(db_path);
        manager._temp_dir = Some(temp_dir);
        manager
    }

    /// Create a test database at a specific path
    ///
    /// The database is NOT automatically deleted.
    pub fn new_at_path(path: PathBuf) -> Self {
        let storage = Storage::new(Some(path.clone())).expect("Failed to create test storage");
        let user = storage
            .create_user("learner@example.com", "Test Learner")
            .expect("Failed to create test user");
        let dictionary = storage
            .create_dictionary(NewDictionary::new(&user.id, "Test Dictionary"))
            .expect("Failed to create test dictionary");

        Self {
            storage,
            user,
            dictionary,
            _temp_dir: None,
            db_path: path,
        }
    }

    /// Get the database path
    pub fn path(&self) -> &PathBuf {
        &self.db_path
    }

    /// Open a second storage on the same file
    pub fn reopen(&self) -> Storage {
        Storage::new(Some(self.db_path.clone())).expect("Failed to reopen storage")
    }

    /// Statistics for the setup learner with the default learned level
    pub fn stats(&self, now: chrono::DateTime<chrono::Utc>) -> LearningStats {
        self.storage
            .get_stats(&self.user.id, now, lingua_core::DEFAULT_LEARNED_LEVEL)
            .expect("Failed to read stats")
    }

    /// Create another dictionary for the setup learner
    pub fn add_dictionary(&self, name: &str) -> Dictionary {
        self.storage
            .create_dictionary(NewDictionary::new(&self.user.id, name))
            .expect("Failed to create dictionary")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_database_has_profile() {
        let db = TestDatabaseManager::new_temp();
        assert!(db.path().exists());
        let current = db.storage.get_current_user().unwrap().unwrap();
        assert_eq!(current.id, db.user.id);
        assert_eq!(db.stats(chrono::Utc::now()).total_dictionaries, 1);
    }
}
