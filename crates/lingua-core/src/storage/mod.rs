//! Storage Module
//!
//! SQLite-based storage layer with:
//! - Versioned schema migrations
//! - Reader/writer connection split over WAL
//! - Transactional SM-2 review recording
//! - Due-word selection across active dictionaries

mod migrations;
mod sqlite;

pub use migrations::MIGRATIONS;
pub use sqlite::{ProgressRecord, Result, Storage, StorageError};
