//! Configuration
//!
//! TOML file at `<config_dir>/config.toml` with environment overrides:
//! - `LINGUA_DATA_DIR`: directory holding `lingua.db`
//! - `LINGUA_SESSION_SIZE`: words per learning session

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::session::DEFAULT_SESSION_SIZE;

/// Repetition level at which a word counts as learned
pub const DEFAULT_LEARNED_LEVEL: u32 = 3;

const CONFIG_FILE: &str = "config.toml";
const DB_FILE: &str = "lingua.db";

/// Configuration error type
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory for the database; platform data dir when unset
    pub data_dir: Option<PathBuf>,
    /// Words per learning session
    pub session_size: u32,
    /// Repetition level at which a word counts as learned
    pub learned_level: u32,
    /// Target language for new users
    pub default_target_language: String,
    /// Native language for new users
    pub default_native_language: String,
    /// `tracing` filter used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            session_size: DEFAULT_SESSION_SIZE,
            learned_level: DEFAULT_LEARNED_LEVEL,
            default_target_language: "en".to_string(),
            default_native_language: "ru".to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Platform config file location, if a home directory exists
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "linguafranca", "lingua")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Load from `path`, or the default location when present
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    /// Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::default_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file without overrides
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `LINGUA_*` environment variables
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("LINGUA_DATA_DIR").filter(|v| !v.is_empty()) {
            self.data_dir = Some(PathBuf::from(dir));
        }

        if let Some(raw) = lookup("LINGUA_SESSION_SIZE").filter(|v| !v.is_empty()) {
            self.session_size = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "LINGUA_SESSION_SIZE".to_string(),
                message: format!("'{}' is not a positive integer", raw),
            })?;
        }

        Ok(())
    }

    /// Reject values the rest of the crate cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "session_size".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.learned_level == 0 {
            return Err(ConfigError::InvalidValue {
                key: "learned_level".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Database path, or None for the storage default
    pub fn db_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(DB_FILE))
    }
}
