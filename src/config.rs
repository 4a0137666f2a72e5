//! Connection configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Database file used when no path is configured.
pub const DEFAULT_DB_PATH: &str = "test.db";

/// Default time SQLite waits on a locked database before failing.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// SQLite connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// Path to the SQLite database file
    pub db_path: PathBuf,
    /// Create the file when it does not exist
    pub create_if_missing: bool,
    pub busy_timeout_ms: u64,
    /// Enforce foreign key constraints on this connection
    pub foreign_keys: bool,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            create_if_missing: true,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            foreign_keys: true,
        }
    }
}

impl SqliteConfig {
    /// Create a config for the given path with default settings
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }

    pub fn with_create_if_missing(mut self, create_if_missing: bool) -> Self {
        self.create_if_missing = create_if_missing;
        self
    }

    pub fn with_busy_timeout_ms(mut self, busy_timeout_ms: u64) -> Self {
        self.busy_timeout_ms = busy_timeout_ms;
        self
    }

    pub fn with_foreign_keys(mut self, foreign_keys: bool) -> Self {
        self.foreign_keys = foreign_keys;
        self
    }
}
