//! Database connection configuration.

use serde::{Deserialize, Serialize};

use crate::constants;

/// Configuration for the database connection.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    pub path: Option<String>,
    /// Busy timeout in milliseconds. Default: 5000.
    pub busy_timeout_ms: Option<u32>,
}

impl DatabaseConfig {
    pub fn effective_path(&self) -> &str {
        self.path.as_deref().unwrap_or(constants::DEFAULT_DB_FILENAME)
    }

    pub fn effective_busy_timeout_ms(&self) -> u32 {
        self.busy_timeout_ms
            .unwrap_or(constants::DEFAULT_BUSY_TIMEOUT_MS)
    }
}
