//! Content refactor configuration.

use serde::{Deserialize, Serialize};

use crate::constants;

/// Configuration for the content refactor engine.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ContentConfig {
    /// Prefix of field columns in legacy content tables. Default: `field_`.
    pub column_prefix: Option<String>,
    /// Rows per keyset page. Default: 500.
    pub batch_size: Option<usize>,
    /// Element rows table. Default: `elements`.
    pub elements_table: Option<String>,
    /// Element/site association table. Default: `elements_sites`.
    pub elements_sites_table: Option<String>,
}

impl ContentConfig {
    pub fn effective_column_prefix(&self) -> &str {
        self.column_prefix
            .as_deref()
            .unwrap_or(constants::DEFAULT_COLUMN_PREFIX)
    }

    pub fn effective_batch_size(&self) -> usize {
        self.batch_size
            .unwrap_or(constants::DEFAULT_CONTENT_BATCH_SIZE)
    }

    pub fn effective_elements_table(&self) -> &str {
        self.elements_table
            .as_deref()
            .unwrap_or(constants::DEFAULT_ELEMENTS_TABLE)
    }

    pub fn effective_elements_sites_table(&self) -> &str {
        self.elements_sites_table
            .as_deref()
            .unwrap_or(constants::DEFAULT_ELEMENTS_SITES_TABLE)
    }
}
