//! Migration runner configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the migration runner.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MigrationConfig {
    /// Wrap each migration in a transaction. When unset, follows the
    /// dialect's transactional-DDL capability.
    pub transactional: Option<bool>,
}

impl MigrationConfig {
    /// Resolve the transaction policy against the dialect capability.
    pub fn effective_transactional(&self, dialect_supports_ddl_tx: bool) -> bool {
        self.transactional.unwrap_or(dialect_supports_ddl_tx)
    }
}
