//! Top-level Sediment configuration with layered resolution.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{ContentConfig, DatabaseConfig, MigrationConfig};
use crate::constants;
use crate::errors::ConfigError;
use crate::types::identifier::is_identifier;

/// Top-level configuration aggregating all sub-configs.
///
/// Resolution order (highest priority first):
/// 1. Explicit overrides (applied via `apply_overrides`)
/// 2. Environment variables (`SEDIMENT_*`)
/// 3. Project config (`sediment.toml` in the project root)
/// 4. Compiled defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SedimentConfig {
    pub database: DatabaseConfig,
    pub migrations: MigrationConfig,
    pub content: ContentConfig,
}

/// Caller-supplied overrides that win over every other layer.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub db_path: Option<String>,
    pub busy_timeout_ms: Option<u32>,
    pub transactional: Option<bool>,
    pub batch_size: Option<usize>,
}

impl SedimentConfig {
    /// Load configuration with layered resolution rooted at `root`.
    pub fn load(root: &Path, overrides: Option<&ConfigOverrides>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let project_config_path = root.join(constants::PROJECT_CONFIG_FILENAME);
        if project_config_path.exists() {
            Self::merge_toml_file(&mut config, &project_config_path)?;
        }

        Self::apply_env_overrides(&mut config);

        if let Some(o) = overrides {
            Self::apply_overrides(&mut config, o);
        }

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate the configuration values.
    pub fn validate(config: &SedimentConfig) -> Result<(), ConfigError> {
        if let Some(timeout) = config.database.busy_timeout_ms {
            if timeout == 0 {
                return Err(ConfigError::ValidationFailed {
                    field: "database.busy_timeout_ms".to_string(),
                    message: "must be greater than 0".to_string(),
                });
            }
        }
        if let Some(batch) = config.content.batch_size {
            if batch == 0 {
                return Err(ConfigError::ValidationFailed {
                    field: "content.batch_size".to_string(),
                    message: "must be greater than 0".to_string(),
                });
            }
        }
        if let Some(ref prefix) = config.content.column_prefix {
            // An empty prefix is allowed: columns are then named after the handle.
            if !prefix.is_empty() && !is_identifier(prefix) {
                return Err(ConfigError::ValidationFailed {
                    field: "content.column_prefix".to_string(),
                    message: "must contain only ASCII letters, digits and underscores".to_string(),
                });
            }
        }
        for (field, value) in [
            ("content.elements_table", &config.content.elements_table),
            ("content.elements_sites_table", &config.content.elements_sites_table),
        ] {
            if let Some(table) = value {
                if !is_identifier(table) {
                    return Err(ConfigError::ValidationFailed {
                        field: field.to_string(),
                        message: format!("{table:?} is not a valid table name"),
                    });
                }
            }
        }
        Ok(())
    }

    /// Merge a TOML file into the existing config.
    fn merge_toml_file(config: &mut SedimentConfig, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let file_config: SedimentConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        Self::merge(config, &file_config);
        Ok(())
    }

    /// Merge `other` into `base`; `other` wins only where it has a value.
    fn merge(base: &mut SedimentConfig, other: &SedimentConfig) {
        // Database
        if other.database.path.is_some() {
            base.database.path = other.database.path.clone();
        }
        if other.database.busy_timeout_ms.is_some() {
            base.database.busy_timeout_ms = other.database.busy_timeout_ms;
        }

        // Migrations
        if other.migrations.transactional.is_some() {
            base.migrations.transactional = other.migrations.transactional;
        }

        // Content
        if other.content.column_prefix.is_some() {
            base.content.column_prefix = other.content.column_prefix.clone();
        }
        if other.content.batch_size.is_some() {
            base.content.batch_size = other.content.batch_size;
        }
        if other.content.elements_table.is_some() {
            base.content.elements_table = other.content.elements_table.clone();
        }
        if other.content.elements_sites_table.is_some() {
            base.content.elements_sites_table = other.content.elements_sites_table.clone();
        }
    }

    /// Apply environment variable overrides.
    /// Unparseable values are ignored and the lower layer stays in effect.
    fn apply_env_overrides(config: &mut SedimentConfig) {
        if let Ok(val) = std::env::var("SEDIMENT_DB_PATH") {
            config.database.path = Some(val);
        }
        if let Ok(val) = std::env::var("SEDIMENT_MIGRATIONS_TRANSACTIONAL") {
            if let Ok(v) = val.parse::<bool>() {
                config.migrations.transactional = Some(v);
            }
        }
        if let Ok(val) = std::env::var("SEDIMENT_CONTENT_BATCH_SIZE") {
            if let Ok(v) = val.parse::<usize>() {
                config.content.batch_size = Some(v);
            }
        }
        if let Ok(val) = std::env::var("SEDIMENT_CONTENT_COLUMN_PREFIX") {
            config.content.column_prefix = Some(val);
        }
    }

    /// Apply explicit overrides (highest priority).
    fn apply_overrides(config: &mut SedimentConfig, o: &ConfigOverrides) {
        if let Some(ref v) = o.db_path {
            config.database.path = Some(v.clone());
        }
        if let Some(v) = o.busy_timeout_ms {
            config.database.busy_timeout_ms = Some(v);
        }
        if let Some(v) = o.transactional {
            config.migrations.transactional = Some(v);
        }
        if let Some(v) = o.batch_size {
            config.content.batch_size = Some(v);
        }
    }

    /// Serialize the config back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            path: "<serialization>".to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_only_overrides_present_values() {
        let mut base = SedimentConfig::default();
        base.database.busy_timeout_ms = Some(1000);
        base.content.batch_size = Some(10);

        let mut other = SedimentConfig::default();
        other.content.batch_size = Some(50);

        SedimentConfig::merge(&mut base, &other);
        assert_eq!(base.database.busy_timeout_ms, Some(1000));
        assert_eq!(base.content.batch_size, Some(50));
    }

    #[test]
    fn overrides_win() {
        let mut config = SedimentConfig::default();
        config.migrations.transactional = Some(true);
        SedimentConfig::apply_overrides(
            &mut config,
            &ConfigOverrides {
                transactional: Some(false),
                ..Default::default()
            },
        );
        assert_eq!(config.migrations.transactional, Some(false));
    }
}
