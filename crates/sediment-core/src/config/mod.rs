//! Configuration system for Sediment.
//! TOML-based, layered resolution: overrides > env > project file > defaults.

pub mod content_config;
pub mod database_config;
pub mod migration_config;
pub mod sediment_config;

pub use content_config::ContentConfig;
pub use database_config::DatabaseConfig;
pub use migration_config::MigrationConfig;
pub use sediment_config::{ConfigOverrides, SedimentConfig};
