//! Error handling for Sediment.
//! One error enum per subsystem, `thiserror` only.

pub mod config_error;
pub mod content_error;
pub mod error_code;
pub mod migration_error;
pub mod project_config_error;
pub mod storage_error;

pub use config_error::ConfigError;
pub use content_error::ContentError;
pub use error_code::ErrorCode;
pub use migration_error::MigrationError;
pub use project_config_error::ProjectConfigError;
pub use storage_error::StorageError;
