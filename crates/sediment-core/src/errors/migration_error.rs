//! Migration runner errors.

use super::error_code::{self, ErrorCode};
use super::{ContentError, ProjectConfigError, StorageError};

/// Errors raised while discovering, applying or reverting migrations.
///
/// `Refused` is the explicit "up() returned false" outcome; the runner
/// treats it exactly like a raised error.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("invalid migration name: {name}")]
    InvalidName { name: String },

    #[error("migration {name} is registered twice for owner {owner}")]
    DuplicateName { owner: String, name: String },

    #[error("migration {name} refused to apply: {reason}")]
    Refused { name: String, reason: String },

    #[error("{name} cannot be reverted.")]
    Irreversible { name: String },

    #[error("precondition failed in {name}: {message}")]
    Precondition { name: String, message: String },

    #[error("migration {name} failed: {message}")]
    Failed { name: String, message: String },

    #[error("unknown migration {name} for owner {owner}")]
    UnknownMigration { owner: String, name: String },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("content error: {0}")]
    Content(#[from] ContentError),

    #[error("project config error: {0}")]
    ProjectConfig(#[from] ProjectConfigError),
}

impl MigrationError {
    /// Wrap any failure raised inside `up()`/`down()` with the migration's
    /// name, keeping the underlying message verbatim.
    pub fn failed(name: &str, err: &impl std::fmt::Display) -> Self {
        Self::Failed {
            name: name.to_string(),
            message: err.to_string(),
        }
    }
}

impl ErrorCode for MigrationError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidName { .. } | Self::DuplicateName { .. } => {
                error_code::INVALID_MIGRATION_NAME
            }
            Self::Refused { .. } => error_code::MIGRATION_REFUSED,
            Self::Irreversible { .. } => error_code::MIGRATION_IRREVERSIBLE,
            Self::Precondition { .. } => error_code::PRECONDITION_FAILED,
            Self::Failed { .. } => error_code::MIGRATION_FAILED,
            Self::UnknownMigration { .. } => error_code::UNKNOWN_MIGRATION,
            Self::Storage(e) => e.error_code(),
            Self::Content(e) => e.error_code(),
            Self::ProjectConfig(e) => e.error_code(),
        }
    }
}
