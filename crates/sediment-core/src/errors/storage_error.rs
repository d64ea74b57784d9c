//! Storage-layer errors for SQLite operations.

use super::error_code::{self, ErrorCode};

/// Errors raised by the connection, inspector, executor and record store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    Sqlite { message: String },

    #[error("bootstrap failed at version {version}: {message}")]
    Bootstrap { version: u32, message: String },

    #[error("{operation} is not supported by the {dialect} dialect")]
    Unsupported { dialect: String, operation: String },

    #[error("migration {name} is already recorded for owner {owner}")]
    DuplicateMigration { owner: String, name: String },

    #[error("not found: {what}")]
    NotFound { what: String },

    #[error("database corruption detected: {details}")]
    Corrupt { details: String },
}

impl StorageError {
    /// Shorthand used at every `rusqlite` call site.
    pub fn sqlite(err: impl std::fmt::Display) -> Self {
        Self::Sqlite {
            message: err.to_string(),
        }
    }
}

impl ErrorCode for StorageError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Sqlite { .. } => error_code::STORAGE_ERROR,
            Self::Bootstrap { .. } => error_code::BOOTSTRAP_FAILED,
            Self::Unsupported { .. } => error_code::UNSUPPORTED,
            Self::DuplicateMigration { .. } => error_code::DUPLICATE_MIGRATION,
            Self::NotFound { .. } => error_code::NOT_FOUND,
            Self::Corrupt { .. } => error_code::DB_CORRUPT,
        }
    }
}
