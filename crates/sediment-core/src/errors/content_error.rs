//! Content refactor errors.

use super::error_code::{self, ErrorCode};
use super::StorageError;

/// Errors raised by the content refactor engine.
///
/// Field decoding never produces an error: malformed JSON falls back to the
/// raw value. Everything here is fatal for the enclosing migration.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("legacy content table {table} does not exist")]
    MissingTable { table: String },

    #[error("element selection is empty")]
    EmptySelection,

    #[error("failed to encode packed content for row {row_id}: {message}")]
    Encode { row_id: i64, message: String },

    #[error("{0}")]
    Storage(#[from] StorageError),
}

impl ErrorCode for ContentError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Storage(e) => e.error_code(),
            _ => error_code::CONTENT_ERROR,
        }
    }
}
