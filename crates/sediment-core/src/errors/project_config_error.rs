//! Project config store errors.

use super::error_code::{self, ErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum ProjectConfigError {
    #[error("invalid project config path: {path:?}")]
    InvalidPath { path: String },

    #[error("project config path {path} crosses a non-container value")]
    NotAContainer { path: String },

    #[error("project config serialization failed: {message}")]
    Serialize { message: String },
}

impl ErrorCode for ProjectConfigError {
    fn error_code(&self) -> &'static str {
        error_code::PROJECT_CONFIG_ERROR
    }
}
