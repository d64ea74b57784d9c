//! ErrorCode trait for operator-facing failure lines.

/// Every error enum implements this to provide a stable, greppable code
/// alongside its human-readable message.
pub trait ErrorCode {
    /// Returns the error code string (e.g., "MIGRATION_FAILED").
    fn error_code(&self) -> &'static str;

    /// Returns the formatted string: `[ERROR_CODE] message`.
    fn display_code(&self) -> String
    where
        Self: std::fmt::Display,
    {
        format!("[{}] {}", self.error_code(), self)
    }
}

pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
pub const BOOTSTRAP_FAILED: &str = "BOOTSTRAP_FAILED";
pub const UNSUPPORTED: &str = "UNSUPPORTED";
pub const DUPLICATE_MIGRATION: &str = "DUPLICATE_MIGRATION";
pub const NOT_FOUND: &str = "NOT_FOUND";
pub const DB_CORRUPT: &str = "DB_CORRUPT";
pub const INVALID_MIGRATION_NAME: &str = "INVALID_MIGRATION_NAME";
pub const MIGRATION_REFUSED: &str = "MIGRATION_REFUSED";
pub const MIGRATION_IRREVERSIBLE: &str = "MIGRATION_IRREVERSIBLE";
pub const PRECONDITION_FAILED: &str = "PRECONDITION_FAILED";
pub const MIGRATION_FAILED: &str = "MIGRATION_FAILED";
pub const UNKNOWN_MIGRATION: &str = "UNKNOWN_MIGRATION";
pub const CONTENT_ERROR: &str = "CONTENT_ERROR";
pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
pub const PROJECT_CONFIG_ERROR: &str = "PROJECT_CONFIG_ERROR";
