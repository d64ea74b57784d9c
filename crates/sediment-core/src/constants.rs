//! Compiled defaults shared across crates.

/// Default SQLite database file name.
pub const DEFAULT_DB_FILENAME: &str = "sediment.db";

/// Default busy timeout applied to every connection.
pub const DEFAULT_BUSY_TIMEOUT_MS: u32 = 5000;

/// Prefix of every physical field column in a legacy content table.
pub const DEFAULT_COLUMN_PREFIX: &str = "field_";

/// Rows fetched per keyset page during a content refactor pass.
pub const DEFAULT_CONTENT_BATCH_SIZE: usize = 500;

/// Element rows table.
pub const DEFAULT_ELEMENTS_TABLE: &str = "elements";

/// Element/site association rows table.
pub const DEFAULT_ELEMENTS_SITES_TABLE: &str = "elements_sites";

/// Migration Record Store table.
pub const MIGRATIONS_TABLE: &str = "migrations";

/// Persisted project config table.
pub const PROJECT_CONFIG_TABLE: &str = "projectconfig";

/// Project config file name looked up in the project root.
pub const PROJECT_CONFIG_FILENAME: &str = "sediment.toml";

/// Label used in progress output when an element kind has no registered label.
pub const DEFAULT_ELEMENT_LABEL: &str = "element";
