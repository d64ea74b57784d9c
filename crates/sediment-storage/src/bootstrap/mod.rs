//! Internal schema bootstrap using PRAGMA user_version.
//!
//! These are the engine's own tables. They always exist before any
//! registered migration runs.

pub mod v001_install;
pub mod v002_elements;

use rusqlite::Connection;
use sediment_core::errors::StorageError;

/// Latest internal schema version.
pub const LATEST_VERSION: u32 = 2;

/// Apply every pending internal schema version.
pub fn run_bootstrap(conn: &Connection) -> Result<(), StorageError> {
    let current_version = current_version(conn).map_err(|e| StorageError::Bootstrap {
        version: 0,
        message: e.to_string(),
    })?;

    let versions: &[(&str, u32)] = &[
        (v001_install::BOOTSTRAP_SQL, 1),
        (v002_elements::BOOTSTRAP_SQL, 2),
    ];

    for (sql, version) in versions {
        if current_version < *version {
            conn.execute_batch(sql)
                .map_err(|e| StorageError::Bootstrap {
                    version: *version,
                    message: e.to_string(),
                })?;
            conn.pragma_update(None, "user_version", version)
                .map_err(|e| StorageError::Bootstrap {
                    version: *version,
                    message: e.to_string(),
                })?;
            tracing::info!(version = version, "applied internal schema version");
        }
    }

    Ok(())
}

/// Get the current internal schema version.
pub fn current_version(conn: &Connection) -> Result<u32, StorageError> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(StorageError::sqlite)
}
