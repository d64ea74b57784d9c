//! PRAGMA configuration applied to every SQLite connection.
//!
//! foreign_keys ON, busy_timeout from config, WAL for file-backed databases.

use rusqlite::Connection;
use sediment_core::errors::StorageError;

/// Apply safety pragmas to a connection.
pub fn apply_pragmas(conn: &Connection, busy_timeout_ms: u32) -> Result<(), StorageError> {
    conn.execute_batch(&format!(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = {busy_timeout_ms};
        PRAGMA temp_store = MEMORY;
        "
    ))
    .map_err(|e| StorageError::Sqlite {
        message: format!("failed to apply pragmas: {e}"),
    })
}

/// Switch a file-backed connection to WAL. In-memory databases keep
/// their `memory` journal.
pub fn enable_wal(conn: &Connection) -> Result<(), StorageError> {
    let _mode: String = conn
        .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
        .map_err(|e| StorageError::Sqlite {
            message: format!("failed to enable WAL: {e}"),
        })?;
    Ok(())
}

/// Verify that foreign key enforcement is active.
pub fn foreign_keys_enabled(conn: &Connection) -> Result<bool, StorageError> {
    let fk: i64 = conn
        .pragma_query_value(None, "foreign_keys", |row| row.get(0))
        .map_err(StorageError::sqlite)?;
    Ok(fk == 1)
}
