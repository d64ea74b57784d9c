//! Persistence of the applied project config tree.
//!
//! The stored tree is flattened to `path -> JSON` rows in `projectconfig`.
//! Only the stored tree is persisted; pending changes live in memory
//! until applied.

use rusqlite::{params, Connection};
use sediment_core::errors::StorageError;
use sediment_core::project_config::{flatten, unflatten, ConfigChange, ProjectConfigTree};

use crate::connection::writer::with_immediate_transaction;

/// Load the stored tree. An empty table yields an empty tree.
pub fn load(conn: &Connection) -> Result<ProjectConfigTree, StorageError> {
    let mut stmt = conn
        .prepare_cached("SELECT path, value FROM projectconfig ORDER BY path")
        .map_err(StorageError::sqlite)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
        .map_err(StorageError::sqlite)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(StorageError::sqlite)?;

    let mut leaves = Vec::with_capacity(rows.len());
    for (path, raw) in rows {
        let value = serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt {
            details: format!("project config {path}: {e}"),
        })?;
        leaves.push((path, value));
    }
    let stored = unflatten(leaves).map_err(|e| StorageError::Corrupt {
        details: e.to_string(),
    })?;
    Ok(ProjectConfigTree::from_stored(stored))
}

/// Replace the persisted rows with `tree`'s stored tree.
pub fn save(conn: &Connection, tree: &ProjectConfigTree) -> Result<usize, StorageError> {
    let leaves = flatten(tree.stored());
    let write = |conn: &Connection| -> Result<usize, StorageError> {
        conn.execute("DELETE FROM projectconfig", [])
            .map_err(StorageError::sqlite)?;
        let mut stmt = conn
            .prepare_cached("INSERT INTO projectconfig (path, value) VALUES (?1, ?2)")
            .map_err(StorageError::sqlite)?;
        for (path, value) in &leaves {
            stmt.execute(params![path, value.to_string()])
                .map_err(StorageError::sqlite)?;
        }
        Ok(leaves.len())
    };

    // Join the caller's transaction when there is one.
    if conn.is_autocommit() {
        with_immediate_transaction(conn, |tx| write(tx))
    } else {
        write(conn)
    }
}

/// Promote pending changes and persist them.
pub fn apply_and_save(
    conn: &Connection,
    tree: &mut ProjectConfigTree,
) -> Result<Vec<ConfigChange>, StorageError> {
    let changes = tree.apply();
    if !changes.is_empty() {
        save(conn, tree)?;
        tracing::info!(changes = changes.len(), "project config applied");
    }
    Ok(changes)
}
