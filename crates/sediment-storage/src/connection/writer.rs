//! Write connection utilities: BEGIN IMMEDIATE transactions.

use rusqlite::{Connection, Transaction, TransactionBehavior};
use sediment_core::errors::StorageError;

/// Execute a write operation inside a BEGIN IMMEDIATE transaction.
///
/// The transaction rolls back when `f` returns an error (the wrapper is
/// dropped without commit).
pub fn with_immediate_transaction<F, T, E>(conn: &Connection, f: F) -> Result<T, E>
where
    F: FnOnce(&Transaction<'_>) -> Result<T, E>,
    E: From<StorageError>,
{
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate).map_err(|e| {
        StorageError::Sqlite {
            message: format!("failed to begin immediate transaction: {e}"),
        }
    })?;

    let result = f(&tx)?;

    tx.commit().map_err(|e| StorageError::Sqlite {
        message: format!("failed to commit: {e}"),
    })?;

    Ok(result)
}
