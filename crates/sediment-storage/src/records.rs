//! Migration Record Store: which migrations have run, per owner scope.
//!
//! Rows are append-only under normal operation. `remove` and `clear`
//! are administrative (revert, operator reset).

use std::collections::BTreeSet;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use sediment_core::errors::StorageError;
use sediment_core::types::{MigrationRecord, OwnerScope};

use crate::bootstrap::v001_install;

pub struct MigrationRecordStore<'c> {
    conn: &'c Connection,
}

impl<'c> MigrationRecordStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Create the record table if missing. Idempotent.
    pub fn install(&self) -> Result<(), StorageError> {
        self.conn
            .execute_batch(v001_install::BOOTSTRAP_SQL)
            .map_err(StorageError::sqlite)
    }

    pub fn has_run(&self, owner: &OwnerScope, name: &str) -> Result<bool, StorageError> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM migrations WHERE ownerId IS ?1 AND name = ?2",
                params![owner.owner_id(), name],
                |row| row.get(0),
            )
            .optional()
            .map_err(StorageError::sqlite)?;
        Ok(found.is_some())
    }

    /// Record a successful application. A second record for the same
    /// `(owner, name)` fails with `DuplicateMigration`.
    pub fn record_run(
        &self,
        owner: &OwnerScope,
        name: &str,
        applied_at: DateTime<Utc>,
    ) -> Result<i64, StorageError> {
        self.conn
            .execute(
                "INSERT INTO migrations (ownerId, name, appliedAt) VALUES (?1, ?2, ?3)",
                params![
                    owner.owner_id(),
                    name,
                    applied_at.to_rfc3339_opts(SecondsFormat::Micros, true)
                ],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(err, _)
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    StorageError::DuplicateMigration {
                        owner: owner.to_string(),
                        name: name.to_string(),
                    }
                }
                other => StorageError::sqlite(other),
            })?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn all_run(&self, owner: &OwnerScope) -> Result<BTreeSet<String>, StorageError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT name FROM migrations WHERE ownerId IS ?1")
            .map_err(StorageError::sqlite)?;
        let rows = stmt
            .query_map(params![owner.owner_id()], |row| row.get(0))
            .map_err(StorageError::sqlite)?;
        rows.collect::<Result<BTreeSet<String>, _>>()
            .map_err(StorageError::sqlite)
    }

    /// Applied migrations, newest first.
    pub fn history(
        &self,
        owner: &OwnerScope,
        limit: Option<usize>,
    ) -> Result<Vec<MigrationRecord>, StorageError> {
        let limit = limit.map_or(-1, |l| l as i64);
        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT id, ownerId, name, appliedAt FROM migrations
                 WHERE ownerId IS ?1
                 ORDER BY appliedAt DESC, name DESC
                 LIMIT ?2",
            )
            .map_err(StorageError::sqlite)?;
        let rows = stmt
            .query_map(params![owner.owner_id(), limit], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(StorageError::sqlite)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::sqlite)?;

        rows.into_iter()
            .map(|(id, owner_id, name, applied_at)| {
                let applied_at = DateTime::parse_from_rfc3339(&applied_at)
                    .map_err(|e| StorageError::Corrupt {
                        details: format!("migration {name} has unreadable appliedAt {applied_at:?}: {e}"),
                    })?
                    .with_timezone(&Utc);
                Ok(MigrationRecord {
                    id,
                    owner: OwnerScope::from_owner_id(owner_id),
                    name,
                    applied_at,
                })
            })
            .collect()
    }

    /// Returns false when no such record existed.
    pub fn remove(&self, owner: &OwnerScope, name: &str) -> Result<bool, StorageError> {
        let n = self
            .conn
            .execute(
                "DELETE FROM migrations WHERE ownerId IS ?1 AND name = ?2",
                params![owner.owner_id(), name],
            )
            .map_err(StorageError::sqlite)?;
        Ok(n > 0)
    }

    /// Delete every record of one owner. Returns the number removed.
    pub fn clear(&self, owner: &OwnerScope) -> Result<usize, StorageError> {
        self.conn
            .execute(
                "DELETE FROM migrations WHERE ownerId IS ?1",
                params![owner.owner_id()],
            )
            .map_err(StorageError::sqlite)
    }
}
