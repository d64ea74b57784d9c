//! Schema Inspector: read-only catalog queries.
//!
//! Only connectivity errors fail; a missing table simply reports no
//! columns, indexes or keys.

use rusqlite::{params, Connection, OptionalExtension};
use sediment_core::errors::StorageError;
use sediment_core::types::ColumnKind;

use crate::dialect::{Dialect, ForeignKeyAction};

/// One physical column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
    pub kind: ColumnKind,
    pub nullable: bool,
    pub primary_key: bool,
    /// Default expression exactly as declared.
    pub default: Option<String>,
}

/// How an index came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOrigin {
    /// `CREATE INDEX`.
    Created,
    /// A `UNIQUE` table constraint.
    Unique,
    /// A `PRIMARY KEY` table constraint.
    PrimaryKey,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexInfo {
    pub name: String,
    /// Named key columns in order. Expression parts are omitted.
    pub columns: Vec<String>,
    pub unique: bool,
    pub origin: IndexOrigin,
    pub partial: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyInfo {
    pub columns: Vec<String>,
    pub ref_table: String,
    pub ref_columns: Vec<String>,
    pub on_delete: ForeignKeyAction,
    pub on_update: ForeignKeyAction,
}

/// Catalog queries against one connection.
#[derive(Clone, Copy)]
pub struct SchemaInspector<'c> {
    conn: &'c Connection,
}

impl<'c> SchemaInspector<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    pub fn table_exists(&self, table: &str) -> Result<bool, StorageError> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
                params![table],
                |row| row.get(0),
            )
            .optional()
            .map_err(StorageError::sqlite)?;
        Ok(found.is_some())
    }

    /// User tables, sorted by name.
    pub fn tables(&self) -> Result<Vec<String>, StorageError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT name FROM sqlite_master
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
                 ORDER BY name",
            )
            .map_err(StorageError::sqlite)?;
        let rows = stmt
            .query_map([], |row| row.get(0))
            .map_err(StorageError::sqlite)?;
        rows.collect::<Result<Vec<String>, _>>()
            .map_err(StorageError::sqlite)
    }

    pub fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>, StorageError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT name, type, \"notnull\", dflt_value, pk
                 FROM pragma_table_info(?1) ORDER BY cid",
            )
            .map_err(StorageError::sqlite)?;
        let rows = stmt
            .query_map(params![table], |row| {
                let declared_type: String = row.get(1)?;
                let not_null: i64 = row.get(2)?;
                let pk: i64 = row.get(4)?;
                Ok(ColumnInfo {
                    name: row.get(0)?,
                    kind: ColumnKind::from_declared_type(&declared_type),
                    declared_type,
                    nullable: not_null == 0 && pk == 0,
                    primary_key: pk > 0,
                    default: row.get(3)?,
                })
            })
            .map_err(StorageError::sqlite)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::sqlite)
    }

    pub fn get_column(&self, table: &str, column: &str) -> Result<Option<ColumnInfo>, StorageError> {
        Ok(self
            .columns(table)?
            .into_iter()
            .find(|c| c.name.eq_ignore_ascii_case(column)))
    }

    pub fn column_exists(&self, table: &str, column: &str) -> Result<bool, StorageError> {
        Ok(self.get_column(table, column)?.is_some())
    }

    pub fn indexes(&self, table: &str) -> Result<Vec<IndexInfo>, StorageError> {
        let listed: Vec<(String, bool, String, bool)> = {
            let mut stmt = self
                .conn
                .prepare("SELECT name, \"unique\", origin, partial FROM pragma_index_list(?1) ORDER BY name")
                .map_err(StorageError::sqlite)?;
            let rows = stmt
                .query_map(params![table], |row| {
                    let unique: i64 = row.get(1)?;
                    let partial: i64 = row.get(3)?;
                    Ok((row.get(0)?, unique != 0, row.get(2)?, partial != 0))
                })
                .map_err(StorageError::sqlite)?;
            rows.collect::<Result<Vec<_>, _>>()
                .map_err(StorageError::sqlite)?
        };

        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_index_info(?1) ORDER BY seqno")
            .map_err(StorageError::sqlite)?;
        let mut out = Vec::with_capacity(listed.len());
        for (name, unique, origin, partial) in listed {
            let columns = stmt
                .query_map(params![name], |row| row.get::<_, Option<String>>(0))
                .map_err(StorageError::sqlite)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(StorageError::sqlite)?
                .into_iter()
                .flatten()
                .collect();
            let origin = match origin.as_str() {
                "u" => IndexOrigin::Unique,
                "pk" => IndexOrigin::PrimaryKey,
                _ => IndexOrigin::Created,
            };
            out.push(IndexInfo {
                name,
                columns,
                unique,
                origin,
                partial,
            });
        }
        Ok(out)
    }

    /// Whether an index over exactly `columns` (in order) exists.
    pub fn index_exists(&self, table: &str, columns: &[&str], unique: bool) -> Result<bool, StorageError> {
        Ok(self.indexes(table)?.iter().any(|idx| {
            idx.unique == unique
                && idx.columns.len() == columns.len()
                && idx
                    .columns
                    .iter()
                    .zip(columns)
                    .all(|(a, b)| a.eq_ignore_ascii_case(b))
        }))
    }

    /// Whether a named index exists anywhere in the schema.
    pub fn index_name_exists(&self, name: &str) -> Result<bool, StorageError> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'index' AND name = ?1 COLLATE NOCASE",
                params![name],
                |row| row.get(0),
            )
            .optional()
            .map_err(StorageError::sqlite)?;
        Ok(found.is_some())
    }

    pub fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyInfo>, StorageError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, \"table\", \"from\", \"to\", on_update, on_delete
                 FROM pragma_foreign_key_list(?1) ORDER BY id, seq",
            )
            .map_err(StorageError::sqlite)?;
        let rows = stmt
            .query_map(params![table], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })
            .map_err(StorageError::sqlite)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::sqlite)?;

        // Composite keys arrive as one row per column sharing an id.
        let mut out: Vec<ForeignKeyInfo> = Vec::new();
        let mut last_id = None;
        for (id, ref_table, from, to, on_update, on_delete) in rows {
            if last_id != Some(id) {
                out.push(ForeignKeyInfo {
                    columns: Vec::new(),
                    ref_table,
                    ref_columns: Vec::new(),
                    on_delete: ForeignKeyAction::parse(&on_delete),
                    on_update: ForeignKeyAction::parse(&on_update),
                });
                last_id = Some(id);
            }
            if let Some(fk) = out.last_mut() {
                fk.columns.push(from);
                fk.ref_columns.push(to.unwrap_or_default());
            }
        }
        Ok(out)
    }

    pub fn foreign_key_exists(&self, table: &str, columns: &[&str]) -> Result<bool, StorageError> {
        Ok(self.foreign_keys(table)?.iter().any(|fk| {
            fk.columns.len() == columns.len()
                && fk
                    .columns
                    .iter()
                    .zip(columns)
                    .all(|(a, b)| a.eq_ignore_ascii_case(b))
        }))
    }

    /// Tables other than `table` holding a foreign key into it.
    pub fn referencing_tables(&self, table: &str) -> Result<Vec<String>, StorageError> {
        let mut out = Vec::new();
        for other in self.tables()? {
            if other.eq_ignore_ascii_case(table) {
                continue;
            }
            if self
                .foreign_keys(&other)?
                .iter()
                .any(|fk| fk.ref_table.eq_ignore_ascii_case(table))
            {
                out.push(other);
            }
        }
        Ok(out)
    }

    pub fn row_count(&self, table: &str) -> Result<u64, StorageError> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.dialect().quote(table));
        let n: i64 = self
            .conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(StorageError::sqlite)?;
        Ok(n as u64)
    }

    pub fn is_empty(&self, table: &str) -> Result<bool, StorageError> {
        let sql = format!("SELECT EXISTS (SELECT 1 FROM {})", self.dialect().quote(table));
        let any: bool = self
            .conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(StorageError::sqlite)?;
        Ok(!any)
    }

    /// The stored `CREATE ...` statement for a table or index.
    pub(crate) fn object_sql(&self, name: &str) -> Result<Option<String>, StorageError> {
        self.conn
            .query_row(
                "SELECT sql FROM sqlite_master WHERE name = ?1 COLLATE NOCASE",
                params![name],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()
            .map(Option::flatten)
            .map_err(StorageError::sqlite)
    }

    /// `CREATE TRIGGER` statements attached to `table`, in creation order.
    pub fn trigger_sql(&self, table: &str) -> Result<Vec<String>, StorageError> {
        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT sql FROM sqlite_master
                 WHERE type = 'trigger' AND tbl_name = ?1 COLLATE NOCASE AND sql IS NOT NULL
                 ORDER BY rowid",
            )
            .map_err(StorageError::sqlite)?;
        let rows = stmt
            .query_map(params![table], |row| row.get(0))
            .map_err(StorageError::sqlite)?;
        rows.collect::<Result<Vec<String>, _>>()
            .map_err(StorageError::sqlite)
    }
}
