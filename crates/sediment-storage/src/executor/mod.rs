//! DDL/DML Executor: one method per primitive, dialect resolved inside.
//!
//! Errors from the database are never swallowed. The `*_if_*` variants
//! exist so migrations can be re-run after a partial, non-transactional
//! failure.

mod rebuild;

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use sediment_core::errors::StorageError;

use self::rebuild::{rebuild_table, TableChange};
use crate::dialect::{Bindings, ColumnDef, Condition, DdlOp, Dialect, ForeignKeyDef};
use crate::schema::{IndexOrigin, SchemaInspector};

/// Issues dialect-neutral schema and data changes on one connection.
#[derive(Clone, Copy)]
pub struct Executor<'c> {
    conn: &'c Connection,
    dialect: Dialect,
}

impl<'c> Executor<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self {
            conn,
            dialect: Dialect::Sqlite,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn inspector(&self) -> SchemaInspector<'c> {
        SchemaInspector::new(self.conn)
    }

    pub fn connection(&self) -> &'c Connection {
        self.conn
    }

    fn execute(&self, op: &DdlOp) -> Result<(), StorageError> {
        for sql in self.dialect.render(op)? {
            tracing::debug!(op = op.label(), sql = %sql, "execute");
            self.conn
                .execute_batch(&sql)
                .map_err(|e| StorageError::Sqlite {
                    message: format!("{} failed: {e}", op.label()),
                })?;
        }
        Ok(())
    }

    /// Render natively, or rebuild the table when the dialect cannot.
    fn execute_or_rebuild(
        &self,
        op: &DdlOp,
        table: &str,
        change: TableChange<'_>,
    ) -> Result<(), StorageError> {
        match self.dialect.render(op) {
            Err(StorageError::Unsupported { .. }) if self.dialect == Dialect::Sqlite => {
                rebuild_table(self.conn, table, change)
            }
            Err(e) => Err(e),
            Ok(_) => self.execute(op),
        }
    }

    // ---- tables ----

    pub fn create_table(
        &self,
        table: &str,
        columns: Vec<ColumnDef>,
        options: Option<&str>,
    ) -> Result<(), StorageError> {
        self.execute(&DdlOp::CreateTable {
            table: table.to_string(),
            columns,
            foreign_keys: Vec::new(),
            options: options.map(str::to_string),
            if_not_exists: false,
        })
    }

    /// Returns false when the table already existed.
    pub fn create_table_if_not_exists(
        &self,
        table: &str,
        columns: Vec<ColumnDef>,
        options: Option<&str>,
    ) -> Result<bool, StorageError> {
        if self.inspector().table_exists(table)? {
            return Ok(false);
        }
        self.create_table(table, columns, options)?;
        Ok(true)
    }

    pub fn drop_table(&self, table: &str) -> Result<(), StorageError> {
        self.execute(&DdlOp::DropTable {
            table: table.to_string(),
            if_exists: false,
        })
    }

    pub fn drop_table_if_exists(&self, table: &str) -> Result<(), StorageError> {
        self.execute(&DdlOp::DropTable {
            table: table.to_string(),
            if_exists: true,
        })
    }

    pub fn rename_table(&self, from: &str, to: &str) -> Result<(), StorageError> {
        self.execute(&DdlOp::RenameTable {
            from: from.to_string(),
            to: to.to_string(),
        })
    }

    // ---- columns ----

    pub fn add_column(&self, table: &str, column: ColumnDef) -> Result<(), StorageError> {
        let op = DdlOp::AddColumn {
            table: table.to_string(),
            column: column.clone(),
        };
        self.execute_or_rebuild(&op, table, TableChange::AddColumn(&column))
    }

    /// Returns false when the column already existed.
    pub fn add_column_if_missing(&self, table: &str, column: ColumnDef) -> Result<bool, StorageError> {
        if self.inspector().column_exists(table, &column.name)? {
            return Ok(false);
        }
        self.add_column(table, column)?;
        Ok(true)
    }

    pub fn alter_column(&self, table: &str, column: ColumnDef) -> Result<(), StorageError> {
        let op = DdlOp::AlterColumn {
            table: table.to_string(),
            column: column.clone(),
        };
        self.execute_or_rebuild(&op, table, TableChange::AlterColumn(&column))
    }

    pub fn drop_column(&self, table: &str, column: &str) -> Result<(), StorageError> {
        let op = DdlOp::DropColumn {
            table: table.to_string(),
            column: column.to_string(),
        };
        // SQLite refuses DROP COLUMN on indexed or constrained columns.
        if self.dialect == Dialect::Sqlite {
            let inspector = self.inspector();
            let mentions = |cols: &[String]| cols.iter().any(|c| c.eq_ignore_ascii_case(column));
            let constrained = inspector.indexes(table)?.iter().any(|i| mentions(&i.columns))
                || inspector.foreign_keys(table)?.iter().any(|fk| mentions(&fk.columns));
            if constrained {
                return rebuild_table(self.conn, table, TableChange::DropColumn(column));
            }
        }
        self.execute(&op)
    }

    /// Returns false when the column did not exist.
    pub fn drop_column_if_exists(&self, table: &str, column: &str) -> Result<bool, StorageError> {
        if !self.inspector().column_exists(table, column)? {
            return Ok(false);
        }
        self.drop_column(table, column)?;
        Ok(true)
    }

    pub fn rename_column(&self, table: &str, from: &str, to: &str) -> Result<(), StorageError> {
        self.execute(&DdlOp::RenameColumn {
            table: table.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        })
    }

    // ---- indexes ----

    pub fn create_index(&self, table: &str, columns: &[&str], unique: bool) -> Result<(), StorageError> {
        self.execute(&DdlOp::CreateIndex {
            table: table.to_string(),
            columns: to_strings(columns),
            unique,
        })
    }

    /// Returns false when an equivalent index already existed.
    pub fn create_index_if_missing(
        &self,
        table: &str,
        columns: &[&str],
        unique: bool,
    ) -> Result<bool, StorageError> {
        if self.inspector().index_exists(table, columns, unique)? {
            return Ok(false);
        }
        self.create_index(table, columns, unique)?;
        Ok(true)
    }

    /// Drop the index over exactly `columns`, whatever it is named.
    pub fn drop_index(&self, table: &str, columns: &[&str], unique: bool) -> Result<(), StorageError> {
        if !self.drop_index_if_exists(table, columns, unique)? {
            return Err(StorageError::NotFound {
                what: format!("index on {table} ({})", columns.join(", ")),
            });
        }
        Ok(())
    }

    /// Returns false when no matching index existed.
    pub fn drop_index_if_exists(
        &self,
        table: &str,
        columns: &[&str],
        unique: bool,
    ) -> Result<bool, StorageError> {
        let found = self.inspector().indexes(table)?.into_iter().find(|idx| {
            idx.origin == IndexOrigin::Created
                && idx.unique == unique
                && idx.columns.len() == columns.len()
                && idx
                    .columns
                    .iter()
                    .zip(columns)
                    .all(|(a, b)| a.eq_ignore_ascii_case(b))
        });
        let Some(idx) = found else {
            return Ok(false);
        };
        self.execute(&DdlOp::DropIndex {
            table: table.to_string(),
            name: idx.name,
        })?;
        Ok(true)
    }

    // ---- foreign keys ----

    pub fn add_foreign_key(&self, fk: ForeignKeyDef) -> Result<(), StorageError> {
        let op = DdlOp::AddForeignKey(fk.clone());
        self.execute_or_rebuild(&op, &fk.table, TableChange::AddForeignKey(&fk))
    }

    pub fn drop_foreign_key(&self, table: &str, columns: &[&str]) -> Result<(), StorageError> {
        let columns = to_strings(columns);
        let op = DdlOp::DropForeignKey {
            table: table.to_string(),
            columns: columns.clone(),
        };
        self.execute_or_rebuild(&op, table, TableChange::DropForeignKey(&columns))
    }

    /// Returns false when no foreign key covered `columns`.
    pub fn drop_foreign_key_if_exists(&self, table: &str, columns: &[&str]) -> Result<bool, StorageError> {
        if !self.inspector().foreign_key_exists(table, columns)? {
            return Ok(false);
        }
        self.drop_foreign_key(table, columns)?;
        Ok(true)
    }

    // ---- data ----

    /// Insert one row and return its rowid.
    pub fn insert(&self, table: &str, values: &[(&str, Value)]) -> Result<i64, StorageError> {
        let columns: Vec<String> = values.iter().map(|(c, _)| c.to_string()).collect();
        let sql = self.dialect.insert_sql(table, &columns);
        self.conn
            .execute(&sql, params_from_iter(values.iter().map(|(_, v)| v)))
            .map_err(StorageError::sqlite)?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Returns the number of rows changed.
    pub fn update(
        &self,
        table: &str,
        values: &[(&str, Value)],
        conditions: &[Condition],
    ) -> Result<usize, StorageError> {
        let values: Vec<(String, Value)> = values
            .iter()
            .map(|(c, v)| (c.to_string(), v.clone()))
            .collect();
        let mut bindings = Bindings::new(self.dialect);
        let sql = self.dialect.update_sql(table, &values, conditions, &mut bindings);
        self.conn
            .execute(&sql, params_from_iter(bindings.values()))
            .map_err(StorageError::sqlite)
    }

    /// Returns the number of rows deleted.
    pub fn delete(&self, table: &str, conditions: &[Condition]) -> Result<usize, StorageError> {
        let mut bindings = Bindings::new(self.dialect);
        let sql = self.dialect.delete_sql(table, conditions, &mut bindings);
        self.conn
            .execute(&sql, params_from_iter(bindings.values()))
            .map_err(StorageError::sqlite)
    }

    /// Insert many rows through one prepared statement.
    pub fn batch_insert(
        &self,
        table: &str,
        columns: &[&str],
        rows: &[Vec<Value>],
    ) -> Result<usize, StorageError> {
        let columns = to_strings(columns);
        let sql = self.dialect.insert_sql(table, &columns);
        let mut stmt = self.conn.prepare(&sql).map_err(StorageError::sqlite)?;
        let mut inserted = 0;
        for row in rows {
            if row.len() != columns.len() {
                return Err(StorageError::Sqlite {
                    message: format!(
                        "batch insert into {table}: row has {} values for {} columns",
                        row.len(),
                        columns.len()
                    ),
                });
            }
            inserted += stmt
                .execute(params_from_iter(row.iter()))
                .map_err(StorageError::sqlite)?;
        }
        Ok(inserted)
    }

    /// Escape hatch for dialect-specific SQL. May hold several statements.
    pub fn execute_raw(&self, sql: &str) -> Result<(), StorageError> {
        tracing::debug!(sql = %sql, "execute raw");
        self.conn.execute_batch(sql).map_err(StorageError::sqlite)
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
