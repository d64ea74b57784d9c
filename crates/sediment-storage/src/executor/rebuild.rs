//! SQLite table rebuild for changes ALTER TABLE cannot express.
//!
//! Create a shadow table with the changed shape, copy rows, drop the
//! original, rename the shadow, then recreate the original's indexes and
//! triggers.
//!
//! Column definitions are regenerated from `pragma_table_info`, so only
//! type, NOT NULL, DEFAULT, primary key, UNIQUE and foreign keys survive.
//! Column COLLATE clauses, CHECK constraints and generated columns are
//! not carried over.

use rusqlite::Connection;
use sediment_core::errors::StorageError;

use crate::connection::pragmas::foreign_keys_enabled;
use crate::connection::writer::with_immediate_transaction;
use crate::dialect::{ColumnDef, Dialect, ForeignKeyDef};
use crate::schema::{ColumnInfo, IndexOrigin, SchemaInspector};

/// The one change applied while rebuilding.
#[derive(Debug, Clone, Copy)]
pub(crate) enum TableChange<'a> {
    AddColumn(&'a ColumnDef),
    AlterColumn(&'a ColumnDef),
    DropColumn(&'a str),
    AddForeignKey(&'a ForeignKeyDef),
    DropForeignKey(&'a [String]),
}

pub(crate) fn rebuild_table(
    conn: &Connection,
    table: &str,
    change: TableChange<'_>,
) -> Result<(), StorageError> {
    let inspector = SchemaInspector::new(conn);
    let columns = inspector.columns(table)?;
    if columns.is_empty() {
        return Err(StorageError::NotFound {
            what: format!("table {table}"),
        });
    }

    let plan = plan_rebuild(&inspector, table, &columns, change)?;

    let fk_on = foreign_keys_enabled(conn)?;
    let in_tx = !conn.is_autocommit();
    if fk_on && in_tx && !inspector.referencing_tables(table)?.is_empty() {
        // DROP TABLE would cascade into child rows and foreign_keys
        // cannot be switched off inside a transaction.
        return Err(StorageError::Unsupported {
            dialect: Dialect::Sqlite.name().to_string(),
            operation: format!("rebuilding referenced table {table} inside a transaction"),
        });
    }

    tracing::debug!(table = table, "rebuilding table");

    if !in_tx {
        if fk_on {
            set_foreign_keys(conn, false)?;
        }
        let result = with_immediate_transaction(conn, |tx| {
            apply_plan(tx, table, &plan)?;
            if fk_on {
                check_foreign_keys(tx, table)?;
            }
            Ok::<_, StorageError>(())
        });
        if fk_on {
            set_foreign_keys(conn, true)?;
        }
        return result;
    }

    apply_plan(conn, table, &plan)?;
    if fk_on {
        check_foreign_keys(conn, table)?;
    }
    Ok(())
}

struct RebuildPlan {
    create_sql: String,
    shadow: String,
    copy_columns: Vec<String>,
    index_sql: Vec<String>,
    trigger_sql: Vec<String>,
}

fn plan_rebuild(
    inspector: &SchemaInspector<'_>,
    table: &str,
    columns: &[ColumnInfo],
    change: TableChange<'_>,
) -> Result<RebuildPlan, StorageError> {
    let dialect = Dialect::Sqlite;
    let autoincrement = inspector
        .object_sql(table)?
        .is_some_and(|sql| sql.to_ascii_uppercase().contains("AUTOINCREMENT"));
    let pk_count = columns.iter().filter(|c| c.primary_key).count();

    let mut defs: Vec<(String, String)> = columns
        .iter()
        .map(|c| (c.name.clone(), existing_definition(c, pk_count == 1, autoincrement)))
        .collect();
    let mut copy_columns: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
    let mut foreign_keys: Vec<ForeignKeyDef> = inspector
        .foreign_keys(table)?
        .into_iter()
        .map(|fk| ForeignKeyDef {
            table: table.to_string(),
            columns: fk.columns,
            ref_table: fk.ref_table,
            ref_columns: fk.ref_columns,
            on_delete: Some(fk.on_delete),
            on_update: Some(fk.on_update),
        })
        .collect();
    let mut indexes = inspector.indexes(table)?;

    let position = |defs: &[(String, String)], name: &str| {
        defs.iter().position(|(n, _)| n.eq_ignore_ascii_case(name))
    };
    let missing_column = |name: &str| StorageError::NotFound {
        what: format!("column {table}.{name}"),
    };

    match change {
        TableChange::AddColumn(def) => {
            if position(&defs, &def.name).is_some() {
                return Err(StorageError::Sqlite {
                    message: format!("duplicate column name: {}", def.name),
                });
            }
            if def.is_primary_key() {
                return Err(StorageError::Unsupported {
                    dialect: dialect.name().to_string(),
                    operation: "add primary key column".to_string(),
                });
            }
            defs.push((def.name.clone(), dialect.column_definition(def)));
        }
        TableChange::AlterColumn(def) => {
            let i = position(&defs, &def.name).ok_or_else(|| missing_column(&def.name))?;
            defs[i].1 = dialect.column_definition(def);
            if def.unique {
                indexes.retain(|idx| {
                    !(idx.origin == IndexOrigin::Unique
                        && idx.columns.len() == 1
                        && idx.columns[0].eq_ignore_ascii_case(&def.name))
                });
            }
        }
        TableChange::DropColumn(name) => {
            let i = position(&defs, name).ok_or_else(|| missing_column(name))?;
            defs.remove(i);
            copy_columns.retain(|c| !c.eq_ignore_ascii_case(name));
            foreign_keys.retain(|fk| !fk.columns.iter().any(|c| c.eq_ignore_ascii_case(name)));
            indexes.retain(|idx| !idx.columns.iter().any(|c| c.eq_ignore_ascii_case(name)));
        }
        TableChange::AddForeignKey(fk) => {
            foreign_keys.push(ForeignKeyDef {
                table: table.to_string(),
                ..fk.clone()
            });
        }
        TableChange::DropForeignKey(cols) => {
            let before = foreign_keys.len();
            foreign_keys.retain(|fk| {
                !(fk.columns.len() == cols.len()
                    && fk.columns.iter().zip(cols).all(|(a, b)| a.eq_ignore_ascii_case(b)))
            });
            if foreign_keys.len() == before {
                return Err(StorageError::NotFound {
                    what: format!("foreign key on {table} ({})", cols.join(", ")),
                });
            }
        }
    }

    let mut parts: Vec<String> = defs.into_iter().map(|(_, d)| d).collect();
    if pk_count > 1 {
        let pk: Vec<String> = columns
            .iter()
            .filter(|c| c.primary_key && copy_columns.contains(&c.name))
            .map(|c| c.name.clone())
            .collect();
        parts.push(format!("PRIMARY KEY ({})", dialect.quote_list(&pk)));
    }
    for idx in indexes.iter().filter(|i| i.origin == IndexOrigin::Unique) {
        parts.push(format!("UNIQUE ({})", dialect.quote_list(&idx.columns)));
    }
    parts.extend(foreign_keys.iter().map(|fk| dialect.foreign_key_clause(fk)));

    let shadow = format!("{table}__rebuild");
    let create_sql = format!(
        "CREATE TABLE {} (\n    {}\n)",
        dialect.quote(&shadow),
        parts.join(",\n    ")
    );

    let mut index_sql = Vec::new();
    for idx in indexes.iter().filter(|i| i.origin == IndexOrigin::Created) {
        if let Some(sql) = inspector.object_sql(&idx.name)? {
            index_sql.push(sql);
        }
    }

    Ok(RebuildPlan {
        create_sql,
        shadow,
        copy_columns,
        index_sql,
        trigger_sql: inspector.trigger_sql(table)?,
    })
}

fn apply_plan(conn: &Connection, table: &str, plan: &RebuildPlan) -> Result<(), StorageError> {
    let d = Dialect::Sqlite;
    let cols = d.quote_list(&plan.copy_columns);
    let statements = [
        plan.create_sql.clone(),
        format!(
            "INSERT INTO {} ({cols}) SELECT {cols} FROM {}",
            d.quote(&plan.shadow),
            d.quote(table)
        ),
        format!("DROP TABLE {}", d.quote(table)),
        format!("ALTER TABLE {} RENAME TO {}", d.quote(&plan.shadow), d.quote(table)),
    ];
    // Triggers go with the dropped table; recreate them once it is renamed back.
    for sql in statements
        .iter()
        .chain(plan.index_sql.iter())
        .chain(plan.trigger_sql.iter())
    {
        conn.execute_batch(sql).map_err(|e| StorageError::Sqlite {
            message: format!("rebuild of {table} failed: {e}"),
        })?;
    }
    Ok(())
}

/// Reconstruct a column definition from catalog metadata.
fn existing_definition(column: &ColumnInfo, single_pk: bool, autoincrement: bool) -> String {
    let d = Dialect::Sqlite;
    let mut sql = d.quote(&column.name);
    if !column.declared_type.is_empty() {
        sql.push(' ');
        sql.push_str(&column.declared_type);
    }
    if column.primary_key && single_pk {
        sql.push_str(" PRIMARY KEY");
        if autoincrement {
            sql.push_str(" AUTOINCREMENT");
        }
    }
    if !column.nullable && !column.primary_key {
        sql.push_str(" NOT NULL");
    }
    if let Some(ref default) = column.default {
        sql.push_str(&format!(" DEFAULT ({default})"));
    }
    sql
}

fn set_foreign_keys(conn: &Connection, on: bool) -> Result<(), StorageError> {
    conn.pragma_update(None, "foreign_keys", on)
        .map_err(StorageError::sqlite)
}

fn check_foreign_keys(conn: &Connection, table: &str) -> Result<(), StorageError> {
    let sql = format!("PRAGMA foreign_key_check({})", Dialect::Sqlite.quote(table));
    let mut stmt = conn.prepare(&sql).map_err(StorageError::sqlite)?;
    let violated = stmt.exists([]).map_err(StorageError::sqlite)?;
    if violated {
        return Err(StorageError::Sqlite {
            message: format!("FOREIGN KEY constraint failed after rebuilding {table}"),
        });
    }
    Ok(())
}
