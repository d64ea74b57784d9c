//! DDL primitives and their per-dialect rendering.

use sediment_core::errors::StorageError;

use super::column::{ColumnDef, ForeignKeyDef};
use super::{foreign_key_name, index_name, Dialect};

/// One schema change, expressed without reference to a dialect.
#[derive(Debug, Clone, PartialEq)]
pub enum DdlOp {
    CreateTable {
        table: String,
        columns: Vec<ColumnDef>,
        foreign_keys: Vec<ForeignKeyDef>,
        /// Raw trailing table options (`ENGINE=InnoDB`, `STRICT`, ...).
        options: Option<String>,
        if_not_exists: bool,
    },
    DropTable {
        table: String,
        if_exists: bool,
    },
    RenameTable {
        from: String,
        to: String,
    },
    AddColumn {
        table: String,
        column: ColumnDef,
    },
    AlterColumn {
        table: String,
        column: ColumnDef,
    },
    DropColumn {
        table: String,
        column: String,
    },
    RenameColumn {
        table: String,
        from: String,
        to: String,
    },
    CreateIndex {
        table: String,
        columns: Vec<String>,
        unique: bool,
    },
    /// Indexes are dropped by their catalog name.
    DropIndex {
        table: String,
        name: String,
    },
    AddForeignKey(ForeignKeyDef),
    DropForeignKey {
        table: String,
        columns: Vec<String>,
    },
}

impl DdlOp {
    /// Short operation name used in logs and `Unsupported` errors.
    pub fn label(&self) -> &'static str {
        match self {
            Self::CreateTable { .. } => "create table",
            Self::DropTable { .. } => "drop table",
            Self::RenameTable { .. } => "rename table",
            Self::AddColumn { .. } => "add column",
            Self::AlterColumn { .. } => "alter column",
            Self::DropColumn { .. } => "drop column",
            Self::RenameColumn { .. } => "rename column",
            Self::CreateIndex { .. } => "create index",
            Self::DropIndex { .. } => "drop index",
            Self::AddForeignKey(_) => "add foreign key",
            Self::DropForeignKey { .. } => "drop foreign key",
        }
    }
}

impl Dialect {
    /// Render `op` as one or more statements.
    ///
    /// SQLite cannot alter columns or add/drop constraints in place; those
    /// return `Unsupported` and the executor rebuilds the table instead.
    pub fn render(&self, op: &DdlOp) -> Result<Vec<String>, StorageError> {
        let q = |ident: &str| self.quote(ident);
        let sql = match op {
            DdlOp::CreateTable {
                table,
                columns,
                foreign_keys,
                options,
                if_not_exists,
            } => {
                let mut parts: Vec<String> =
                    columns.iter().map(|c| self.column_definition(c)).collect();
                parts.extend(foreign_keys.iter().map(|fk| self.foreign_key_clause(fk)));
                let mut sql = format!(
                    "CREATE TABLE {}{} (\n    {}\n)",
                    if *if_not_exists { "IF NOT EXISTS " } else { "" },
                    q(table),
                    parts.join(",\n    ")
                );
                if let Some(options) = options.as_deref().filter(|o| !o.trim().is_empty()) {
                    sql.push(' ');
                    sql.push_str(options.trim());
                }
                vec![sql]
            }
            DdlOp::DropTable { table, if_exists } => vec![format!(
                "DROP TABLE {}{}",
                if *if_exists { "IF EXISTS " } else { "" },
                q(table)
            )],
            DdlOp::RenameTable { from, to } => match self {
                Self::Mysql => vec![format!("RENAME TABLE {} TO {}", q(from), q(to))],
                _ => vec![format!("ALTER TABLE {} RENAME TO {}", q(from), q(to))],
            },
            DdlOp::AddColumn { table, column } => {
                if *self == Self::Sqlite
                    && (column.unique
                        || column.is_primary_key()
                        || (column.not_null && column.default.is_none()))
                {
                    return Err(self.unsupported(op));
                }
                vec![format!(
                    "ALTER TABLE {} ADD COLUMN {}",
                    q(table),
                    self.column_definition(column)
                )]
            }
            DdlOp::AlterColumn { table, column } => match self {
                Self::Sqlite => return Err(self.unsupported(op)),
                Self::Mysql => vec![format!(
                    "ALTER TABLE {} MODIFY COLUMN {}",
                    q(table),
                    self.column_definition(column)
                )],
                Self::Postgres => {
                    let prefix = format!("ALTER TABLE {} ALTER COLUMN {}", q(table), q(&column.name));
                    let mut stmts = vec![format!(
                        "{prefix} TYPE {}",
                        self.column_type(&column.column_type)
                    )];
                    stmts.push(if column.not_null {
                        format!("{prefix} SET NOT NULL")
                    } else {
                        format!("{prefix} DROP NOT NULL")
                    });
                    stmts.push(match column.default {
                        Some(ref d) => format!("{prefix} SET DEFAULT {}", self.default_literal(d)),
                        None => format!("{prefix} DROP DEFAULT"),
                    });
                    stmts
                }
            },
            DdlOp::DropColumn { table, column } => {
                vec![format!("ALTER TABLE {} DROP COLUMN {}", q(table), q(column))]
            }
            DdlOp::RenameColumn { table, from, to } => vec![format!(
                "ALTER TABLE {} RENAME COLUMN {} TO {}",
                q(table),
                q(from),
                q(to)
            )],
            DdlOp::CreateIndex {
                table,
                columns,
                unique,
            } => vec![format!(
                "CREATE {}INDEX {} ON {} ({})",
                if *unique { "UNIQUE " } else { "" },
                q(&index_name(table, columns, *unique)),
                q(table),
                self.quote_list(columns)
            )],
            DdlOp::DropIndex { table, name } => {
                let name = q(name);
                match self {
                    Self::Mysql => vec![format!("DROP INDEX {name} ON {}", q(table))],
                    _ => vec![format!("DROP INDEX {name}")],
                }
            }
            DdlOp::AddForeignKey(fk) => match self {
                Self::Sqlite => return Err(self.unsupported(op)),
                _ => vec![format!(
                    "ALTER TABLE {} ADD {}",
                    q(&fk.table),
                    self.foreign_key_clause(fk)
                )],
            },
            DdlOp::DropForeignKey { table, columns } => {
                let name = q(&foreign_key_name(table, columns));
                match self {
                    Self::Sqlite => return Err(self.unsupported(op)),
                    Self::Mysql => vec![format!("ALTER TABLE {} DROP FOREIGN KEY {name}", q(table))],
                    Self::Postgres => vec![format!("ALTER TABLE {} DROP CONSTRAINT {name}", q(table))],
                }
            }
        };
        Ok(sql)
    }

    /// `CONSTRAINT fk_.. FOREIGN KEY (..) REFERENCES ..(..) [ON DELETE ..] [ON UPDATE ..]`
    pub fn foreign_key_clause(&self, fk: &ForeignKeyDef) -> String {
        let mut sql = format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            self.quote(&foreign_key_name(&fk.table, &fk.columns)),
            self.quote_list(&fk.columns),
            self.quote(&fk.ref_table),
            self.quote_list(&fk.ref_columns)
        );
        if let Some(action) = fk.on_delete {
            sql.push_str(" ON DELETE ");
            sql.push_str(action.as_sql());
        }
        if let Some(action) = fk.on_update {
            sql.push_str(" ON UPDATE ");
            sql.push_str(action.as_sql());
        }
        sql
    }

    fn unsupported(&self, op: &DdlOp) -> StorageError {
        StorageError::Unsupported {
            dialect: self.name().to_string(),
            operation: op.label().to_string(),
        }
    }
}
