//! The single dialect-resolution seam.
//!
//! Every DDL primitive and DML statement is rendered here; nothing above
//! the executor branches on dialect. Rendering is pure for all dialects.
//! Only SQLite statements are executed in-process.

pub mod column;
pub mod ddl;
pub mod dml;

use std::fmt;

pub use column::{ColumnDef, ColumnType, DefaultValue, ForeignKeyAction, ForeignKeyDef};
pub use ddl::DdlOp;
pub use dml::{Bindings, Condition};

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Sqlite,
    Postgres,
    Mysql,
}

impl Dialect {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
            Self::Mysql => "mysql",
        }
    }

    /// MySQL commits implicitly around every DDL statement.
    pub fn supports_transactional_ddl(&self) -> bool {
        !matches!(self, Self::Mysql)
    }

    /// Quote an identifier, doubling any embedded quote character.
    pub fn quote(&self, ident: &str) -> String {
        match self {
            Self::Mysql => format!("`{}`", ident.replace('`', "``")),
            Self::Sqlite | Self::Postgres => format!("\"{}\"", ident.replace('"', "\"\"")),
        }
    }

    /// Quote a comma-separated identifier list.
    pub fn quote_list(&self, idents: &[String]) -> String {
        idents
            .iter()
            .map(|i| self.quote(i))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Positional placeholder for the `n`th (1-based) bound value.
    pub fn placeholder(&self, n: usize) -> String {
        match self {
            Self::Sqlite => format!("?{n}"),
            Self::Postgres => format!("${n}"),
            Self::Mysql => "?".to_string(),
        }
    }

    pub fn column_type(&self, ty: &ColumnType) -> String {
        use ColumnType::*;
        match (self, ty) {
            (Self::Sqlite, PrimaryKey) => "INTEGER PRIMARY KEY AUTOINCREMENT".into(),
            (Self::Postgres, PrimaryKey) => "SERIAL PRIMARY KEY".into(),
            (Self::Mysql, PrimaryKey) => "INT NOT NULL AUTO_INCREMENT PRIMARY KEY".into(),

            (Self::Mysql, Integer) => "INT".into(),
            (_, Integer) => "INTEGER".into(),
            (_, BigInteger) => "BIGINT".into(),
            (_, SmallInteger) => "SMALLINT".into(),
            (Self::Postgres, TinyInteger) => "SMALLINT".into(),
            (_, TinyInteger) => "TINYINT".into(),

            (Self::Mysql, Boolean) => "TINYINT(1)".into(),
            (_, Boolean) => "BOOLEAN".into(),

            (Self::Postgres, Float) => "REAL".into(),
            (_, Float) => "FLOAT".into(),
            (Self::Postgres, Double) => "DOUBLE PRECISION".into(),
            (_, Double) => "DOUBLE".into(),
            (Self::Postgres, Decimal(p, s)) => format!("NUMERIC({p},{s})"),
            (_, Decimal(p, s)) => format!("DECIMAL({p},{s})"),
            (Self::Postgres, Money) => "NUMERIC(19,4)".into(),
            (_, Money) => "DECIMAL(19,4)".into(),

            (_, String(len)) => format!("VARCHAR({len})"),
            (_, Char(len)) => format!("CHAR({len})"),
            (_, Text) => "TEXT".into(),
            // SQLite has no JSON type; NUMERIC affinity would coerce "42".
            (Self::Sqlite, Json) => "TEXT".into(),
            (_, Json) => "JSON".into(),

            (Self::Postgres, DateTime) => "TIMESTAMP(0)".into(),
            (_, DateTime) => "DATETIME".into(),
            (_, Date) => "DATE".into(),
            (_, Uid) => "CHAR(36)".into(),
            (Self::Postgres, Binary) => "BYTEA".into(),
            (_, Binary) => "BLOB".into(),
        }
    }

    /// Render a literal default value.
    pub fn default_literal(&self, value: &DefaultValue) -> String {
        match value {
            DefaultValue::Null => "NULL".into(),
            DefaultValue::Integer(v) => v.to_string(),
            DefaultValue::Float(v) => v.to_string(),
            DefaultValue::Bool(v) => {
                let literal = match (self, v) {
                    (Self::Postgres, true) => "TRUE",
                    (Self::Postgres, false) => "FALSE",
                    (_, true) => "1",
                    (_, false) => "0",
                };
                literal.to_string()
            }
            DefaultValue::Text(v) => format!("'{}'", v.replace('\'', "''")),
            DefaultValue::CurrentTimestamp => "CURRENT_TIMESTAMP".into(),
        }
    }

    /// Full column definition: name, type, constraints.
    pub fn column_definition(&self, column: &ColumnDef) -> String {
        let mut sql = format!(
            "{} {}",
            self.quote(&column.name),
            self.column_type(&column.column_type)
        );
        if column.is_primary_key() {
            return sql;
        }
        if column.not_null {
            sql.push_str(" NOT NULL");
        }
        if let Some(ref default) = column.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(&self.default_literal(default));
        }
        if column.unique {
            sql.push_str(" UNIQUE");
        }
        sql
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Deterministic index name: `idx_{table}_{cols}` or `uq_{table}_{cols}`.
pub fn index_name(table: &str, columns: &[String], unique: bool) -> String {
    let prefix = if unique { "uq" } else { "idx" };
    format!("{prefix}_{table}_{}", columns.join("_"))
}

/// Deterministic foreign key name: `fk_{table}_{cols}`.
pub fn foreign_key_name(table: &str, columns: &[String]) -> String {
    format!("fk_{table}_{}", columns.join("_"))
}
