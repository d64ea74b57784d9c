//! # sediment-storage
//!
//! SQLite persistence for the Sediment migration engine.
//!
//! ## Modules
//!
//! - `connection`: `DatabaseManager`, pragmas, BEGIN IMMEDIATE writes
//! - `bootstrap`: internal schema versioned by `PRAGMA user_version`
//! - `schema`: read-only catalog inspection
//! - `dialect`: SQLite/PostgreSQL/MySQL DDL and DML rendering
//! - `executor`: DDL/DML against the live connection, with table rebuilds
//! - `records`: the Migration Record Store
//! - `runner`: migration registry, contract and runner
//! - `content`: the Content Refactor Engine
//! - `project_config`: persisted project config tree

pub mod bootstrap;
pub mod connection;
pub mod content;
pub mod dialect;
pub mod executor;
pub mod project_config;
pub mod records;
pub mod runner;
pub mod schema;

pub use connection::DatabaseManager;
pub use content::{ContentMigrationSummary, ContentRefactor, ElementLabels, ElementSelection, QuerySpec};
pub use dialect::{ColumnDef, ColumnType, Condition, Dialect, ForeignKeyDef};
pub use executor::Executor;
pub use records::MigrationRecordStore;
pub use runner::{Migration, MigrationContext, MigrationRunner, MigrationSet, RunReport, RunnerOptions};
pub use schema::SchemaInspector;
