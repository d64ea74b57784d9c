//! Domain types shared by every crate in the workspace.

pub mod field;
pub mod identifier;
pub mod migration;

pub use field::{field_column, ColumnKind, FieldDescriptor, FieldKind, FieldLayout};
pub use identifier::is_identifier;
pub use migration::{MigrationName, MigrationRecord, OwnerScope};
