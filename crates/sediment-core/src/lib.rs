//! # sediment-core
//!
//! Foundation crate for the Sediment migration engine.
//! Defines types, traits, errors, config, tracing setup and the
//! reference project config tree. Every other crate depends on this.

pub mod config;
pub mod constants;
pub mod errors;
pub mod project_config;
pub mod tracing;
pub mod traits;
pub mod types;

pub use config::SedimentConfig;
pub use errors::{ContentError, MigrationError, StorageError};
pub use types::{FieldDescriptor, FieldKind, FieldLayout, MigrationName, OwnerScope};
