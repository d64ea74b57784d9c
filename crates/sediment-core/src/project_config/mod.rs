//! Reference project config store.

pub mod tree;

pub use tree::{flatten, unflatten, ConfigChange, ProjectConfigTree};
