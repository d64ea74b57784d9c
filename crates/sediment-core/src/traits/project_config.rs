//! Project config store boundary.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::errors::ProjectConfigError;

/// An ordered, diff-able key-value tree persisted independently of the
/// relational schema. Paths are dot-separated (`sections.news.handle`).
pub trait ProjectConfig {
    /// Read the value at `path`.
    ///
    /// With `use_existing_value_if_available`, a pending (not yet applied)
    /// value wins over the stored one when present.
    fn get(&self, path: &str, use_existing_value_if_available: bool) -> Option<Value>;

    fn set(&mut self, path: &str, value: Value) -> Result<(), ProjectConfigError>;

    fn remove(&mut self, path: &str) -> Result<(), ProjectConfigError>;

    /// Every node (containers included) whose path and value satisfy
    /// `predicate`, keyed by path.
    fn find(&self, predicate: &dyn Fn(&str, &Value) -> bool) -> BTreeMap<String, Value>;
}
