//! In-memory project config: a stored (applied) tree and a pending tree.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::errors::ProjectConfigError;
use crate::traits::ProjectConfig;

/// One leaf-level difference between the stored and pending trees.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigChange {
    pub path: String,
    pub old: Option<Value>,
    pub new: Option<Value>,
}

/// Reference `ProjectConfig` implementation.
///
/// `set`/`remove` only touch the pending tree; `apply` promotes it.
/// Removing a key prunes parents left empty by the removal.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectConfigTree {
    stored: Value,
    pending: Value,
}

impl Default for ProjectConfigTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectConfigTree {
    pub fn new() -> Self {
        Self {
            stored: Value::Object(Map::new()),
            pending: Value::Object(Map::new()),
        }
    }

    /// Start from an already-applied tree.
    pub fn from_stored(stored: Value) -> Self {
        let stored = match stored {
            Value::Object(_) => stored,
            _ => Value::Object(Map::new()),
        };
        Self {
            pending: stored.clone(),
            stored,
        }
    }

    pub fn stored(&self) -> &Value {
        &self.stored
    }

    pub fn pending(&self) -> &Value {
        &self.pending
    }

    pub fn is_dirty(&self) -> bool {
        self.stored != self.pending
    }

    /// Leaf-level changes, sorted by path.
    pub fn diff(&self) -> Vec<ConfigChange> {
        let old = flatten(&self.stored);
        let new = flatten(&self.pending);
        let mut paths: Vec<&String> = old.keys().chain(new.keys()).collect();
        paths.sort();
        paths.dedup();
        paths
            .into_iter()
            .filter_map(|path| {
                let (o, n) = (old.get(path), new.get(path));
                (o != n).then(|| ConfigChange {
                    path: path.clone(),
                    old: o.cloned(),
                    new: n.cloned(),
                })
            })
            .collect()
    }

    /// Promote the pending tree to stored.
    pub fn apply(&mut self) -> Vec<ConfigChange> {
        let changes = self.diff();
        self.stored = self.pending.clone();
        changes
    }

    /// Drop pending changes.
    pub fn discard(&mut self) {
        self.pending = self.stored.clone();
    }

    /// Render the pending tree as YAML, the environment-portable file form.
    pub fn to_yaml(&self) -> Result<String, ProjectConfigError> {
        serde_yaml::to_string(&self.pending).map_err(|e| ProjectConfigError::Serialize {
            message: e.to_string(),
        })
    }

    /// Replace the pending tree with a YAML document.
    pub fn load_yaml(&mut self, yaml: &str) -> Result<(), ProjectConfigError> {
        let value: Value = serde_yaml::from_str(yaml).map_err(|e| ProjectConfigError::Serialize {
            message: e.to_string(),
        })?;
        self.pending = match value {
            Value::Object(_) => value,
            Value::Null => Value::Object(Map::new()),
            _ => {
                return Err(ProjectConfigError::Serialize {
                    message: "project config root must be a mapping".to_string(),
                })
            }
        };
        Ok(())
    }
}

impl ProjectConfig for ProjectConfigTree {
    fn get(&self, path: &str, use_existing_value_if_available: bool) -> Option<Value> {
        let segments = split_path(path).ok()?;
        if use_existing_value_if_available {
            if let Some(v) = lookup(&self.pending, &segments) {
                return Some(v.clone());
            }
        }
        lookup(&self.stored, &segments).cloned()
    }

    fn set(&mut self, path: &str, value: Value) -> Result<(), ProjectConfigError> {
        let segments = split_path(path)?;
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| ProjectConfigError::InvalidPath {
                path: path.to_string(),
            })?;

        let mut node = &mut self.pending;
        for segment in parents {
            let map = node
                .as_object_mut()
                .ok_or_else(|| ProjectConfigError::NotAContainer {
                    path: path.to_string(),
                })?;
            node = map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if node.is_null() {
                *node = Value::Object(Map::new());
            }
        }
        let map = node
            .as_object_mut()
            .ok_or_else(|| ProjectConfigError::NotAContainer {
                path: path.to_string(),
            })?;
        map.insert(last.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, path: &str) -> Result<(), ProjectConfigError> {
        let segments = split_path(path)?;
        remove_and_prune(&mut self.pending, &segments);
        Ok(())
    }

    fn find(&self, predicate: &dyn Fn(&str, &Value) -> bool) -> BTreeMap<String, Value> {
        let mut found = BTreeMap::new();
        walk(&self.pending, "", &mut |path, value| {
            if predicate(path, value) {
                found.insert(path.to_string(), value.clone());
            }
        });
        found
    }
}

/// Flatten a tree into `dot.path -> leaf` pairs. Empty mappings are kept
/// as leaves so they survive a flatten/unflatten cycle.
pub fn flatten(value: &Value) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();
    if let Value::Object(map) = value {
        for (key, child) in map {
            flatten_into(child, key.clone(), &mut out);
        }
    }
    out
}

fn flatten_into(value: &Value, path: String, out: &mut BTreeMap<String, Value>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                flatten_into(child, format!("{path}.{key}"), out);
            }
        }
        _ => {
            out.insert(path, value.clone());
        }
    }
}

/// Inverse of [`flatten`].
pub fn unflatten(
    leaves: impl IntoIterator<Item = (String, Value)>,
) -> Result<Value, ProjectConfigError> {
    let mut tree = ProjectConfigTree::new();
    for (path, value) in leaves {
        tree.set(&path, value)?;
    }
    Ok(tree.pending)
}

fn split_path(path: &str) -> Result<Vec<&str>, ProjectConfigError> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(ProjectConfigError::InvalidPath {
            path: path.to_string(),
        });
    }
    Ok(segments)
}

fn lookup<'a>(root: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    segments
        .iter()
        .try_fold(root, |node, segment| node.as_object()?.get(*segment))
}

/// Returns true when `node` is left empty and should be pruned by its parent.
fn remove_and_prune(node: &mut Value, segments: &[&str]) -> bool {
    let Some(map) = node.as_object_mut() else {
        return false;
    };
    match segments {
        [] => false,
        [last] => {
            map.shift_remove(*last);
            map.is_empty()
        }
        [first, rest @ ..] => {
            let prune = map
                .get_mut(*first)
                .is_some_and(|child| remove_and_prune(child, rest));
            if prune {
                map.shift_remove(*first);
            }
            map.is_empty()
        }
    }
}

fn walk(value: &Value, prefix: &str, visit: &mut dyn FnMut(&str, &Value)) {
    if let Value::Object(map) = value {
        let mut keys: Vec<&String> = map.keys().collect();
        keys.sort();
        for key in keys {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            let child = &map[key];
            visit(&path, child);
            walk(child, &path, visit);
        }
    }
}
