//! Migration discovery: an explicit registry keyed by owner scope.

use std::collections::BTreeMap;

use sediment_core::errors::MigrationError;
use sediment_core::types::{MigrationName, OwnerScope};

use super::migration::Migration;

/// Discovery-time identity of one registered migration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MigrationDescriptor {
    pub owner: OwnerScope,
    pub name: MigrationName,
}

/// Every known migration, per owner, ordered by name.
#[derive(Default)]
pub struct MigrationSet {
    owners: BTreeMap<OwnerScope, BTreeMap<MigrationName, Box<dyn Migration>>>,
}

impl MigrationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects malformed names and names already registered for `owner`.
    pub fn register(
        &mut self,
        owner: OwnerScope,
        migration: Box<dyn Migration>,
    ) -> Result<(), MigrationError> {
        if let OwnerScope::Plugin(ref handle) = owner {
            if handle.is_empty() {
                return Err(MigrationError::InvalidName {
                    name: format!("{}: empty plugin handle", migration.name()),
                });
            }
        }
        let name = MigrationName::parse(migration.name())?;
        let entries = self.owners.entry(owner.clone()).or_default();
        if entries.contains_key(&name) {
            return Err(MigrationError::DuplicateName {
                owner: owner.to_string(),
                name: name.to_string(),
            });
        }
        entries.insert(name, migration);
        Ok(())
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, owner: OwnerScope, migration: Box<dyn Migration>) -> Result<Self, MigrationError> {
        self.register(owner, migration)?;
        Ok(self)
    }

    /// Descriptors for `owner`, sorted by name.
    pub fn discover(&self, owner: &OwnerScope) -> Vec<MigrationDescriptor> {
        self.owners
            .get(owner)
            .map(|entries| {
                entries
                    .keys()
                    .map(|name| MigrationDescriptor {
                        owner: owner.clone(),
                        name: name.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get(&self, owner: &OwnerScope, name: &str) -> Option<&dyn Migration> {
        let name = MigrationName::parse(name).ok()?;
        self.owners
            .get(owner)?
            .get(&name)
            .map(|m| m.as_ref())
    }

    pub fn owners(&self) -> impl Iterator<Item = &OwnerScope> {
        self.owners.keys()
    }

    pub fn len(&self) -> usize {
        self.owners.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
