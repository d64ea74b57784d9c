//! Migration identity: owner scopes, names, and applied records.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::MigrationError;

/// `m<YYMMDD>_<HHMMSS>_<description>`.
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^m(\d{6})_(\d{6})_([A-Za-z0-9_]+)$").unwrap());

static DESCRIPTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").unwrap());

/// The namespace migration names are unique and ordered within.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OwnerScope {
    Core,
    Plugin(String),
}

impl OwnerScope {
    pub fn plugin(handle: impl Into<String>) -> Self {
        Self::Plugin(handle.into())
    }

    /// The persisted `ownerId` value: NULL for core.
    pub fn owner_id(&self) -> Option<&str> {
        match self {
            Self::Core => None,
            Self::Plugin(handle) => Some(handle),
        }
    }

    pub fn from_owner_id(owner_id: Option<String>) -> Self {
        match owner_id {
            None => Self::Core,
            Some(handle) => Self::Plugin(handle),
        }
    }
}

impl fmt::Display for OwnerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Core => f.write_str("core"),
            Self::Plugin(handle) => write!(f, "plugin:{handle}"),
        }
    }
}

/// A validated, timestamp-prefixed migration identifier.
///
/// Ordering is lexical, which for the fixed-width prefix equals creation order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MigrationName(String);

impl MigrationName {
    pub fn parse(name: &str) -> Result<Self, MigrationError> {
        if !NAME_RE.is_match(name) {
            return Err(MigrationError::InvalidName {
                name: name.to_string(),
            });
        }
        Ok(Self(name.to_string()))
    }

    /// Build a fresh identifier for a migration created at `now`.
    pub fn generate(description: &str, now: DateTime<Utc>) -> Result<Self, MigrationError> {
        if !DESCRIPTION_RE.is_match(description) {
            return Err(MigrationError::InvalidName {
                name: description.to_string(),
            });
        }
        Self::parse(&format!("m{}_{}", now.format("%y%m%d_%H%M%S"), description))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The human-readable part after the timestamp.
    pub fn description(&self) -> &str {
        // "m" + 6 digits + "_" + 6 digits + "_"
        &self.0[15..]
    }

    /// The creation timestamp encoded in the prefix, if it is a real date.
    pub fn created_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.0[1..14], "%y%m%d_%H%M%S").ok()
    }
}

impl fmt::Display for MigrationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for MigrationName {
    type Error = MigrationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MigrationName> for String {
    fn from(value: MigrationName) -> Self {
        value.0
    }
}

/// One row of the Migration Record Store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub id: i64,
    pub owner: OwnerScope,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_conventional_names() {
        let name = MigrationName::parse("m150403_183908_migrations_table_changes").unwrap();
        assert_eq!(name.description(), "migrations_table_changes");
        let ts = name.created_at().unwrap();
        assert_eq!(ts.format("%Y-%m-%d %H:%M:%S").to_string(), "2015-04-03 18:39:08");
    }

    #[test]
    fn rejects_malformed_names() {
        for bad in ["", "m1_2_x", "m150403_183908_", "x150403_183908_a", "m150403_183908_a-b"] {
            assert!(MigrationName::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn generate_uses_timestamp_prefix() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 14, 30, 52).unwrap();
        let name = MigrationName::generate("add_widgets", now).unwrap();
        assert_eq!(name.as_str(), "m240115_143052_add_widgets");
    }

    #[test]
    fn lexical_order_matches_creation_order() {
        let a = MigrationName::parse("m190101_000000_b").unwrap();
        let b = MigrationName::parse("m190101_000001_a").unwrap();
        let c = MigrationName::parse("m200101_000000_a").unwrap();
        let mut names = vec![c.clone(), a.clone(), b.clone()];
        names.sort();
        assert_eq!(names, vec![a, b, c]);
    }

    #[test]
    fn owner_scope_maps_to_nullable_owner_id() {
        assert_eq!(OwnerScope::Core.owner_id(), None);
        assert_eq!(OwnerScope::plugin("seo").owner_id(), Some("seo"));
        assert_eq!(OwnerScope::from_owner_id(None), OwnerScope::Core);
        assert_eq!(OwnerScope::plugin("seo").to_string(), "plugin:seo");
    }
}
