//! V001: Migration Record Store and persisted project config.

pub const BOOTSTRAP_SQL: &str = r#"
-- One row per applied migration. ownerId NULL = core.
CREATE TABLE IF NOT EXISTS migrations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ownerId TEXT,
    name TEXT NOT NULL,
    appliedAt TEXT NOT NULL
);

-- NULL owners must collide too, so the key is on the coalesced owner.
CREATE UNIQUE INDEX IF NOT EXISTS uq_migrations_owner_name
    ON migrations (IFNULL(ownerId, ''), name);

-- Applied project config, flattened to leaf paths.
CREATE TABLE IF NOT EXISTS projectconfig (
    path TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
);
"#;
