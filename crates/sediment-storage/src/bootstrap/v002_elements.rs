//! V002: element rows and element/site association rows.
//!
//! `elements_sites.content` holds the packed content document (JSON keyed
//! by field uid) written by the content refactor engine.

pub const BOOTSTRAP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS elements (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    type TEXT NOT NULL,
    draftId INTEGER,
    revisionId INTEGER,
    dateCreated TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
    dateUpdated TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

CREATE INDEX IF NOT EXISTS idx_elements_type ON elements(type);

CREATE TABLE IF NOT EXISTS elements_sites (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    elementId INTEGER NOT NULL REFERENCES elements(id) ON DELETE CASCADE,
    siteId INTEGER NOT NULL,
    title TEXT,
    content TEXT,
    dateCreated TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
    dateUpdated TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
    UNIQUE (elementId, siteId)
);

CREATE INDEX IF NOT EXISTS idx_elements_sites_site ON elements_sites(siteId);
"#;
