//! Schema Inspector: catalog reads, kind classification, and the internal
//! bootstrap it inspects.

use rusqlite::Connection;

use sediment_core::types::ColumnKind;
use sediment_storage::bootstrap::{current_version, run_bootstrap, LATEST_VERSION};
use sediment_storage::connection::pragmas::apply_pragmas;
use sediment_storage::dialect::ForeignKeyAction;
use sediment_storage::schema::{IndexOrigin, SchemaInspector};

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    apply_pragmas(&conn, 5000).unwrap();
    run_bootstrap(&conn).unwrap();
    conn
}

#[test]
fn bootstrap_is_versioned_and_idempotent() {
    let conn = setup();
    assert_eq!(current_version(&conn).unwrap(), LATEST_VERSION);
    run_bootstrap(&conn).unwrap();
    assert_eq!(current_version(&conn).unwrap(), LATEST_VERSION);

    let tables = SchemaInspector::new(&conn).tables().unwrap();
    for table in ["elements", "elements_sites", "migrations", "projectconfig"] {
        assert!(tables.iter().any(|t| t == table), "missing {table}");
    }
    assert!(!tables.iter().any(|t| t.starts_with("sqlite_")));
}

#[test]
fn column_kinds_follow_declared_types() {
    let conn = setup();
    conn.execute_batch(
        "CREATE TABLE kinds (
            a INTEGER, b BIGINT, c TINYINT(1), d BOOLEAN, e DECIMAL(12,2),
            f DOUBLE, g VARCHAR(10), h TEXT, i JSON, j DATETIME, k BLOB, l
        )",
    )
    .unwrap();

    let kinds: Vec<(String, ColumnKind)> = SchemaInspector::new(&conn)
        .columns("kinds")
        .unwrap()
        .into_iter()
        .map(|c| (c.name, c.kind))
        .collect();
    let expected = [
        ("a", ColumnKind::Integer),
        ("b", ColumnKind::Integer),
        ("c", ColumnKind::Boolean),
        ("d", ColumnKind::Boolean),
        ("e", ColumnKind::Float),
        ("f", ColumnKind::Float),
        ("g", ColumnKind::Text),
        ("h", ColumnKind::Text),
        ("i", ColumnKind::Other),
        ("j", ColumnKind::Other),
        ("k", ColumnKind::Other),
        ("l", ColumnKind::Other),
    ];
    assert_eq!(kinds.len(), expected.len());
    for ((name, kind), (want_name, want_kind)) in kinds.iter().zip(expected) {
        assert_eq!(name, want_name);
        assert_eq!(*kind, want_kind, "column {name}");
    }
}

#[test]
fn missing_tables_report_nothing() {
    let conn = setup();
    let schema = SchemaInspector::new(&conn);
    assert!(!schema.table_exists("nope").unwrap());
    assert!(schema.columns("nope").unwrap().is_empty());
    assert!(schema.get_column("nope", "id").unwrap().is_none());
    assert!(!schema.column_exists("nope", "id").unwrap());
    assert!(schema.indexes("nope").unwrap().is_empty());
    assert!(schema.foreign_keys("nope").unwrap().is_empty());
}

#[test]
fn lookups_are_case_insensitive() {
    let conn = setup();
    let schema = SchemaInspector::new(&conn);
    assert!(schema.table_exists("ELEMENTS_SITES").unwrap());
    assert!(schema.column_exists("elements_sites", "ELEMENTID").unwrap());
    assert_eq!(
        schema.get_column("elements_sites", "elementid").unwrap().unwrap().name,
        "elementId"
    );
}

#[test]
fn element_tables_shape() {
    let conn = setup();
    let schema = SchemaInspector::new(&conn);

    let element_id = schema.get_column("elements_sites", "elementId").unwrap().unwrap();
    assert!(!element_id.nullable);
    assert_eq!(element_id.kind, ColumnKind::Integer);
    assert!(schema.get_column("elements_sites", "title").unwrap().unwrap().nullable);

    assert!(schema.index_exists("elements_sites", &["elementId", "siteId"], true).unwrap());
    assert!(schema.index_exists("elements_sites", &["siteId"], false).unwrap());
    let unique = schema
        .indexes("elements_sites")
        .unwrap()
        .into_iter()
        .find(|i| i.unique)
        .unwrap();
    assert_eq!(unique.origin, IndexOrigin::Unique);

    let fks = schema.foreign_keys("elements_sites").unwrap();
    assert_eq!(fks.len(), 1);
    assert_eq!(fks[0].columns, vec!["elementId"]);
    assert_eq!(fks[0].ref_table, "elements");
    assert_eq!(fks[0].ref_columns, vec!["id"]);
    assert_eq!(fks[0].on_delete, ForeignKeyAction::Cascade);
    assert!(schema.foreign_key_exists("elements_sites", &["elementId"]).unwrap());
    assert_eq!(schema.referencing_tables("elements").unwrap(), vec!["elements_sites"]);
}

#[test]
fn composite_foreign_keys_are_grouped() {
    let conn = setup();
    conn.execute_batch(
        "CREATE TABLE parent (a INTEGER, b INTEGER, PRIMARY KEY (a, b));
         CREATE TABLE child (
            x INTEGER, y INTEGER,
            FOREIGN KEY (x, y) REFERENCES parent (a, b) ON UPDATE SET NULL
         );",
    )
    .unwrap();

    let schema = SchemaInspector::new(&conn);
    let fks = schema.foreign_keys("child").unwrap();
    assert_eq!(fks.len(), 1);
    assert_eq!(fks[0].columns, vec!["x", "y"]);
    assert_eq!(fks[0].ref_columns, vec!["a", "b"]);
    assert_eq!(fks[0].on_update, ForeignKeyAction::SetNull);
    assert!(schema.foreign_key_exists("child", &["x", "y"]).unwrap());
    assert!(!schema.foreign_key_exists("child", &["x"]).unwrap());

    let pk = schema
        .indexes("parent")
        .unwrap()
        .into_iter()
        .find(|i| i.origin == IndexOrigin::PrimaryKey)
        .unwrap();
    assert_eq!(pk.columns, vec!["a", "b"]);
}

#[test]
fn row_counts() {
    let conn = setup();
    let schema = SchemaInspector::new(&conn);
    assert!(schema.is_empty("elements").unwrap());
    conn.execute_batch(
        "INSERT INTO elements (type) VALUES ('entry'), ('asset'), ('entry');",
    )
    .unwrap();
    assert_eq!(schema.row_count("elements").unwrap(), 3);
    assert!(!schema.is_empty("elements").unwrap());
}
