//! Migration Runner: pending-set computation, ordering, transactional
//! scopes, mark and revert.

use std::cell::Cell;
use std::rc::Rc;

use proptest::prelude::*;
use rusqlite::Connection;
use serde_json::json;

use sediment_core::config::MigrationConfig;
use sediment_core::errors::MigrationError;
use sediment_core::project_config::ProjectConfigTree;
use sediment_core::traits::{ProjectConfig, RecordingProgress};
use sediment_core::types::OwnerScope;
use sediment_storage::bootstrap::run_bootstrap;
use sediment_storage::connection::pragmas::apply_pragmas;
use sediment_storage::dialect::{ColumnDef, ColumnType};
use sediment_storage::records::MigrationRecordStore;
use sediment_storage::runner::{
    Migration, MigrationContext, MigrationRunner, MigrationSet, RunnerOptions,
};
use sediment_storage::schema::SchemaInspector;

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    apply_pragmas(&conn, 5000).unwrap();
    run_bootstrap(&conn).unwrap();
    conn
}

/// Creates a table with an id column, if missing.
struct CreateTable {
    name: &'static str,
    table: &'static str,
}

impl Migration for CreateTable {
    fn name(&self) -> &str {
        self.name
    }

    fn up(&self, ctx: &mut MigrationContext<'_>) -> Result<(), MigrationError> {
        ctx.db().create_table_if_not_exists(
            self.table,
            vec![
                ColumnDef::new("id", ColumnType::PrimaryKey),
                ColumnDef::new("name", ColumnType::String(255)),
            ],
            None,
        )?;
        Ok(())
    }

    fn down(&self, ctx: &mut MigrationContext<'_>) -> Result<(), MigrationError> {
        ctx.db().drop_table_if_exists(self.table)?;
        Ok(())
    }
}

struct AddColor;

impl Migration for AddColor {
    fn name(&self) -> &str {
        "m190102_000000_add_widget_color"
    }

    fn up(&self, ctx: &mut MigrationContext<'_>) -> Result<(), MigrationError> {
        ctx.db()
            .add_column_if_missing("widgets", ColumnDef::new("color", ColumnType::String(7)))?;
        Ok(())
    }
}

/// Creates its table, then fails while `fail` is set.
struct Flaky {
    name: &'static str,
    table: &'static str,
    fail: Rc<Cell<bool>>,
}

impl Migration for Flaky {
    fn name(&self) -> &str {
        self.name
    }

    fn up(&self, ctx: &mut MigrationContext<'_>) -> Result<(), MigrationError> {
        ctx.db().create_table_if_not_exists(
            self.table,
            vec![ColumnDef::new("id", ColumnType::PrimaryKey)],
            None,
        )?;
        if self.fail.get() {
            return Err(MigrationError::Refused {
                name: self.name.to_string(),
                reason: "not ready".to_string(),
            });
        }
        Ok(())
    }
}

/// Counts how often `up` ran.
struct Counting {
    name: String,
    calls: Rc<Cell<u32>>,
    fail: bool,
}

impl Migration for Counting {
    fn name(&self) -> &str {
        &self.name
    }

    fn up(&self, ctx: &mut MigrationContext<'_>) -> Result<(), MigrationError> {
        self.calls.set(self.calls.get() + 1);
        if self.fail {
            ctx.db().execute_raw("INSERT INTO no_such_table VALUES (1)")?;
        }
        Ok(())
    }
}

struct SetEdition;

impl Migration for SetEdition {
    fn name(&self) -> &str {
        "m190103_000000_set_edition"
    }

    fn up(&self, ctx: &mut MigrationContext<'_>) -> Result<(), MigrationError> {
        if ctx.project_config().get("system.edition", true).is_none() {
            return Err(MigrationError::Precondition {
                name: self.name().to_string(),
                message: "system.edition is not set".to_string(),
            });
        }
        ctx.project_config().set("system.edition", json!("pro"))?;
        ctx.progress().line("edition upgraded");
        Ok(())
    }
}

fn widgets_set() -> MigrationSet {
    MigrationSet::new()
        .with(
            OwnerScope::Core,
            Box::new(CreateTable {
                name: "m190101_000000_create_widgets",
                table: "widgets",
            }),
        )
        .unwrap()
        .with(OwnerScope::Core, Box::new(AddColor))
        .unwrap()
}

#[test]
fn widgets_scenario_applies_both_in_one_run() {
    let conn = setup();
    let set = widgets_set();
    let mut config = ProjectConfigTree::new();
    let mut progress = RecordingProgress::new();

    let report = {
        let mut runner = MigrationRunner::new(&conn, &set, &mut config, &mut progress);
        let report = runner.up(&OwnerScope::Core).unwrap();
        assert!(runner.pending(&OwnerScope::Core).unwrap().is_empty());
        report
    };
    assert_eq!(
        report.names(),
        vec!["m190101_000000_create_widgets", "m190102_000000_add_widget_color"]
    );

    let schema = SchemaInspector::new(&conn);
    assert!(schema.table_exists("widgets").unwrap());
    assert!(schema.column_exists("widgets", "color").unwrap());

    let records = MigrationRecordStore::new(&conn);
    assert!(records.has_run(&OwnerScope::Core, "m190101_000000_create_widgets").unwrap());
    assert!(records.has_run(&OwnerScope::Core, "m190102_000000_add_widget_color").unwrap());
}

#[test]
fn second_run_has_nothing_pending_and_writes_nothing() {
    let conn = setup();
    let set = widgets_set();
    let mut config = ProjectConfigTree::new();
    let mut progress = RecordingProgress::new();
    let mut runner = MigrationRunner::new(&conn, &set, &mut config, &mut progress);

    runner.up(&OwnerScope::Core).unwrap();
    let changes_before = conn.total_changes();

    let second = runner.up(&OwnerScope::Core).unwrap();
    assert!(second.is_empty());
    assert_eq!(conn.total_changes(), changes_before);
    assert_eq!(runner.history(&OwnerScope::Core, None).unwrap().len(), 2);
}

#[test]
fn failure_stops_the_run_and_rolls_back() {
    let conn = setup();
    let m1 = Rc::new(Cell::new(0));
    let m3 = Rc::new(Cell::new(0));
    let fail = Rc::new(Cell::new(true));
    let set = MigrationSet::new()
        .with(
            OwnerScope::Core,
            Box::new(Counting {
                name: "m190101_000000_first".into(),
                calls: m1.clone(),
                fail: false,
            }),
        )
        .unwrap()
        .with(
            OwnerScope::Core,
            Box::new(Flaky {
                name: "m190102_000000_second",
                table: "second",
                fail: fail.clone(),
            }),
        )
        .unwrap()
        .with(
            OwnerScope::Core,
            Box::new(Counting {
                name: "m190103_000000_third".into(),
                calls: m3.clone(),
                fail: false,
            }),
        )
        .unwrap();

    let mut config = ProjectConfigTree::new();
    let mut progress = RecordingProgress::new();
    let err = {
        let mut runner = MigrationRunner::new(&conn, &set, &mut config, &mut progress);
        runner.up(&OwnerScope::Core).unwrap_err()
    };

    match err {
        MigrationError::Failed { ref name, ref message } => {
            assert_eq!(name, "m190102_000000_second");
            assert!(message.contains("not ready"), "message: {message}");
        }
        other => panic!("expected Failed, got {other:?}"),
    }

    assert_eq!(m1.get(), 1);
    assert_eq!(m3.get(), 0, "migrations after a failure must not run");

    let records = MigrationRecordStore::new(&conn);
    assert!(records.has_run(&OwnerScope::Core, "m190101_000000_first").unwrap());
    assert!(!records.has_run(&OwnerScope::Core, "m190102_000000_second").unwrap());
    assert!(!records.has_run(&OwnerScope::Core, "m190103_000000_third").unwrap());
    // The failed migration's DDL was rolled back with it.
    assert!(!SchemaInspector::new(&conn).table_exists("second").unwrap());

    assert_eq!(
        progress.lines().last().map(|l| l.starts_with("*** failed to apply m190102_000000_second (time: ")),
        Some(true)
    );

    // Once fixed, the failed migration is still pending and resumes the run.
    fail.set(false);
    let mut runner = MigrationRunner::new(&conn, &set, &mut config, &mut progress);
    let report = runner.up(&OwnerScope::Core).unwrap();
    assert_eq!(report.names(), vec!["m190102_000000_second", "m190103_000000_third"]);
    assert_eq!(m1.get(), 1);
}

#[test]
fn database_errors_surface_verbatim() {
    let conn = setup();
    let set = MigrationSet::new()
        .with(
            OwnerScope::Core,
            Box::new(Counting {
                name: "m190101_000000_broken".into(),
                calls: Rc::new(Cell::new(0)),
                fail: true,
            }),
        )
        .unwrap();
    let mut config = ProjectConfigTree::new();
    let mut progress = RecordingProgress::new();
    let mut runner = MigrationRunner::new(&conn, &set, &mut config, &mut progress);

    let err = runner.up(&OwnerScope::Core).unwrap_err();
    let text = err.to_string();
    assert!(text.contains("m190101_000000_broken"), "{text}");
    assert!(text.contains("no such table: no_such_table"), "{text}");
}

#[test]
fn non_transactional_failure_keeps_partial_work() {
    let conn = setup();
    let fail = Rc::new(Cell::new(true));
    let set = MigrationSet::new()
        .with(
            OwnerScope::Core,
            Box::new(Flaky {
                name: "m190101_000000_flaky",
                table: "flaky",
                fail: fail.clone(),
            }),
        )
        .unwrap();
    let mut config = ProjectConfigTree::new();
    let mut progress = RecordingProgress::new();
    let mut runner = MigrationRunner::new(&conn, &set, &mut config, &mut progress)
        .with_options(RunnerOptions { transactional: false });

    assert!(runner.up(&OwnerScope::Core).is_err());
    assert!(SchemaInspector::new(&conn).table_exists("flaky").unwrap());
    assert_eq!(runner.pending(&OwnerScope::Core).unwrap().len(), 1);

    // The defensive up() tolerates its own leftovers on retry.
    fail.set(false);
    let report = runner.up(&OwnerScope::Core).unwrap();
    assert_eq!(report.names(), vec!["m190101_000000_flaky"]);
}

#[test]
fn owner_scopes_are_independent() {
    let conn = setup();
    let core_calls = Rc::new(Cell::new(0));
    let plugin_calls = Rc::new(Cell::new(0));
    let seo = OwnerScope::plugin("seo");
    let set = MigrationSet::new()
        .with(
            OwnerScope::Core,
            Box::new(Counting {
                name: "m190101_000000_install".into(),
                calls: core_calls.clone(),
                fail: false,
            }),
        )
        .unwrap()
        .with(
            seo.clone(),
            Box::new(Counting {
                name: "m190101_000000_install".into(),
                calls: plugin_calls.clone(),
                fail: false,
            }),
        )
        .unwrap();
    let mut config = ProjectConfigTree::new();
    let mut progress = RecordingProgress::new();
    let mut runner = MigrationRunner::new(&conn, &set, &mut config, &mut progress);

    runner.up(&OwnerScope::Core).unwrap();
    assert_eq!(runner.pending(&seo).unwrap().len(), 1);
    runner.up(&seo).unwrap();

    assert_eq!((core_calls.get(), plugin_calls.get()), (1, 1));
    let history = runner.history(&seo, None).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].owner, seo);
}

#[test]
fn up_to_applies_a_prefix() {
    let conn = setup();
    let set = widgets_set();
    let mut config = ProjectConfigTree::new();
    let mut progress = RecordingProgress::new();
    let mut runner = MigrationRunner::new(&conn, &set, &mut config, &mut progress);

    let report = runner.up_to(&OwnerScope::Core, Some(1)).unwrap();
    assert_eq!(report.names(), vec!["m190101_000000_create_widgets"]);
    let pending = runner.pending(&OwnerScope::Core).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].name.as_str(), "m190102_000000_add_widget_color");
}

#[test]
fn migrations_reach_project_config_and_progress() {
    let conn = setup();
    let set = MigrationSet::new()
        .with(OwnerScope::Core, Box::new(SetEdition))
        .unwrap();
    let mut config = ProjectConfigTree::from_stored(json!({"system": {"edition": "solo"}}));
    let mut progress = RecordingProgress::new();
    {
        let mut runner = MigrationRunner::new(&conn, &set, &mut config, &mut progress);
        runner.up(&OwnerScope::Core).unwrap();
    }

    assert_eq!(config.get("system.edition", true), Some(json!("pro")));
    assert_eq!(config.get("system.edition", false), Some(json!("solo")));
    assert_eq!(progress.lines()[0], "*** applying m190103_000000_set_edition");
    assert_eq!(progress.lines()[1], "edition upgraded");
    assert!(progress.lines()[2].starts_with("*** applied m190103_000000_set_edition (time: "));
    assert!(progress.lines()[2].ends_with("s)"));
}

#[test]
fn precondition_failure_leaves_no_record() {
    let conn = setup();
    let set = MigrationSet::new()
        .with(OwnerScope::Core, Box::new(SetEdition))
        .unwrap();
    let mut config = ProjectConfigTree::new();
    let mut progress = RecordingProgress::new();
    let mut runner = MigrationRunner::new(&conn, &set, &mut config, &mut progress);

    let err = runner.up(&OwnerScope::Core).unwrap_err();
    assert!(err.to_string().contains("system.edition is not set"));
    assert_eq!(runner.pending(&OwnerScope::Core).unwrap().len(), 1);
}

#[test]
fn mark_applied_records_without_running() {
    let conn = setup();
    let first = Rc::new(Cell::new(0));
    let second = Rc::new(Cell::new(0));
    let set = MigrationSet::new()
        .with(
            OwnerScope::Core,
            Box::new(Counting {
                name: "m190101_000000_first".into(),
                calls: first.clone(),
                fail: false,
            }),
        )
        .unwrap()
        .with(
            OwnerScope::Core,
            Box::new(Counting {
                name: "m190102_000000_second".into(),
                calls: second.clone(),
                fail: false,
            }),
        )
        .unwrap();
    let mut config = ProjectConfigTree::new();
    let mut progress = RecordingProgress::new();
    let mut runner = MigrationRunner::new(&conn, &set, &mut config, &mut progress);

    let marked = runner
        .mark_applied(&OwnerScope::Core, Some("m190101_000000_first"))
        .unwrap();
    assert_eq!(marked, vec!["m190101_000000_first"]);
    assert_eq!(first.get(), 0);

    assert!(matches!(
        runner.mark_applied(&OwnerScope::Core, Some("m190109_000000_unknown")),
        Err(MigrationError::UnknownMigration { .. })
    ));

    let marked = runner.mark_applied(&OwnerScope::Core, None).unwrap();
    assert_eq!(marked, vec!["m190102_000000_second"]);
    assert!(runner.pending(&OwnerScope::Core).unwrap().is_empty());
    assert_eq!((first.get(), second.get()), (0, 0));
}

#[test]
fn revert_runs_down_newest_first_and_stops_at_irreversible() {
    let conn = setup();
    let set = MigrationSet::new()
        .with(
            OwnerScope::Core,
            Box::new(CreateTable {
                name: "m190101_000000_create_widgets",
                table: "widgets",
            }),
        )
        .unwrap()
        .with(OwnerScope::Core, Box::new(AddColor))
        .unwrap()
        .with(
            OwnerScope::Core,
            Box::new(CreateTable {
                name: "m190103_000000_create_gadgets",
                table: "gadgets",
            }),
        )
        .unwrap();
    let mut config = ProjectConfigTree::new();
    let mut progress = RecordingProgress::new();
    let mut runner = MigrationRunner::new(&conn, &set, &mut config, &mut progress);
    runner.up(&OwnerScope::Core).unwrap();

    let err = runner.revert(&OwnerScope::Core, 3).unwrap_err();
    assert!(matches!(err, MigrationError::Irreversible { ref name } if name == "m190102_000000_add_widget_color"));
    assert_eq!(err.to_string(), "m190102_000000_add_widget_color cannot be reverted.");

    let schema = SchemaInspector::new(&conn);
    assert!(!schema.table_exists("gadgets").unwrap());
    assert!(schema.table_exists("widgets").unwrap());

    let remaining: Vec<String> = runner
        .history(&OwnerScope::Core, None)
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(
        remaining,
        vec!["m190102_000000_add_widget_color", "m190101_000000_create_widgets"]
    );
    let pending = runner.pending(&OwnerScope::Core).unwrap();
    assert_eq!(pending[0].name.as_str(), "m190103_000000_create_gadgets");
}

#[test]
fn non_transactional_revert_reports_progress() {
    let conn = setup();
    let set = MigrationSet::new()
        .with(
            OwnerScope::Core,
            Box::new(CreateTable {
                name: "m190101_000000_create_widgets",
                table: "widgets",
            }),
        )
        .unwrap();
    let mut config = ProjectConfigTree::new();
    let mut progress = RecordingProgress::new();
    {
        let mut runner = MigrationRunner::new(&conn, &set, &mut config, &mut progress)
            .with_options(RunnerOptions { transactional: false });
        runner.up(&OwnerScope::Core).unwrap();
        let reverted = runner.revert(&OwnerScope::Core, 1).unwrap();
        assert_eq!(reverted, vec!["m190101_000000_create_widgets"]);
        assert!(runner.history(&OwnerScope::Core, None).unwrap().is_empty());
    }

    assert!(!SchemaInspector::new(&conn).table_exists("widgets").unwrap());
    let lines = progress.lines();
    assert!(lines.iter().any(|l| l == "*** reverting m190101_000000_create_widgets"));
    assert!(lines
        .iter()
        .any(|l| l.starts_with("*** reverted m190101_000000_create_widgets (time: ")));
}

#[test]
fn runner_options_follow_config() {
    assert!(RunnerOptions::default().transactional);
    let config = MigrationConfig {
        transactional: Some(false),
    };
    assert!(!RunnerOptions::from_config(&config).transactional);
    assert!(RunnerOptions::from_config(&MigrationConfig::default()).transactional);
}

proptest! {
    #[test]
    fn applies_exactly_the_prefix_before_a_failure(count in 1usize..6, fail_at in 0usize..8) {
        let conn = setup();
        let calls: Vec<Rc<Cell<u32>>> = (0..count).map(|_| Rc::new(Cell::new(0))).collect();
        let mut set = MigrationSet::new();
        // Register in reverse so discovery order has to come from the names.
        for i in (0..count).rev() {
            set.register(
                OwnerScope::Core,
                Box::new(Counting {
                    name: format!("m19010{i}_000000_step"),
                    calls: calls[i].clone(),
                    fail: i == fail_at,
                }),
            )
            .unwrap();
        }

        let mut config = ProjectConfigTree::new();
        let mut progress = RecordingProgress::new();
        let mut runner = MigrationRunner::new(&conn, &set, &mut config, &mut progress);
        let outcome = runner.up(&OwnerScope::Core);
        prop_assert_eq!(outcome.is_err(), fail_at < count);

        let records = MigrationRecordStore::new(&conn);
        for (i, c) in calls.iter().enumerate() {
            let name = format!("m19010{i}_000000_step");
            prop_assert_eq!(c.get(), u32::from(i <= fail_at));
            prop_assert_eq!(records.has_run(&OwnerScope::Core, &name).unwrap(), i < fail_at);
        }
    }
}
