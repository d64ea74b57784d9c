//! Content Refactor Engine: moves per-element field values from a wide
//! legacy content table into the packed `content` document on each
//! element/site association row.
//!
//! Rows are read in keyset pages over the association row id. Each page's
//! statement is finished before its rows are written back, so memory is
//! bounded by the configured batch size.

pub mod decode;
pub mod labels;
pub mod plan;
pub mod query;

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection};
use sediment_core::config::ContentConfig;
use sediment_core::errors::{ContentError, StorageError};
use sediment_core::traits::ProgressReporter;
use sediment_core::types::FieldLayout;
use serde_json::{Map, Value};

pub use self::decode::{decode_value, Decoder};
pub use self::labels::ElementLabels;
pub use self::plan::{plan_columns, ColumnPlan, PlannedColumn};
pub use self::query::{ElementSelection, QuerySpec};

use self::query::{delete_sql, JoinTables, PageQuery};
use crate::dialect::Dialect;
use crate::executor::Executor;
use crate::schema::SchemaInspector;

/// Outcome of one `migrate_content` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentMigrationSummary {
    /// Association rows rewritten.
    pub rows: u64,
    /// Fields that had a column in the legacy table.
    pub fields: usize,
    /// Legacy rows deleted afterwards.
    pub deleted_rows: u64,
    /// Whether the legacy table was dropped because it ended up empty.
    pub dropped_table: bool,
}

/// One legacy row joined to its association and element rows.
struct LegacyRow {
    id: i64,
    element_id: i64,
    kind: Option<String>,
    draft_id: Option<i64>,
    revision_id: Option<i64>,
    title: Option<String>,
    values: Vec<SqlValue>,
}

pub struct ContentRefactor<'a> {
    conn: &'a Connection,
    config: &'a ContentConfig,
    labels: &'a ElementLabels,
    progress: &'a mut dyn ProgressReporter,
}

impl<'a> ContentRefactor<'a> {
    pub fn new(
        conn: &'a Connection,
        config: &'a ContentConfig,
        labels: &'a ElementLabels,
        progress: &'a mut dyn ProgressReporter,
    ) -> Self {
        Self {
            conn,
            config,
            labels,
            progress,
        }
    }

    /// Pack the selected elements' legacy field values into their
    /// association rows, then delete those legacy rows and drop the legacy
    /// table if nothing is left in it.
    ///
    /// `column_prefix` falls back to the configured prefix.
    pub fn migrate_content(
        &mut self,
        selection: &ElementSelection,
        layout: Option<&FieldLayout>,
        legacy_table: &str,
        column_prefix: Option<&str>,
    ) -> Result<ContentMigrationSummary, ContentError> {
        let dialect = Dialect::Sqlite;
        let inspector = SchemaInspector::new(self.conn);
        let tables = JoinTables {
            elements: self.config.effective_elements_table(),
            elements_sites: self.config.effective_elements_sites_table(),
            legacy: legacy_table,
        };
        for table in [tables.legacy, tables.elements_sites, tables.elements] {
            if !inspector.table_exists(table)? {
                return Err(ContentError::MissingTable {
                    table: table.to_string(),
                });
            }
        }

        let prefix = column_prefix.unwrap_or_else(|| self.config.effective_column_prefix());
        let plans = plan_columns(&inspector, legacy_table, layout, prefix)?;
        let has_title = inspector.column_exists(legacy_table, "title")?;
        let page = PageQuery::build(dialect, tables, selection, has_title, &plans)?;
        let batch_size = self.config.effective_batch_size().max(1);
        let value_count: usize = plans.iter().map(|p| p.columns.len()).sum();

        let update_sql = if has_title {
            format!(
                "UPDATE {} SET title = ?1, content = ?2 WHERE id = ?3",
                dialect.quote(tables.elements_sites)
            )
        } else {
            format!(
                "UPDATE {} SET content = ?1 WHERE id = ?2",
                dialect.quote(tables.elements_sites)
            )
        };

        let mut summary = ContentMigrationSummary {
            fields: plans.len(),
            ..Default::default()
        };
        let mut after = 0i64;
        loop {
            let rows = self.fetch_page(&page, after, batch_size, has_title, value_count)?;
            let Some(last) = rows.last() else {
                break;
            };
            after = last.id;
            let short_page = rows.len() < batch_size;

            let mut update = self
                .conn
                .prepare_cached(&update_sql)
                .map_err(StorageError::sqlite)?;
            for row in &rows {
                let line = self.describe(row);
                self.progress.line(&line);

                let document = pack_document(&plans, &row.values);
                let content = if document.is_empty() {
                    None
                } else {
                    Some(serde_json::to_string(&document).map_err(|e| ContentError::Encode {
                        row_id: row.id,
                        message: e.to_string(),
                    })?)
                };
                let written = if has_title {
                    update.execute(params![row.title, content, row.id])
                } else {
                    update.execute(params![content, row.id])
                };
                written.map_err(StorageError::sqlite)?;
                summary.rows += 1;
            }

            if short_page {
                break;
            }
        }

        let (sql, values) = delete_sql(dialect, legacy_table, selection)?;
        summary.deleted_rows = self
            .conn
            .execute(&sql, params_from_iter(values.iter()))
            .map_err(StorageError::sqlite)? as u64;

        if inspector.is_empty(legacy_table)? {
            Executor::new(self.conn).drop_table(legacy_table)?;
            summary.dropped_table = true;
        }

        tracing::info!(
            table = legacy_table,
            rows = summary.rows,
            fields = summary.fields,
            deleted_rows = summary.deleted_rows,
            dropped_table = summary.dropped_table,
            "content migrated"
        );
        Ok(summary)
    }

    fn fetch_page(
        &self,
        page: &PageQuery,
        after: i64,
        limit: usize,
        has_title: bool,
        value_count: usize,
    ) -> Result<Vec<LegacyRow>, StorageError> {
        let mut stmt = self
            .conn
            .prepare_cached(&page.sql)
            .map_err(StorageError::sqlite)?;
        let value_start = if has_title { 7 } else { 6 };
        let rows = stmt
            .query_map(params_from_iter(page.params(after, limit)), |row| {
                let title = if has_title {
                    text_of(row.get::<_, SqlValue>(6)?)
                } else {
                    None
                };
                let values = (value_start..value_start + value_count)
                    .map(|i| row.get::<_, SqlValue>(i))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(LegacyRow {
                    id: row.get(0)?,
                    element_id: row.get(1)?,
                    kind: row.get(3)?,
                    draft_id: row.get(4)?,
                    revision_id: row.get(5)?,
                    title,
                    values,
                })
            })
            .map_err(StorageError::sqlite)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::sqlite)
    }

    /// `migrating content for draft of entry 12 ("Hello")`
    fn describe(&self, row: &LegacyRow) -> String {
        let label = self.labels.label(row.kind.as_deref());
        let qualifier = if row.draft_id.is_some() {
            "draft of "
        } else if row.revision_id.is_some() {
            "revision of "
        } else {
            ""
        };
        match row.title {
            Some(ref title) => format!(
                "migrating content for {qualifier}{label} {} (\"{title}\")",
                row.element_id
            ),
            None => format!("migrating content for {qualifier}{label} {}", row.element_id),
        }
    }
}

/// Build the packed document for one row.
///
/// `values` holds one raw value per planned column, in plan order. A
/// multi-column field is omitted when its primary sub-key decodes to
/// nothing; otherwise it keeps only the sub-keys that decoded.
pub fn pack_document(plans: &[ColumnPlan], values: &[SqlValue]) -> Map<String, Value> {
    let mut document = Map::new();
    let mut offset = 0;
    for plan in plans {
        let raw = &values[offset..offset + plan.columns.len()];
        offset += plan.columns.len();

        if plan.is_multi_column() {
            let Some(primary) = decode_value(plan.primary().decoder, &raw[0]) else {
                continue;
            };
            let mut sub = Map::new();
            if let Some(ref key) = plan.primary().key {
                sub.insert(key.clone(), primary);
            }
            for (column, raw) in plan.columns.iter().zip(raw).skip(1) {
                if let (Some(key), Some(value)) = (&column.key, decode_value(column.decoder, raw)) {
                    sub.insert(key.clone(), value);
                }
            }
            document.insert(plan.uid.clone(), Value::Object(sub));
        } else if let Some(value) = decode_value(plan.primary().decoder, &raw[0]) {
            document.insert(plan.uid.clone(), value);
        }
    }
    document
}

fn text_of(value: SqlValue) -> Option<String> {
    match value {
        SqlValue::Null => None,
        SqlValue::Text(s) => Some(s),
        SqlValue::Integer(i) => Some(i.to_string()),
        SqlValue::Real(f) => Some(f.to_string()),
        SqlValue::Blob(b) => Some(String::from_utf8_lossy(&b).into_owned()),
    }
}
