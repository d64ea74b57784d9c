//! Element selection and the keyset-paged row query.

use rusqlite::types::Value;
use sediment_core::errors::ContentError;

use super::plan::ColumnPlan;
use crate::dialect::{Bindings, Condition, Dialect};

/// A sub-select producing element ids.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    pub table: String,
    /// Projected column. Defaults to `id`.
    pub select: Option<String>,
    pub conditions: Vec<Condition>,
}

impl QuerySpec {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            select: None,
            conditions: Vec::new(),
        }
    }

    pub fn select(mut self, column: impl Into<String>) -> Self {
        self.select = Some(column.into());
        self
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn effective_select(&self) -> &str {
        self.select.as_deref().unwrap_or("id")
    }
}

/// Which elements a content pass covers.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementSelection {
    Ids(Vec<i64>),
    Query(QuerySpec),
}

impl From<Vec<i64>> for ElementSelection {
    fn from(ids: Vec<i64>) -> Self {
        Self::Ids(ids)
    }
}

impl From<QuerySpec> for ElementSelection {
    fn from(spec: QuerySpec) -> Self {
        Self::Query(spec)
    }
}

impl ElementSelection {
    /// Render as a sub-select of element ids, binding into `bindings`.
    pub(crate) fn render(&self, dialect: Dialect, bindings: &mut Bindings) -> Result<String, ContentError> {
        match self {
            Self::Ids(ids) if ids.is_empty() => Err(ContentError::EmptySelection),
            // One JSON array parameter instead of one placeholder per id.
            Self::Ids(ids) => {
                let array = format!(
                    "[{}]",
                    ids.iter().map(i64::to_string).collect::<Vec<_>>().join(",")
                );
                Ok(format!("SELECT value FROM json_each({})", bindings.bind(Value::Text(array))))
            }
            Self::Query(spec) => Ok(dialect.select_sql(
                &spec.table,
                spec.effective_select(),
                &spec.conditions,
                bindings,
            )),
        }
    }
}

/// Tables the row query joins.
#[derive(Debug, Clone, Copy)]
pub(crate) struct JoinTables<'a> {
    pub elements: &'a str,
    pub elements_sites: &'a str,
    pub legacy: &'a str,
}

/// The paged row query with its selection parameters pre-bound.
#[derive(Debug)]
pub(crate) struct PageQuery {
    pub sql: String,
    selection: Vec<Value>,
}

impl PageQuery {
    /// Column layout of each row: `es.id, es.elementId, es.siteId, e.type,
    /// e.draftId, e.revisionId`, then `c.title` when present, then every
    /// planned column in plan order.
    pub fn build(
        dialect: Dialect,
        tables: JoinTables<'_>,
        selection: &ElementSelection,
        has_title: bool,
        plans: &[ColumnPlan],
    ) -> Result<Self, ContentError> {
        let q = |ident: &str| dialect.quote(ident);
        let mut bindings = Bindings::new(dialect);
        let selection_sql = selection.render(dialect, &mut bindings)?;

        let mut select = vec![
            "es.id".to_string(),
            "es.elementId".to_string(),
            "es.siteId".to_string(),
            "e.type".to_string(),
            "e.draftId".to_string(),
            "e.revisionId".to_string(),
        ];
        if has_title {
            select.push("c.title".to_string());
        }
        for plan in plans {
            select.extend(plan.columns.iter().map(|c| format!("c.{}", q(&c.column))));
        }

        let after = bindings.bind(Value::Null);
        let limit = bindings.bind(Value::Null);
        let sql = format!(
            "SELECT {}
             FROM {} es
             INNER JOIN {} c ON c.elementId = es.elementId AND c.siteId = es.siteId
             INNER JOIN {} e ON e.id = es.elementId
             WHERE es.elementId IN ({selection_sql}) AND es.id > {after}
             ORDER BY es.id
             LIMIT {limit}",
            select.join(", "),
            q(tables.elements_sites),
            q(tables.legacy),
            q(tables.elements),
        );

        let mut selection = bindings.into_values();
        selection.truncate(selection.len() - 2);
        Ok(Self { sql, selection })
    }

    /// Parameters for the page following association row `after`.
    pub fn params(&self, after: i64, limit: usize) -> Vec<Value> {
        let mut params = self.selection.clone();
        params.push(Value::Integer(after));
        params.push(Value::Integer(limit as i64));
        params
    }
}

/// `DELETE FROM legacy WHERE elementId IN (selection)`.
pub(crate) fn delete_sql(
    dialect: Dialect,
    legacy: &str,
    selection: &ElementSelection,
) -> Result<(String, Vec<Value>), ContentError> {
    let mut bindings = Bindings::new(dialect);
    let selection_sql = selection.render(dialect, &mut bindings)?;
    let sql = format!(
        "DELETE FROM {} WHERE elementId IN ({selection_sql})",
        dialect.quote(legacy)
    );
    Ok((sql, bindings.into_values()))
}
