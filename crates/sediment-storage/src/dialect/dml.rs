//! DML rendering. Every value is bound; identifiers are quoted.

use rusqlite::types::Value;

use super::Dialect;

/// One AND-joined predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(String, Value),
    In(String, Vec<Value>),
    IsNull(String),
}

impl Condition {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(column.into(), value.into())
    }

    pub fn is_in<V: Into<Value>>(column: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self::In(column.into(), values.into_iter().map(Into::into).collect())
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::IsNull(column.into())
    }
}

/// Accumulates bound values and hands out the matching placeholders.
#[derive(Debug)]
pub struct Bindings {
    dialect: Dialect,
    values: Vec<Value>,
}

impl Bindings {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            values: Vec::new(),
        }
    }

    /// Bind `value` and return its placeholder.
    pub fn bind(&mut self, value: Value) -> String {
        self.values.push(value);
        self.dialect.placeholder(self.values.len())
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl Dialect {
    /// `a = ? AND b IN (?, ?) AND c IS NULL`. Empty input renders `1 = 1`.
    pub fn where_clause(&self, conditions: &[Condition], bindings: &mut Bindings) -> String {
        if conditions.is_empty() {
            return "1 = 1".to_string();
        }
        conditions
            .iter()
            .map(|c| match c {
                Condition::Eq(column, value) => {
                    format!("{} = {}", self.quote(column), bindings.bind(value.clone()))
                }
                // Nothing can match an empty IN list.
                Condition::In(_, values) if values.is_empty() => "1 = 0".to_string(),
                Condition::In(column, values) => {
                    let placeholders: Vec<String> =
                        values.iter().map(|v| bindings.bind(v.clone())).collect();
                    format!("{} IN ({})", self.quote(column), placeholders.join(", "))
                }
                Condition::IsNull(column) => format!("{} IS NULL", self.quote(column)),
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    /// INSERT with one placeholder per column, numbered from 1.
    pub fn insert_sql(&self, table: &str, columns: &[String]) -> String {
        let placeholders: Vec<String> = (1..=columns.len()).map(|n| self.placeholder(n)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.quote(table),
            self.quote_list(columns),
            placeholders.join(", ")
        )
    }

    pub fn update_sql(
        &self,
        table: &str,
        values: &[(String, Value)],
        conditions: &[Condition],
        bindings: &mut Bindings,
    ) -> String {
        let sets: Vec<String> = values
            .iter()
            .map(|(column, value)| format!("{} = {}", self.quote(column), bindings.bind(value.clone())))
            .collect();
        format!(
            "UPDATE {} SET {} WHERE {}",
            self.quote(table),
            sets.join(", "),
            self.where_clause(conditions, bindings)
        )
    }

    pub fn delete_sql(&self, table: &str, conditions: &[Condition], bindings: &mut Bindings) -> String {
        format!(
            "DELETE FROM {} WHERE {}",
            self.quote(table),
            self.where_clause(conditions, bindings)
        )
    }

    /// `SELECT col FROM table WHERE ...`, used as a sub-select.
    pub fn select_sql(
        &self,
        table: &str,
        column: &str,
        conditions: &[Condition],
        bindings: &mut Bindings,
    ) -> String {
        format!(
            "SELECT {} FROM {} WHERE {}",
            self.quote(column),
            self.quote(table),
            self.where_clause(conditions, bindings)
        )
    }
}
