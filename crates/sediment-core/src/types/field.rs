//! Field-layout descriptors consumed by the content refactor engine.

use serde::{Deserialize, Serialize};

/// Logical scalar kind of a physical column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Integer,
    Float,
    Boolean,
    Text,
    Other,
}

impl ColumnKind {
    /// Classify a declared column type from any supported dialect.
    ///
    /// Boolean is checked before the integer family so that `TINYINT(1)`
    /// and `BOOLEAN` are not read as integers.
    pub fn from_declared_type(declared: &str) -> Self {
        let t = declared.trim().to_ascii_uppercase();
        if t.starts_with("BOOL") || t == "TINYINT(1)" {
            return Self::Boolean;
        }
        if t.contains("INT") || t == "SERIAL" || t == "BIGSERIAL" {
            return Self::Integer;
        }
        if ["REAL", "FLOA", "DOUB", "DEC", "NUMERIC", "MONEY"]
            .iter()
            .any(|k| t.contains(k))
        {
            return Self::Float;
        }
        if t.contains("JSON") {
            return Self::Other;
        }
        if ["CHAR", "CLOB", "TEXT", "ENUM"].iter().any(|k| t.contains(k)) {
            return Self::Text;
        }
        Self::Other
    }
}

/// Closed set of field storage/decoding capabilities.
///
/// Resolved once per field during column planning, never per row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "columns")]
pub enum FieldKind {
    /// One column; decoding follows the physical column's kind.
    Scalar(ColumnKind),
    /// Ordered sub-keys; position 0 is the primary sub-key.
    MultiColumn(Vec<(String, ColumnKind)>),
    /// Multi-select options stored as JSON text.
    OptionsLike,
    /// Structured multi-row table stored as JSON text.
    Table,
    /// A single on/off toggle.
    Boolean,
    /// No column storage.
    None,
}

impl FieldKind {
    /// Whether a field of this kind owns at least one column.
    pub fn has_storage(&self) -> bool {
        match self {
            Self::None => false,
            Self::MultiColumn(keys) => !keys.is_empty(),
            _ => true,
        }
    }
}

/// One custom field as seen by a field layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Stable identity, independent of numeric ids.
    pub uid: String,
    /// Storage-facing name.
    pub handle: String,
    /// Distinguishes several storage variants of the same handle.
    pub column_suffix: Option<String>,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub fn new(uid: impl Into<String>, handle: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            uid: uid.into(),
            handle: handle.into(),
            column_suffix: None,
            kind,
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.column_suffix = Some(suffix.into());
        self
    }
}

/// Ordered assignment of fields to an element kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldLayout {
    pub fields: Vec<FieldDescriptor>,
}

impl FieldLayout {
    pub fn new(fields: Vec<FieldDescriptor>) -> Self {
        Self { fields }
    }

    pub fn push(&mut self, field: FieldDescriptor) {
        self.fields.push(field);
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter()
    }
}

/// Physical column name: `{prefix}{handle}[_{key}][_{suffix}]`.
pub fn field_column(prefix: &str, handle: &str, suffix: Option<&str>, key: Option<&str>) -> String {
    let mut column = format!("{prefix}{handle}");
    if let Some(key) = key {
        column.push('_');
        column.push_str(key);
    }
    if let Some(suffix) = suffix.filter(|s| !s.is_empty()) {
        column.push('_');
        column.push_str(suffix);
    }
    column
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_declared_types() {
        assert_eq!(ColumnKind::from_declared_type("INTEGER"), ColumnKind::Integer);
        assert_eq!(ColumnKind::from_declared_type("bigint"), ColumnKind::Integer);
        assert_eq!(ColumnKind::from_declared_type("tinyint(1)"), ColumnKind::Boolean);
        assert_eq!(ColumnKind::from_declared_type("BOOLEAN"), ColumnKind::Boolean);
        assert_eq!(ColumnKind::from_declared_type("DECIMAL(14,4)"), ColumnKind::Float);
        assert_eq!(ColumnKind::from_declared_type("double precision"), ColumnKind::Float);
        assert_eq!(ColumnKind::from_declared_type("VARCHAR(255)"), ColumnKind::Text);
        assert_eq!(ColumnKind::from_declared_type("TEXT"), ColumnKind::Text);
        assert_eq!(ColumnKind::from_declared_type("JSON"), ColumnKind::Other);
        assert_eq!(ColumnKind::from_declared_type("DATETIME"), ColumnKind::Other);
        assert_eq!(ColumnKind::from_declared_type(""), ColumnKind::Other);
    }

    #[test]
    fn field_column_naming() {
        assert_eq!(field_column("field_", "color", None, None), "field_color");
        assert_eq!(field_column("field_", "color", Some("abc"), None), "field_color_abc");
        assert_eq!(
            field_column("field_", "price", Some("xyz"), Some("currency")),
            "field_price_currency_xyz"
        );
        assert_eq!(field_column("field_", "price", None, Some("currency")), "field_price_currency");
    }

    #[test]
    fn empty_multi_column_has_no_storage() {
        assert!(!FieldKind::MultiColumn(vec![]).has_storage());
        assert!(!FieldKind::None.has_storage());
        assert!(FieldKind::OptionsLike.has_storage());
    }
}
