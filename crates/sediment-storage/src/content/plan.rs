//! Column planning: which legacy columns feed which packed field.

use sediment_core::errors::StorageError;
use sediment_core::types::{field_column, ColumnKind, FieldDescriptor, FieldKind, FieldLayout};

use super::decode::Decoder;
use crate::schema::SchemaInspector;

/// One physical column feeding a field.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedColumn {
    /// Sub-key for multi-column fields, `None` for single-column fields.
    pub key: Option<String>,
    pub column: String,
    pub decoder: Decoder,
}

/// The resolved storage of one field. `columns[0]` is the primary column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnPlan {
    pub uid: String,
    pub handle: String,
    pub columns: Vec<PlannedColumn>,
}

impl ColumnPlan {
    pub fn is_multi_column(&self) -> bool {
        self.columns.first().is_some_and(|c| c.key.is_some())
    }

    pub fn primary(&self) -> &PlannedColumn {
        &self.columns[0]
    }
}

/// Plan every field of `layout` whose primary column exists in `table`.
///
/// Fields without storage, or whose storage was already dropped, are
/// skipped. Secondary sub-key columns that are missing are left out.
pub fn plan_columns(
    inspector: &SchemaInspector<'_>,
    table: &str,
    layout: Option<&FieldLayout>,
    prefix: &str,
) -> Result<Vec<ColumnPlan>, StorageError> {
    let Some(layout) = layout else {
        return Ok(Vec::new());
    };
    let columns = inspector.columns(table)?;
    let physical = |name: &str| {
        columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .map(|c| c.kind)
    };

    let mut plans = Vec::new();
    for field in layout.iter().filter(|f| f.kind.has_storage()) {
        if let Some(plan) = plan_field(field, prefix, &physical) {
            plans.push(plan);
        } else {
            tracing::debug!(
                table = table,
                field = %field.handle,
                "field has no column in legacy table, skipping"
            );
        }
    }
    Ok(plans)
}

fn plan_field(
    field: &FieldDescriptor,
    prefix: &str,
    physical: &dyn Fn(&str) -> Option<ColumnKind>,
) -> Option<ColumnPlan> {
    let suffix = field.column_suffix.as_deref();
    let primary_column = field_column(prefix, &field.handle, suffix, None);
    let primary_kind = physical(&primary_column)?;

    let single = |decoder: Decoder| {
        vec![PlannedColumn {
            key: None,
            column: primary_column.clone(),
            decoder,
        }]
    };

    let columns = match &field.kind {
        FieldKind::None => return None,
        FieldKind::OptionsLike | FieldKind::Table => single(Decoder::Json),
        FieldKind::Boolean => single(Decoder::Toggle),
        FieldKind::Scalar(_) => single(Decoder::Column(primary_kind)),
        FieldKind::MultiColumn(keys) => {
            let (first, rest) = keys.split_first()?;
            let mut columns = vec![PlannedColumn {
                key: Some(first.0.clone()),
                column: primary_column.clone(),
                decoder: Decoder::Column(primary_kind),
            }];
            for (key, _) in rest {
                let column = field_column(prefix, &field.handle, suffix, Some(key));
                if let Some(kind) = physical(&column) {
                    columns.push(PlannedColumn {
                        key: Some(key.clone()),
                        column,
                        decoder: Decoder::Column(kind),
                    });
                }
            }
            columns
        }
    };

    Some(ColumnPlan {
        uid: field.uid.clone(),
        handle: field.handle.clone(),
        columns,
    })
}
