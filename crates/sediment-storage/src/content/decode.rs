//! Per-field value decoding from raw legacy column values.
//!
//! Decoding is tolerant: text that should be JSON or a number but is not
//! passes through unchanged instead of failing the pass.

use rusqlite::types::Value as SqlValue;
use sediment_core::types::ColumnKind;
use serde_json::{Number, Value};

/// How one planned column is decoded. Chosen once during planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoder {
    /// Options-like and table fields: JSON text.
    Json,
    /// On/off toggle fields: strict boolean whatever the column type.
    Toggle,
    /// Everything else follows the physical column's kind.
    Column(ColumnKind),
}

/// Decode one raw value. `None` means the field contributes nothing,
/// including when the raw value decodes to JSON `null`.
pub fn decode_value(decoder: Decoder, raw: &SqlValue) -> Option<Value> {
    if is_absent(raw) {
        return None;
    }
    let decoded = match decoder {
        Decoder::Json => match raw {
            SqlValue::Text(s) => serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone())),
            other => passthrough(other),
        },
        Decoder::Toggle | Decoder::Column(ColumnKind::Boolean) => Value::Bool(truthy(raw)),
        Decoder::Column(ColumnKind::Integer) => to_integer(raw),
        Decoder::Column(ColumnKind::Float) => to_float(raw),
        Decoder::Column(ColumnKind::Text | ColumnKind::Other) => passthrough(raw),
    };
    (!decoded.is_null()).then_some(decoded)
}

fn is_absent(raw: &SqlValue) -> bool {
    match raw {
        SqlValue::Null => true,
        SqlValue::Text(s) => s.is_empty(),
        _ => false,
    }
}

/// Loose truthiness: `0`, `"0"`, `""` and `0.0` are false.
fn truthy(raw: &SqlValue) -> bool {
    match raw {
        SqlValue::Null => false,
        SqlValue::Integer(i) => *i != 0,
        SqlValue::Real(f) => *f != 0.0,
        SqlValue::Text(s) => !(s.is_empty() || s == "0"),
        SqlValue::Blob(b) => !(b.is_empty() || b.as_slice() == b"0"),
    }
}

fn to_integer(raw: &SqlValue) -> Value {
    match raw {
        SqlValue::Integer(i) => Value::from(*i),
        SqlValue::Real(f) if f.is_finite() => Value::from(f.trunc() as i64),
        SqlValue::Text(s) => {
            let t = s.trim();
            if let Ok(i) = t.parse::<i64>() {
                Value::from(i)
            } else {
                match t.parse::<f64>() {
                    Ok(f) if f.is_finite() => Value::from(f.trunc() as i64),
                    _ => Value::String(s.clone()),
                }
            }
        }
        other => passthrough(other),
    }
}

fn to_float(raw: &SqlValue) -> Value {
    let parsed = match raw {
        SqlValue::Integer(i) => Some(*i as f64),
        SqlValue::Real(f) => Some(*f),
        SqlValue::Text(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed.and_then(Number::from_f64) {
        Some(n) => Value::Number(n),
        None => passthrough(raw),
    }
}

fn passthrough(raw: &SqlValue) -> Value {
    match raw {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(i) => Value::from(*i),
        SqlValue::Real(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
        SqlValue::Text(s) => Value::String(s.clone()),
        SqlValue::Blob(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(s: &str) -> SqlValue {
        SqlValue::Text(s.to_string())
    }

    #[test]
    fn null_and_empty_are_absent() {
        for decoder in [Decoder::Json, Decoder::Toggle, Decoder::Column(ColumnKind::Text)] {
            assert_eq!(decode_value(decoder, &SqlValue::Null), None);
            assert_eq!(decode_value(decoder, &text("")), None);
        }
    }

    #[test]
    fn json_parses_or_passes_through() {
        assert_eq!(
            decode_value(Decoder::Json, &text(r#"["a","b"]"#)),
            Some(json!(["a", "b"]))
        );
        assert_eq!(
            decode_value(Decoder::Json, &text("not json")),
            Some(json!("not json"))
        );
    }

    #[test]
    fn toggle_coerces_to_strict_boolean() {
        assert_eq!(decode_value(Decoder::Toggle, &text("0")), Some(json!(false)));
        assert_eq!(decode_value(Decoder::Toggle, &text("1")), Some(json!(true)));
        assert_eq!(decode_value(Decoder::Toggle, &SqlValue::Integer(0)), Some(json!(false)));
        assert_eq!(decode_value(Decoder::Toggle, &text("yes")), Some(json!(true)));
    }

    #[test]
    fn integer_columns_coerce_text() {
        let d = Decoder::Column(ColumnKind::Integer);
        assert_eq!(decode_value(d, &text("42")), Some(json!(42)));
        assert_eq!(decode_value(d, &text(" 7 ")), Some(json!(7)));
        assert_eq!(decode_value(d, &text("3.9")), Some(json!(3)));
        assert_eq!(decode_value(d, &text("abc")), Some(json!("abc")));
    }

    #[test]
    fn float_columns_coerce_text() {
        let d = Decoder::Column(ColumnKind::Float);
        assert_eq!(decode_value(d, &text("1.25")), Some(json!(1.25)));
        assert_eq!(decode_value(d, &SqlValue::Integer(2)), Some(json!(2.0)));
        assert_eq!(decode_value(d, &text("n/a")), Some(json!("n/a")));
    }

    #[test]
    fn decoded_nulls_are_absent() {
        assert_eq!(decode_value(Decoder::Json, &text("null")), None);
        assert_eq!(decode_value(Decoder::Json, &text(" null ")), None);
        for kind in [ColumnKind::Integer, ColumnKind::Float, ColumnKind::Text] {
            let d = Decoder::Column(kind);
            assert_eq!(decode_value(d, &SqlValue::Real(f64::INFINITY)), None, "{kind:?}");
            assert_eq!(decode_value(d, &SqlValue::Real(f64::NAN)), None, "{kind:?}");
        }
        assert_eq!(decode_value(Decoder::Json, &text("0")), Some(json!(0)));
    }

    #[test]
    fn text_columns_pass_through() {
        let d = Decoder::Column(ColumnKind::Text);
        assert_eq!(decode_value(d, &text("#FF0000")), Some(json!("#FF0000")));
        assert_eq!(decode_value(d, &text("0")), Some(json!("0")));
    }
}
