//! Conversions from Polars cells to record field values.

use cellrep_model::{FieldType, FieldValue};
use polars::prelude::*;

use crate::error::{IngestError, Result};

/// Text markers treated as missing values. Cell Ranger writes `None` for
/// absent genes and clonotypes.
const NULL_MARKERS: &[&str] = &["", "None"];

fn is_null_marker(text: &str) -> bool {
    NULL_MARKERS.contains(&text.trim())
}

fn parse_bool_literal(text: &str) -> Option<bool> {
    match text.trim() {
        "True" | "true" | "TRUE" => Some(true),
        "False" | "false" | "FALSE" => Some(false),
        _ => None,
    }
}

/// Maps a Polars dtype onto a record field type.
pub fn field_type_for_dtype(column: &str, dtype: &DataType) -> Result<FieldType> {
    match dtype {
        DataType::Boolean => Ok(FieldType::Boolean),
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => Ok(FieldType::Integer),
        DataType::Float32 | DataType::Float64 => Ok(FieldType::Float),
        DataType::String | DataType::Null => Ok(FieldType::Text),
        other => Err(IngestError::UnsupportedColumnType {
            column: column.to_string(),
            dtype: other.to_string(),
        }),
    }
}

/// Infers the field type of a column.
///
/// String columns whose non-missing values are all boolean literals
/// (`True`/`False` in Cell Ranger output) are reported as `Boolean`.
pub fn infer_field_type(column: &Column) -> Result<FieldType> {
    let name = column.name().as_str();
    let field_type = field_type_for_dtype(name, column.dtype())?;
    if field_type != FieldType::Text || !matches!(column.dtype(), DataType::String) {
        return Ok(field_type);
    }

    let strings = column.str()?;
    let mut seen_literal = false;
    for value in strings.into_iter().flatten() {
        if is_null_marker(value) {
            continue;
        }
        if parse_bool_literal(value).is_none() {
            return Ok(FieldType::Text);
        }
        seen_literal = true;
    }
    Ok(if seen_literal {
        FieldType::Boolean
    } else {
        FieldType::Text
    })
}

/// Converts one Polars cell into a value of `field_type`.
///
/// Values that cannot be represented become [`FieldValue::Missing`].
pub fn any_to_field_value(value: AnyValue<'_>, field_type: FieldType) -> FieldValue {
    match (field_type, value) {
        (_, AnyValue::Null) => FieldValue::Missing,
        (FieldType::Boolean, AnyValue::Boolean(b)) => FieldValue::Boolean(b),
        (FieldType::Boolean, AnyValue::String(s)) => {
            parse_bool_literal(s).map_or(FieldValue::Missing, FieldValue::Boolean)
        }
        (FieldType::Boolean, AnyValue::StringOwned(s)) => {
            parse_bool_literal(s.as_str()).map_or(FieldValue::Missing, FieldValue::Boolean)
        }
        (FieldType::Integer, AnyValue::Int8(v)) => FieldValue::Integer(i64::from(v)),
        (FieldType::Integer, AnyValue::Int16(v)) => FieldValue::Integer(i64::from(v)),
        (FieldType::Integer, AnyValue::Int32(v)) => FieldValue::Integer(i64::from(v)),
        (FieldType::Integer, AnyValue::Int64(v)) => FieldValue::Integer(v),
        (FieldType::Integer, AnyValue::UInt8(v)) => FieldValue::Integer(i64::from(v)),
        (FieldType::Integer, AnyValue::UInt16(v)) => FieldValue::Integer(i64::from(v)),
        (FieldType::Integer, AnyValue::UInt32(v)) => FieldValue::Integer(i64::from(v)),
        (FieldType::Integer, AnyValue::UInt64(v)) => {
            i64::try_from(v).map_or(FieldValue::Missing, FieldValue::Integer)
        }
        (FieldType::Float, AnyValue::Float32(v)) => FieldValue::Float(f64::from(v)),
        (FieldType::Float, AnyValue::Float64(v)) => FieldValue::Float(v),
        (FieldType::Text, AnyValue::String(s)) => text_value(s),
        (FieldType::Text, AnyValue::StringOwned(s)) => text_value(s.as_str()),
        (FieldType::Text, other) => text_value(&other.to_string()),
        _ => FieldValue::Missing,
    }
}

fn text_value(text: &str) -> FieldValue {
    if is_null_marker(text) {
        FieldValue::Missing
    } else {
        FieldValue::Text(text.to_string())
    }
}

/// Renders a key cell as text, or `None` when it is missing.
pub fn any_to_key(value: AnyValue<'_>) -> Option<String> {
    let text = match value {
        AnyValue::Null => return None,
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        other => other.to_string(),
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_boolean_from_literals() {
        let column = Column::new(
            "productive".into(),
            &[Some("True"), None, Some("False"), Some("None")],
        );
        assert_eq!(infer_field_type(&column).unwrap(), FieldType::Boolean);
    }

    #[test]
    fn keeps_mixed_text() {
        let column = Column::new("chain".into(), &["TRA", "True"]);
        assert_eq!(infer_field_type(&column).unwrap(), FieldType::Text);
    }

    #[test]
    fn all_missing_text_stays_text() {
        let column = Column::new("d_gene".into(), &["None", "None"]);
        assert_eq!(infer_field_type(&column).unwrap(), FieldType::Text);
    }

    #[test]
    fn numeric_dtypes() {
        assert_eq!(
            field_type_for_dtype("umis", &DataType::Int64).unwrap(),
            FieldType::Integer
        );
        assert_eq!(
            field_type_for_dtype("score", &DataType::Float32).unwrap(),
            FieldType::Float
        );
        assert!(matches!(
            field_type_for_dtype("genes", &DataType::List(Box::new(DataType::String))),
            Err(IngestError::UnsupportedColumnType { .. })
        ));
    }

    #[test]
    fn converts_cells() {
        assert_eq!(
            any_to_field_value(AnyValue::String("True"), FieldType::Boolean),
            FieldValue::Boolean(true)
        );
        assert_eq!(
            any_to_field_value(AnyValue::Int32(7), FieldType::Integer),
            FieldValue::Integer(7)
        );
        assert_eq!(
            any_to_field_value(AnyValue::String("None"), FieldType::Text),
            FieldValue::Missing
        );
        assert_eq!(
            any_to_field_value(AnyValue::Null, FieldType::Float),
            FieldValue::Missing
        );
    }

    #[test]
    fn key_cells() {
        assert_eq!(
            any_to_key(AnyValue::String(" AAAC-1 ")),
            Some("AAAC-1".to_string())
        );
        assert_eq!(any_to_key(AnyValue::String("  ")), None);
        assert_eq!(any_to_key(AnyValue::Null), None);
    }
}
