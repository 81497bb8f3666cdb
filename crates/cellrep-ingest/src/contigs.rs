//! Loading contig annotation tables into record tables.

use std::path::Path;

use cellrep_model::{Barcode, FieldName, FieldSpec, Record, RecordSchema, RecordTable};
use polars::prelude::*;

use crate::csv::{read_csv_schema, read_csv_table};
use crate::error::{IngestError, Result};
use crate::values::{any_to_field_value, any_to_key, infer_field_type};

/// Key column of Cell Ranger contig annotations.
pub const DEFAULT_KEY_COLUMN: &str = "barcode";

/// Options for [`load_contig_table`].
#[derive(Debug, Clone)]
pub struct ContigLoadOptions {
    /// Column naming the owning cell.
    pub key_column: String,
    /// Columns to keep besides the key; `None` keeps all of them.
    pub columns: Option<Vec<String>>,
}

impl Default for ContigLoadOptions {
    fn default() -> Self {
        Self {
            key_column: DEFAULT_KEY_COLUMN.to_string(),
            columns: None,
        }
    }
}

impl ContigLoadOptions {
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }
}

/// Reads a contig annotation CSV into a [`RecordTable`].
pub fn load_contig_table(path: &Path, options: &ContigLoadOptions) -> Result<RecordTable> {
    let headers = read_csv_schema(path)?;
    if !headers.iter().any(|h| h == &options.key_column) {
        return Err(IngestError::MissingColumn {
            column: options.key_column.clone(),
            path: path.to_path_buf(),
        });
    }
    if let Some(columns) = &options.columns
        && let Some(missing) = columns.iter().find(|c| !headers.contains(c))
    {
        return Err(IngestError::MissingColumn {
            column: missing.clone(),
            path: path.to_path_buf(),
        });
    }

    let df = read_csv_table(path)?;
    let table = dataframe_to_records(&df, &options.key_column, options.columns.as_deref())?;
    tracing::info!(
        path = %path.display(),
        records = table.len(),
        fields = table.schema().len(),
        "loaded contig table"
    );
    Ok(table)
}

/// Infers the record schema of a DataFrame without converting its rows.
pub fn infer_schema(
    df: &DataFrame,
    key_column: &str,
    columns: Option<&[String]>,
) -> Result<RecordSchema> {
    if df.column(key_column).is_err() {
        return Err(IngestError::ColumnNotFound {
            column: key_column.to_string(),
        });
    }

    let mut fields = Vec::new();
    for name in field_columns(df, key_column, columns) {
        let column = df.column(&name).map_err(|_| IngestError::ColumnNotFound {
            column: name.clone(),
        })?;
        fields.push(FieldSpec::new(
            FieldName::new(name.as_str())?,
            infer_field_type(column)?,
        ));
    }
    Ok(RecordSchema::new(FieldName::new(key_column)?, fields)?)
}

/// Converts DataFrame rows into records keyed by `key_column`.
///
/// Rows with an empty key are skipped.
pub fn dataframe_to_records(
    df: &DataFrame,
    key_column: &str,
    columns: Option<&[String]>,
) -> Result<RecordTable> {
    let schema = infer_schema(df, key_column, columns)?;
    let key_series = df.column(key_column)?;
    let field_columns = schema
        .fields()
        .iter()
        .map(|spec| Ok((spec, df.column(spec.name.as_str())?)))
        .collect::<Result<Vec<_>>>()?;

    let mut records = Vec::with_capacity(df.height());
    let mut skipped = 0usize;
    for idx in 0..df.height() {
        let Some(key) = any_to_key(key_series.get(idx).unwrap_or(AnyValue::Null)) else {
            skipped += 1;
            continue;
        };
        let mut record = Record::new(Barcode::new(key)?);
        for (spec, column) in &field_columns {
            let value = column.get(idx).unwrap_or(AnyValue::Null);
            record.set(spec.name.clone(), any_to_field_value(value, spec.field_type));
        }
        records.push(record);
    }

    if skipped > 0 {
        tracing::warn!(skipped, key_column, "skipped rows with an empty key");
    }

    Ok(RecordTable::new(schema, records)?)
}

fn field_columns(df: &DataFrame, key_column: &str, columns: Option<&[String]>) -> Vec<String> {
    match columns {
        Some(columns) => columns
            .iter()
            .filter(|c| c.as_str() != key_column)
            .cloned()
            .collect(),
        None => df
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .filter(|name| name != key_column)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellrep_model::{FieldType, FieldValue};

    fn contigs() -> DataFrame {
        df![
            "barcode" => ["c1", "c1", "", "c3"],
            "chain" => ["TRA", "TRB", "TRA", "TRB"],
            "productive" => ["True", "False", "True", "True"],
            "umis" => [5i64, 2, 1, 9],
        ]
        .unwrap()
    }

    #[test]
    fn converts_rows_and_skips_empty_keys() {
        let table = dataframe_to_records(&contigs(), "barcode", None).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.schema().field_type("productive"), Some(FieldType::Boolean));
        assert_eq!(table.schema().field_type("umis"), Some(FieldType::Integer));
        let first = &table.records()[0];
        assert_eq!(first.barcode.as_str(), "c1");
        assert_eq!(first.get("productive"), Some(&FieldValue::Boolean(true)));
    }

    #[test]
    fn restricts_to_selected_columns() {
        let columns = vec!["umis".to_string()];
        let table = dataframe_to_records(&contigs(), "barcode", Some(&columns)).unwrap();
        assert_eq!(table.schema().len(), 1);
        assert!(table.schema().contains("umis"));
        assert!(!table.schema().contains("chain"));
    }

    #[test]
    fn missing_key_column() {
        let result = dataframe_to_records(&contigs(), "cell_id", None);
        assert!(matches!(result, Err(IngestError::ColumnNotFound { .. })));
    }
}
