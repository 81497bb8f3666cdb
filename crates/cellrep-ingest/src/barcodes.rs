//! Primary index sources: barcode lists and key columns.

use std::collections::HashSet;
use std::path::Path;

use cellrep_model::{Barcode, PrimaryIndex};
use polars::prelude::*;

use crate::error::{IngestError, Result};
use crate::values::any_to_key;

/// Reads a barcode list (one barcode per line, first tab-separated column).
///
/// Blank lines are skipped; repeated barcodes are rejected.
pub fn load_barcodes(path: &Path) -> Result<PrimaryIndex> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|source| barcode_error(path, source))?;

    let mut ids = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|source| barcode_error(path, source))?;
        let Some(first) = row.get(0).map(str::trim) else {
            continue;
        };
        if first.is_empty() {
            continue;
        }
        ids.push(Barcode::new(first)?);
    }

    let index = PrimaryIndex::new(ids)?;
    tracing::info!(path = %path.display(), cells = index.len(), "loaded barcodes");
    Ok(index)
}

fn barcode_error(path: &Path, source: csv::Error) -> IngestError {
    if let csv::ErrorKind::Io(io) = source.kind()
        && io.kind() == std::io::ErrorKind::NotFound
    {
        return IngestError::FileNotFound {
            path: path.to_path_buf(),
        };
    }
    IngestError::BarcodeRead {
        path: path.to_path_buf(),
        source,
    }
}

/// Unique values of `column` in first-seen order. Missing keys are ignored.
pub fn barcodes_from_column(df: &DataFrame, column: &str) -> Result<PrimaryIndex> {
    let series = df.column(column).map_err(|_| IngestError::ColumnNotFound {
        column: column.to_string(),
    })?;

    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for idx in 0..df.height() {
        let Some(key) = any_to_key(series.get(idx).unwrap_or(AnyValue::Null)) else {
            continue;
        };
        if seen.insert(key.clone()) {
            ids.push(Barcode::new(key)?);
        }
    }
    Ok(PrimaryIndex::new(ids)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn reads_first_column_and_skips_blank_lines() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "AAAC-1\textra\n\nAAAG-1\n   \nAACT-1\n").unwrap();
        let index = load_barcodes(file.path()).unwrap();
        let ids: Vec<&str> = index.iter().map(Barcode::as_str).collect();
        assert_eq!(ids, vec!["AAAC-1", "AAAG-1", "AACT-1"]);
    }

    #[test]
    fn duplicate_barcodes_fail() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "AAAC-1\nAAAC-1\n").unwrap();
        let result = load_barcodes(file.path());
        assert!(matches!(result, Err(IngestError::Model(_))));
    }

    #[test]
    fn missing_barcode_file() {
        let result = load_barcodes(Path::new("/nonexistent/barcodes.tsv"));
        assert!(matches!(result, Err(IngestError::FileNotFound { .. })));
    }

    #[test]
    fn unique_values_in_first_seen_order() {
        let df = df!["barcode" => ["c2", "c1", "c2", "", "c3"]].unwrap();
        let index = barcodes_from_column(&df, "barcode").unwrap();
        let ids: Vec<&str> = index.iter().map(Barcode::as_str).collect();
        assert_eq!(ids, vec!["c2", "c1", "c3"]);
    }
}
