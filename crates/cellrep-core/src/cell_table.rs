//! The per-cell table and its attached record collections.

use std::collections::BTreeMap;

use cellrep_model::{
    Barcode, FieldType, FieldValue, ModelError, PrimaryIndex, RecordCollection, SchemaError,
    Selector,
};
use polars::prelude::*;

use crate::error::{CoreError, Result};

/// Name of the first column of every cell frame.
pub const BARCODE_COLUMN: &str = "barcode";

/// Cells in a fixed order, their scalar columns and any number of named
/// ragged collections (one group per cell).
///
/// Every attached collection and the frame have exactly one entry per
/// cell, and [`CellTable::subset`] keeps them that way.
#[derive(Debug, Clone)]
pub struct CellTable {
    index: PrimaryIndex,
    frame: DataFrame,
    collections: BTreeMap<String, RecordCollection>,
}

impl CellTable {
    /// A table with only the barcode column.
    pub fn new(index: PrimaryIndex) -> Result<Self> {
        let barcodes: Vec<&str> = index.iter().map(Barcode::as_str).collect();
        let frame = DataFrame::new(vec![Column::new(BARCODE_COLUMN.into(), barcodes)])?;
        Ok(Self {
            index,
            frame,
            collections: BTreeMap::new(),
        })
    }

    pub fn index(&self) -> &PrimaryIndex {
        &self.index
    }

    pub fn barcodes(&self) -> &[Barcode] {
        self.index.ids()
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Attaches `collection` under `name`, returning any collection it
    /// replaces. The collection must have one group per cell.
    pub fn attach(
        &mut self,
        name: impl Into<String>,
        collection: RecordCollection,
    ) -> Result<Option<RecordCollection>> {
        let name = name.into();
        if collection.len() != self.len() {
            return Err(shape_mismatch("attach", self.len(), collection.len()));
        }
        tracing::debug!(
            collection = %name,
            records = collection.total_records(),
            "attached collection"
        );
        Ok(self.collections.insert(name, collection))
    }

    pub fn collection(&self, name: &str) -> Result<&RecordCollection> {
        self.collections
            .get(name)
            .ok_or_else(|| CoreError::UnknownCollection {
                name: name.to_string(),
            })
    }

    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    pub fn collections(&self) -> &BTreeMap<String, RecordCollection> {
        &self.collections
    }

    /// Replaces an attached collection, e.g. after filtering it.
    pub fn replace(&mut self, name: &str, collection: RecordCollection) -> Result<()> {
        if !self.collections.contains_key(name) {
            return Err(CoreError::UnknownCollection {
                name: name.to_string(),
            });
        }
        self.attach(name, collection)?;
        Ok(())
    }

    /// Adds (or overwrites) a per-cell scalar column.
    pub fn add_column(
        &mut self,
        name: &str,
        field_type: FieldType,
        values: Vec<FieldValue>,
    ) -> Result<()> {
        if values.len() != self.len() {
            return Err(shape_mismatch("add_column", self.len(), values.len()));
        }
        if let Some(found) = values
            .iter()
            .find(|value| !value.conforms_to(field_type))
            .and_then(FieldValue::field_type)
        {
            return Err(ModelError::from(SchemaError::TypeMismatch {
                field: name.to_string(),
                expected: field_type,
                found,
            })
            .into());
        }

        let column = match field_type {
            FieldType::Text => Column::new(
                name.into(),
                values
                    .iter()
                    .map(|value| value.as_text().map(str::to_string))
                    .collect::<Vec<_>>(),
            ),
            FieldType::Integer => Column::new(
                name.into(),
                values.iter().map(FieldValue::as_i64).collect::<Vec<_>>(),
            ),
            FieldType::Float => Column::new(
                name.into(),
                values.iter().map(FieldValue::as_f64).collect::<Vec<_>>(),
            ),
            FieldType::Boolean => Column::new(
                name.into(),
                values.iter().map(FieldValue::as_bool).collect::<Vec<_>>(),
            ),
        };
        self.frame.with_column(column)?;
        Ok(())
    }

    /// Adds a per-cell count column.
    pub fn add_counts(&mut self, name: &str, counts: Vec<usize>) -> Result<()> {
        if counts.len() != self.len() {
            return Err(shape_mismatch("add_counts", self.len(), counts.len()));
        }
        let counts: Vec<u32> = counts
            .into_iter()
            .map(|count| u32::try_from(count).unwrap_or(u32::MAX))
            .collect();
        self.frame.with_column(Column::new(name.into(), counts))?;
        Ok(())
    }

    /// Keeps the cells chosen by `selector` in the index, the frame and
    /// every attached collection.
    pub fn subset(&self, selector: &Selector) -> Result<Self> {
        let positions = selector.resolve(self.len())?;
        let index = self.index.subset(&Selector::Positions(positions.clone()))?;

        let take: Vec<IdxSize> = positions.iter().map(|&pos| pos as IdxSize).collect();
        let frame = self.frame.take(&IdxCa::from_vec("take".into(), take))?;

        let by_position = Selector::Positions(positions);
        let collections = self
            .collections
            .iter()
            .map(|(name, collection)| Ok((name.clone(), collection.subset_outer(&by_position)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;

        Ok(Self {
            index,
            frame,
            collections,
        })
    }

    /// The per-cell DataFrame; its first column holds the barcodes.
    pub fn to_frame(&self) -> DataFrame {
        self.frame.clone()
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }
}

fn shape_mismatch(context: &'static str, expected: usize, found: usize) -> CoreError {
    ModelError::ShapeMismatch {
        context,
        expected: format!("{expected} cells"),
        found: format!("{found} entries"),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellrep_model::{FieldName, Record, RecordSchema, RecordTable};

    fn table() -> CellTable {
        let index = PrimaryIndex::from_strs(&["c1", "c2", "c3"]).unwrap();
        let schema = RecordSchema::from_pairs("barcode", &[("umis", FieldType::Integer)]).unwrap();
        let records = [("c1", 5_i64), ("c1", 2), ("c3", 9)]
            .into_iter()
            .map(|(cell, umis)| {
                Record::new(Barcode::new(cell).unwrap())
                    .with_field(FieldName::new("umis").unwrap(), umis)
            })
            .collect();
        let collection =
            RecordCollection::build(RecordTable::new(schema, records).unwrap(), &index);
        let mut table = CellTable::new(index).unwrap();
        table.attach("TRA", collection).unwrap();
        table
    }

    #[test]
    fn attach_checks_length() {
        let mut cells = table();
        let short = cells
            .collection("TRA")
            .unwrap()
            .subset_outer(&Selector::Positions(vec![0]))
            .unwrap();
        let err = cells.attach("TRB", short).unwrap_err();
        assert!(err.is_shape_mismatch());
        assert!(cells.collection("TRB").is_err());
    }

    #[test]
    fn unknown_collection() {
        let cells = table();
        assert!(matches!(
            cells.collection("IGH"),
            Err(CoreError::UnknownCollection { .. })
        ));
    }

    #[test]
    fn add_column_checks_length_and_type() {
        let mut cells = table();
        let err = cells
            .add_column("score", FieldType::Float, vec![FieldValue::Float(1.0)])
            .unwrap_err();
        assert!(err.is_shape_mismatch());

        let err = cells
            .add_column(
                "score",
                FieldType::Float,
                vec![
                    FieldValue::Float(1.0),
                    FieldValue::from("x"),
                    FieldValue::Missing,
                ],
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Model(ModelError::Schema(_))));

        cells
            .add_column(
                "TRA_cdr3",
                FieldType::Text,
                vec![FieldValue::from("CASS"), FieldValue::Missing, FieldValue::from("CAVR")],
            )
            .unwrap();
        let column = cells.frame().column("TRA_cdr3").unwrap();
        assert_eq!(column.null_count(), 1);
    }

    #[test]
    fn subset_keeps_everything_aligned() {
        let mut cells = table();
        cells.add_counts("TRA_contigs", vec![2, 0, 1]).unwrap();
        let subset = cells.subset(&Selector::Mask(vec![false, true, true])).unwrap();

        assert_eq!(subset.len(), 2);
        assert_eq!(subset.frame().height(), 2);
        assert_eq!(subset.collection("TRA").unwrap().lengths(), vec![0, 1]);
        let ids: Vec<&str> = subset.barcodes().iter().map(Barcode::as_str).collect();
        assert_eq!(ids, vec!["c2", "c3"]);
    }

    #[test]
    fn subset_rejects_repeated_cells() {
        let cells = table();
        let err = cells.subset(&Selector::Positions(vec![0, 0])).unwrap_err();
        assert!(matches!(err, CoreError::Model(ModelError::DuplicateKey { .. })));
    }
}
