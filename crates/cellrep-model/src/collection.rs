//! Ragged record collections aligned to a primary index.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result, SchemaError};
use crate::index::PrimaryIndex;
use crate::ragged::{Grouping, Ragged};
use crate::record::{Record, RecordSchema, RecordTable};
use crate::selector::Selector;
use crate::value::{FieldScalar, FieldValue, RankKey};

/// Which record wins when several share the maximal rank value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TieBreak {
    /// The first maximal record in stable input order.
    #[default]
    First,
    /// The last maximal record in stable input order.
    Last,
}

/// Counts from [`RecordCollection::build_with_report`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Records placed under an index entry.
    pub kept: usize,
    /// Records whose barcode is not in the index.
    pub dropped: usize,
}

/// For every entity of a primary index, the ordered records it owns.
///
/// The outer length always equals the length of the index the collection
/// was built from (or of the selector last applied through
/// [`RecordCollection::subset_outer`]).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordCollection {
    schema: RecordSchema,
    groups: Ragged<Record>,
}

impl RecordCollection {
    /// Groups the rows of `table` by barcode against `index`.
    pub fn build(table: RecordTable, index: &PrimaryIndex) -> Self {
        Self::build_with_report(table, index).0
    }

    /// Like [`RecordCollection::build`], also reporting how many records
    /// were dropped because their barcode is not in the index.
    pub fn build_with_report(table: RecordTable, index: &PrimaryIndex) -> (Self, BuildReport) {
        let (schema, records) = table.into_parts();
        let total = records.len();
        let (groups, dropped) = Ragged::group_by_key(records, index.len(), |record| {
            index.position(record.barcode.as_str())
        });
        if dropped > 0 {
            tracing::debug!(
                dropped,
                total,
                "records with barcodes outside the primary index were dropped"
            );
        }
        let report = BuildReport {
            kept: total - dropped,
            dropped,
        };
        (Self { schema, groups }, report)
    }

    /// Wraps already-grouped records, validating each against `schema`.
    pub fn from_parts(schema: RecordSchema, groups: Ragged<Record>) -> Result<Self> {
        for record in groups.values() {
            schema.validate(record)?;
        }
        Ok(Self { schema, groups })
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    pub fn groups(&self) -> &Ragged<Record> {
        &self.groups
    }

    /// Outer length N.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&[Record]> {
        self.groups.get(index)
    }

    pub fn lengths(&self) -> Vec<usize> {
        self.groups.lengths()
    }

    pub fn total_records(&self) -> usize {
        self.groups.total_len()
    }

    /// One value of `field` per record, with the collection's shape.
    pub fn project(&self, field: &str) -> Result<Ragged<FieldValue>> {
        self.schema.require(field)?;
        Ok(self
            .groups
            .map(|record| record.get(field).cloned().unwrap_or(FieldValue::Missing)))
    }

    /// Typed projection; missing values become `None`.
    pub fn project_as<T: FieldScalar>(&self, field: &str) -> Result<Ragged<Option<T>>> {
        let found = self.schema.require(field)?;
        if !T::accepts(found) {
            return Err(SchemaError::TypeMismatch {
                field: field.to_string(),
                expected: T::FIELD_TYPE,
                found,
            }
            .into());
        }
        Ok(self
            .groups
            .map(|record| record.get(field).and_then(T::from_value)))
    }

    /// Keeps records whose mask value is true. Outer length is unchanged.
    pub fn filter_inner(&self, mask: &Ragged<bool>) -> Result<Self> {
        Ok(Self {
            schema: self.schema.clone(),
            groups: self.groups.filter_inner(mask)?,
        })
    }

    /// Keeps records whose value of `field` satisfies `predicate`.
    pub fn retain_where(
        &self,
        field: &str,
        mut predicate: impl FnMut(&FieldValue) -> bool,
    ) -> Result<Self> {
        let mask = self.project(field)?.map(|value| predicate(value));
        self.filter_inner(&mask)
    }

    /// Selects whole entities, e.g. to follow a filtered cell table.
    pub fn subset_outer(&self, selector: &Selector) -> Result<Self> {
        Ok(Self {
            schema: self.schema.clone(),
            groups: self.groups.subset_outer(selector)?,
        })
    }

    /// One row per record in outer-then-inner order, plus the grouping
    /// that [`RecordCollection::regroup`] needs to invert this.
    pub fn flatten(&self) -> (RecordTable, Grouping) {
        self.clone().into_flat()
    }

    pub fn into_flat(self) -> (RecordTable, Grouping) {
        let keys: Vec<Option<String>> = self.groups.iter().map(shared_barcode).collect();
        let (records, grouping) = self.groups.into_flat();
        let grouping = grouping.keyed(keys);
        (RecordTable::from_validated(self.schema, records), grouping)
    }

    /// Rebuilds a collection from flat rows.
    ///
    /// The table may have gained columns, or had rows reordered inside a
    /// group, since it was flattened. Every entry must still receive as
    /// many rows as the grouping records, all owned by the barcode the
    /// entry held when flattened.
    pub fn regroup(table: RecordTable, grouping: &Grouping) -> Result<Self> {
        let (schema, records) = table.into_parts();
        let groups = Ragged::regroup(records, grouping)?;
        for (entry, group) in groups.iter().enumerate() {
            let Some(key) = grouping.key(entry) else {
                continue;
            };
            if let Some(stray) = group.iter().find(|record| record.barcode.as_str() != key) {
                return Err(ModelError::ShapeMismatch {
                    context: "regroup",
                    expected: format!("rows of '{key}' at entry {entry}"),
                    found: format!("a row of '{}'", stray.barcode),
                });
            }
        }
        Ok(Self { schema, groups })
    }

    /// Picks the record with the largest value of `rank_field` for every
    /// entity.
    ///
    /// Entities without records, or whose records all lack a rank value,
    /// yield `None`. Ties are resolved by `tie_break` in stable order.
    pub fn collapse(&self, rank_field: &str, tie_break: TieBreak) -> Result<Vec<Option<Record>>> {
        let found = self.schema.require(rank_field)?;
        if !found.is_numeric() {
            return Err(SchemaError::NotRankable {
                field: rank_field.to_string(),
                found,
            }
            .into());
        }
        Ok(self
            .groups
            .iter()
            .map(|group| pick_max(group, rank_field, tie_break).cloned())
            .collect())
    }

    /// Positions of `collapse` winners inside their groups.
    pub fn collapse_positions(
        &self,
        rank_field: &str,
        tie_break: TieBreak,
    ) -> Result<Vec<Option<usize>>> {
        let found = self.schema.require(rank_field)?;
        if !found.is_numeric() {
            return Err(ModelError::from(SchemaError::NotRankable {
                field: rank_field.to_string(),
                found,
            }));
        }
        Ok(self
            .groups
            .iter()
            .map(|group| {
                pick_max(group, rank_field, tie_break).and_then(|winner| {
                    group.iter().position(|record| std::ptr::eq(record, winner))
                })
            })
            .collect())
    }
}

/// Barcode shared by every record of a non-empty group.
fn shared_barcode(group: &[Record]) -> Option<String> {
    let first = group.first()?;
    group
        .iter()
        .all(|record| record.barcode == first.barcode)
        .then(|| first.barcode.to_string())
}

fn pick_max<'a>(group: &'a [Record], rank_field: &str, tie_break: TieBreak) -> Option<&'a Record> {
    let mut best: Option<(RankKey, &Record)> = None;
    for record in group {
        let Some(key) = record.get(rank_field).and_then(FieldValue::rank_key) else {
            continue;
        };
        let replace = match best {
            None => true,
            Some((current, _)) => match tie_break {
                TieBreak::First => key > current,
                TieBreak::Last => key >= current,
            },
        };
        if replace {
            best = Some((key, record));
        }
    }
    best.map(|(_, record)| record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{Barcode, FieldName};
    use crate::value::FieldType;

    fn table(rows: &[(&str, Option<i64>)]) -> RecordTable {
        let schema = RecordSchema::from_pairs("barcode", &[("umis", FieldType::Integer)]).unwrap();
        let records = rows
            .iter()
            .map(|(barcode, umis)| {
                Record::new(Barcode::new(*barcode).unwrap())
                    .with_field(FieldName::new("umis").unwrap(), *umis)
            })
            .collect();
        RecordTable::new(schema, records).unwrap()
    }

    #[test]
    fn build_reports_dropped_records() {
        let index = PrimaryIndex::from_strs(&["c1", "c2"]).unwrap();
        let (collection, report) =
            RecordCollection::build_with_report(table(&[("c1", Some(1)), ("zz", Some(2))]), &index);
        assert_eq!(report, BuildReport { kept: 1, dropped: 1 });
        assert_eq!(collection.lengths(), vec![1, 0]);
    }

    #[test]
    fn collapse_skips_missing_rank_values() {
        let index = PrimaryIndex::from_strs(&["c1", "c2"]).unwrap();
        let collection = RecordCollection::build(
            table(&[("c1", None), ("c1", Some(3)), ("c2", None)]),
            &index,
        );
        let picked = collection.collapse("umis", TieBreak::First).unwrap();
        assert_eq!(
            picked[0].as_ref().and_then(|r| r.get("umis")),
            Some(&FieldValue::Integer(3))
        );
        assert!(picked[1].is_none());
        assert_eq!(
            collection.collapse_positions("umis", TieBreak::First).unwrap(),
            vec![Some(1), None]
        );
    }

    #[test]
    fn project_as_checks_type() {
        let index = PrimaryIndex::from_strs(&["c1"]).unwrap();
        let collection = RecordCollection::build(table(&[("c1", Some(4))]), &index);
        let as_float = collection.project_as::<f64>("umis").unwrap();
        assert_eq!(&as_float[0], &[Some(4.0)]);
        assert!(matches!(
            collection.project_as::<bool>("umis"),
            Err(ModelError::Schema(SchemaError::TypeMismatch { .. }))
        ));
    }

    #[test]
    fn collapse_rejects_text_rank_field() {
        let schema = RecordSchema::from_pairs("barcode", &[("cdr3", FieldType::Text)]).unwrap();
        let index = PrimaryIndex::from_strs(&["c1"]).unwrap();
        let collection = RecordCollection::build(RecordTable::empty(schema), &index);
        assert!(matches!(
            collection.collapse("cdr3", TieBreak::First),
            Err(ModelError::Schema(SchemaError::NotRankable { .. }))
        ));
    }

    #[test]
    fn collapse_orders_large_integers_exactly() {
        let index = PrimaryIndex::from_strs(&["c1"]).unwrap();
        let big = 1_i64 << 53;
        let collection = RecordCollection::build(
            table(&[("c1", Some(big + 1)), ("c1", Some(big))]),
            &index,
        );
        assert_eq!(
            collection.collapse_positions("umis", TieBreak::Last).unwrap(),
            vec![Some(0)]
        );
    }
}
