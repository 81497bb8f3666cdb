//! Records, the record schema and the flat record table.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result, SchemaError};
use crate::ids::{Barcode, FieldName};
use crate::value::{FieldType, FieldValue};

static MISSING: FieldValue = FieldValue::Missing;

/// A declared field of the record schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: FieldName,
    pub field_type: FieldType,
}

impl FieldSpec {
    pub fn new(name: FieldName, field_type: FieldType) -> Self {
        Self { name, field_type }
    }
}

/// Ordered field declarations shared by every record of a table.
///
/// The key field (the foreign key into the primary index) is named
/// separately and is not part of `fields`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSchema {
    key: FieldName,
    fields: Vec<FieldSpec>,
}

impl RecordSchema {
    pub fn new(key: FieldName, fields: Vec<FieldSpec>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        seen.insert(key.as_str().to_string());
        for spec in &fields {
            if !seen.insert(spec.name.as_str().to_string()) {
                return Err(ModelError::DuplicateField(spec.name.to_string()));
            }
        }
        Ok(Self { key, fields })
    }

    /// Builds a schema from `(name, type)` pairs.
    pub fn from_pairs(key: &str, pairs: &[(&str, FieldType)]) -> Result<Self> {
        let fields = pairs
            .iter()
            .map(|(name, field_type)| -> Result<FieldSpec> {
                Ok(FieldSpec::new(FieldName::new(*name)?, *field_type))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(FieldName::new(key)?, fields)
    }

    pub fn key(&self) -> &FieldName {
        &self.key
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.field_type(name).is_some()
    }

    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields
            .iter()
            .find(|spec| spec.name.as_str() == name)
            .map(|spec| spec.field_type)
    }

    /// Type of `name`, failing with [`SchemaError::UnknownField`].
    pub fn require(&self, name: &str) -> Result<FieldType> {
        self.field_type(name).ok_or_else(|| {
            SchemaError::UnknownField {
                field: name.to_string(),
            }
            .into()
        })
    }

    /// Requires `name` to be declared with exactly `expected`.
    pub fn require_type(&self, name: &str, expected: FieldType) -> Result<()> {
        let found = self.require(name)?;
        if found != expected {
            return Err(SchemaError::TypeMismatch {
                field: name.to_string(),
                expected,
                found,
            }
            .into());
        }
        Ok(())
    }

    /// A copy of this schema with one more field appended.
    pub fn with_field(&self, spec: FieldSpec) -> Result<Self> {
        let mut fields = self.fields.clone();
        fields.push(spec);
        Self::new(self.key.clone(), fields)
    }

    /// A copy of this schema without `name`.
    pub fn without_field(&self, name: &str) -> Result<Self> {
        self.require(name)?;
        let fields = self
            .fields
            .iter()
            .filter(|spec| spec.name.as_str() != name)
            .cloned()
            .collect();
        Ok(Self {
            key: self.key.clone(),
            fields,
        })
    }

    /// Checks that `record` carries exactly the declared fields with
    /// conforming values.
    pub fn validate(&self, record: &Record) -> Result<()> {
        for spec in &self.fields {
            let Some(value) = record.fields.get(spec.name.as_str()) else {
                return Err(SchemaError::MissingField {
                    barcode: record.barcode.to_string(),
                    field: spec.name.to_string(),
                }
                .into());
            };
            if let Some(found) = value.field_type()
                && found != spec.field_type
            {
                return Err(SchemaError::TypeMismatch {
                    field: spec.name.to_string(),
                    expected: spec.field_type,
                    found,
                }
                .into());
            }
        }
        if record.fields.len() != self.fields.len()
            && let Some(extra) = record.fields.keys().find(|name| !self.contains(name.as_str()))
        {
            return Err(SchemaError::UnexpectedField {
                barcode: record.barcode.to_string(),
                field: extra.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// One secondary observation (e.g. a single assembled contig) owned by
/// exactly one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub barcode: Barcode,
    pub fields: BTreeMap<FieldName, FieldValue>,
}

impl Record {
    pub fn new(barcode: Barcode) -> Self {
        Self {
            barcode,
            fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, name: FieldName, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name, value.into());
        self
    }

    pub fn set(&mut self, name: FieldName, value: impl Into<FieldValue>) {
        self.fields.insert(name, value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

/// The flat view: one row per record, all conforming to one schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordTable {
    schema: RecordSchema,
    records: Vec<Record>,
}

impl RecordTable {
    /// Validates every record against `schema`.
    pub fn new(schema: RecordSchema, records: Vec<Record>) -> Result<Self> {
        for record in &records {
            schema.validate(record)?;
        }
        Ok(Self { schema, records })
    }

    pub fn empty(schema: RecordSchema) -> Self {
        Self {
            schema,
            records: Vec::new(),
        }
    }

    /// Records already known to conform, e.g. taken from a collection.
    pub(crate) fn from_validated(schema: RecordSchema, records: Vec<Record>) -> Self {
        Self { schema, records }
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn into_parts(self) -> (RecordSchema, Vec<Record>) {
        (self.schema, self.records)
    }

    pub fn push(&mut self, record: Record) -> Result<()> {
        self.schema.validate(&record)?;
        self.records.push(record);
        Ok(())
    }

    /// Values of one field, in row order.
    pub fn column(&self, name: &str) -> Result<Vec<&FieldValue>> {
        self.schema.require(name)?;
        Ok(self
            .records
            .iter()
            .map(|record| record.get(name).unwrap_or(&MISSING))
            .collect())
    }

    /// Appends a derived per-record column. `values` must hold one value
    /// per row, in row order.
    pub fn with_column(
        self,
        name: FieldName,
        field_type: FieldType,
        values: Vec<FieldValue>,
    ) -> Result<Self> {
        if values.len() != self.records.len() {
            return Err(ModelError::shape(
                "with_column",
                format_args!("{} values", self.records.len()),
                format_args!("{} values", values.len()),
            ));
        }
        if let Some(found) = values
            .iter()
            .find(|value| !value.conforms_to(field_type))
            .and_then(FieldValue::field_type)
        {
            return Err(SchemaError::TypeMismatch {
                field: name.to_string(),
                expected: field_type,
                found,
            }
            .into());
        }
        let schema = self
            .schema
            .with_field(FieldSpec::new(name.clone(), field_type))?;
        let records = self
            .records
            .into_iter()
            .zip(values)
            .map(|(mut record, value)| {
                record.set(name.clone(), value);
                record
            })
            .collect();
        Ok(Self { schema, records })
    }

    /// Removes a field from the schema and from every row.
    pub fn without_column(self, name: &str) -> Result<Self> {
        let schema = self.schema.without_field(name)?;
        let records = self
            .records
            .into_iter()
            .map(|mut record| {
                record.fields.remove(name);
                record
            })
            .collect();
        Ok(Self { schema, records })
    }

    /// Rows for which `predicate` holds, in input order.
    pub fn filter(&self, mut predicate: impl FnMut(&Record) -> bool) -> Self {
        Self {
            schema: self.schema.clone(),
            records: self
                .records
                .iter()
                .filter(|&record| predicate(record))
                .cloned()
                .collect(),
        }
    }

    /// Splits rows by the value of a text field. Rows keep their input
    /// order inside each part; rows with a missing value are left out.
    pub fn split_by(&self, field: &str) -> Result<BTreeMap<String, RecordTable>> {
        self.schema.require_type(field, FieldType::Text)?;
        let mut parts: BTreeMap<String, RecordTable> = BTreeMap::new();
        for record in &self.records {
            let Some(value) = record.get(field).and_then(FieldValue::as_text) else {
                continue;
            };
            parts
                .entry(value.to_string())
                .or_insert_with(|| RecordTable::empty(self.schema.clone()))
                .records
                .push(record.clone());
        }
        Ok(parts)
    }
}

impl<'a> IntoIterator for &'a RecordTable {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
