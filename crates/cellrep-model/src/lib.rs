//! Per-cell ragged record collections.
//!
//! A [`RecordCollection`] attaches a variable number of secondary records
//! (for example the V(D)J contigs assembled for a cell) to every entry of a
//! fixed, ordered [`PrimaryIndex`] of cell barcodes. Collections support the
//! same entity-level subsetting as the primary table, so both can be kept
//! in lockstep, and convert explicitly between the grouped view (one slice
//! per cell) and the flat view (one row per record).
//!
//! # Example
//!
//! ```
//! use cellrep_model::{
//!     Barcode, FieldName, FieldType, PrimaryIndex, Record, RecordCollection, RecordSchema,
//!     RecordTable, TieBreak,
//! };
//!
//! let schema = RecordSchema::from_pairs("barcode", &[("umis", FieldType::Integer)])?;
//! let umis = FieldName::new("umis")?;
//! let records = vec![
//!     Record::new(Barcode::new("c1")?).with_field(umis.clone(), 5_i64),
//!     Record::new(Barcode::new("c3")?).with_field(umis.clone(), 9_i64),
//! ];
//! let index = PrimaryIndex::from_strs(&["c1", "c2", "c3"])?;
//! let collection = RecordCollection::build(RecordTable::new(schema, records)?, &index);
//!
//! assert_eq!(collection.lengths(), vec![1, 0, 1]);
//! let best = collection.collapse("umis", TieBreak::First)?;
//! assert!(best[1].is_none());
//! # Ok::<(), cellrep_model::ModelError>(())
//! ```

pub mod collection;
pub mod error;
pub mod ids;
pub mod index;
pub mod ragged;
pub mod record;
pub mod selector;
pub mod value;

pub use collection::{BuildReport, RecordCollection, TieBreak};
pub use error::{ModelError, Result, SchemaError};
pub use ids::{Barcode, FieldName};
pub use index::PrimaryIndex;
pub use ragged::{Grouping, Ragged};
pub use record::{FieldSpec, Record, RecordSchema, RecordTable};
pub use selector::Selector;
pub use value::{FieldScalar, FieldType, FieldValue, RankKey};
