//! Loading of V(D)J contig annotations and cell barcode lists.
//!
//! Contig tables are read with Polars and converted into
//! [`cellrep_model::RecordTable`]s; barcode lists become the
//! [`cellrep_model::PrimaryIndex`] that collections are grouped against.

pub mod barcodes;
pub mod contigs;
pub mod csv;
pub mod error;
pub mod values;

pub use barcodes::{barcodes_from_column, load_barcodes};
pub use contigs::{
    ContigLoadOptions, DEFAULT_KEY_COLUMN, dataframe_to_records, infer_schema, load_contig_table,
};
pub use self::csv::{read_csv_schema, read_csv_table};
pub use error::{IngestError, Result};
