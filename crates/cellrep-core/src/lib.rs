//! Cell tables with attached per-chain contig collections, and the
//! repertoire pipeline that fills them.

pub mod cell_table;
pub mod error;
pub mod pipeline;

pub use cell_table::{BARCODE_COLUMN, CellTable};
pub use error::{CoreError, Result};
pub use pipeline::{
    ChainSummary, PipelineOptions, PipelineResult, SequenceCount, run_pipeline,
};
