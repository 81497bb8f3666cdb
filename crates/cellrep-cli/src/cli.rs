//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use cellrep_core::PipelineOptions;
use cellrep_model::TieBreak;

#[derive(Parser)]
#[command(
    name = "cellrep",
    version,
    about = "Attach V(D)J contigs to cells and collapse them per chain",
    long_about = "Group Cell Ranger contig annotations by cell barcode.\n\n\
                  Each chain becomes a per-cell collection that is filtered, annotated\n\
                  with sequence frequencies and collapsed to its dominant contig."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Attach contigs to cells and write the per-cell table.
    Attach(AttachArgs),

    /// Print the record schema inferred from a contig file.
    Schema(SchemaArgs),
}

#[derive(Parser)]
pub struct AttachArgs {
    /// Contig annotation CSV (e.g. filtered_contig_annotations.csv).
    #[arg(long = "contigs", value_name = "CSV")]
    pub contigs: PathBuf,

    /// Cell barcode list, one per line. Defaults to the barcodes seen in
    /// the contig file.
    #[arg(long = "barcodes", value_name = "TSV")]
    pub barcodes: Option<PathBuf>,

    /// Column linking contigs to cells.
    #[arg(long = "key", value_name = "COLUMN", default_value = "barcode")]
    pub key: String,

    /// Chains to attach; repeat for several.
    #[arg(long = "chain", value_name = "CHAIN", default_values = ["TRA", "TRB"])]
    pub chains: Vec<String>,

    /// Numeric field used to pick the dominant contig.
    #[arg(long = "rank", value_name = "FIELD", default_value = "umis")]
    pub rank: String,

    /// Field holding the clonotype sequence.
    #[arg(long = "sequence", value_name = "FIELD", default_value = "cdr3")]
    pub sequence: String,

    /// Keep non-productive contigs.
    #[arg(long = "all-contigs")]
    pub all_contigs: bool,

    /// Keep contigs that are not full length.
    #[arg(long = "keep-partial")]
    pub keep_partial: bool,

    /// Remove cells without any contig of the requested chains.
    #[arg(long = "drop-empty")]
    pub drop_empty: bool,

    /// Which contig wins when ranks tie.
    #[arg(long = "tie-break", value_enum, default_value = "first")]
    pub tie_break: TieBreakArg,

    /// Number of most frequent sequences to report per chain.
    #[arg(long = "top", value_name = "N", default_value_t = 5)]
    pub top: usize,

    /// Write the per-cell table to this CSV file.
    #[arg(long = "output", value_name = "CSV")]
    pub output: Option<PathBuf>,

    /// Write the run summary as JSON.
    #[arg(long = "json", value_name = "PATH")]
    pub json: Option<PathBuf>,
}

impl AttachArgs {
    /// Pipeline configuration selected by these flags.
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            key_column: self.key.clone(),
            chains: self.chains.clone(),
            rank_field: self.rank.clone(),
            sequence_field: self.sequence.clone(),
            productive_only: !self.all_contigs,
            full_length_only: !self.keep_partial,
            drop_empty_cells: self.drop_empty,
            tie_break: match self.tie_break {
                TieBreakArg::First => TieBreak::First,
                TieBreakArg::Last => TieBreak::Last,
            },
            top_sequences: self.top,
            ..PipelineOptions::default()
        }
    }
}

#[derive(Parser)]
pub struct SchemaArgs {
    /// Contig annotation CSV.
    #[arg(long = "contigs", value_name = "CSV")]
    pub contigs: PathBuf,

    /// Column linking contigs to cells.
    #[arg(long = "key", value_name = "COLUMN", default_value = "barcode")]
    pub key: String,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum TieBreakArg {
    First,
    Last,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
