use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use comfy_table::Table;
use polars::prelude::{CsvWriter, SerWriter};
use serde::Serialize;
use tracing::{info, info_span};

use cellrep_core::{ChainSummary, PipelineResult, run_pipeline};
use cellrep_ingest::{
    ContigLoadOptions, barcodes_from_column, dataframe_to_records, infer_schema, load_barcodes,
    load_contig_table, read_csv_table,
};
use cellrep_model::{PrimaryIndex, RecordTable};

use crate::cli::{AttachArgs, SchemaArgs};
use crate::summary::{apply_table_style, header_cell};

/// Outcome of `cellrep attach`.
#[derive(Debug)]
pub struct AttachOutcome {
    pub contigs: PathBuf,
    pub barcodes: Option<PathBuf>,
    pub result: PipelineResult,
    pub output: Option<PathBuf>,
    pub json: Option<PathBuf>,
}

/// JSON form of a run.
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub contigs: String,
    pub barcodes: Option<String>,
    pub cells: usize,
    pub input_records: usize,
    pub other_chain_records: usize,
    pub dropped_cells: usize,
    pub chains: &'a [ChainSummary],
}

impl<'a> RunReport<'a> {
    pub fn new(outcome: &'a AttachOutcome) -> Self {
        Self {
            contigs: outcome.contigs.display().to_string(),
            barcodes: outcome
                .barcodes
                .as_ref()
                .map(|path| path.display().to_string()),
            cells: outcome.result.table.len(),
            input_records: outcome.result.input_records,
            other_chain_records: outcome.result.other_chain_records,
            dropped_cells: outcome.result.dropped_cells,
            chains: &outcome.result.chains,
        }
    }
}

pub fn run_attach(args: &AttachArgs) -> Result<AttachOutcome> {
    let span = info_span!("attach", contigs = %args.contigs.display());
    let _guard = span.enter();
    let start = Instant::now();

    let (contigs, index) = info_span!("ingest").in_scope(|| load_inputs(args))?;
    info!(
        records = contigs.len(),
        cells = index.len(),
        duration_ms = start.elapsed().as_millis(),
        "ingest complete"
    );

    let options = args.pipeline_options();
    let result = run_pipeline(contigs, index, &options).context("run pipeline")?;

    let outcome = AttachOutcome {
        contigs: args.contigs.clone(),
        barcodes: args.barcodes.clone(),
        result,
        output: args.output.clone(),
        json: args.json.clone(),
    };

    info_span!("output").in_scope(|| -> Result<()> {
        if let Some(path) = &outcome.output {
            write_cell_table(&outcome.result, path)?;
            info!(path = %path.display(), "wrote cell table");
        }
        if let Some(path) = &outcome.json {
            write_report(&outcome, path)?;
            info!(path = %path.display(), "wrote summary");
        }
        Ok(())
    })?;

    Ok(outcome)
}

fn load_inputs(args: &AttachArgs) -> Result<(RecordTable, PrimaryIndex)> {
    let options = ContigLoadOptions {
        key_column: args.key.clone(),
        columns: None,
    };
    match &args.barcodes {
        Some(barcodes) => {
            let contigs = load_contig_table(&args.contigs, &options)
                .with_context(|| format!("load contigs from {}", args.contigs.display()))?;
            let index = load_barcodes(barcodes)
                .with_context(|| format!("load barcodes from {}", barcodes.display()))?;
            Ok((contigs, index))
        }
        None => {
            let df = read_csv_table(&args.contigs)
                .with_context(|| format!("read {}", args.contigs.display()))?;
            let index = barcodes_from_column(&df, &args.key)
                .with_context(|| format!("collect cell barcodes from column '{}'", args.key))?;
            let contigs = dataframe_to_records(&df, &args.key, None)
                .with_context(|| format!("convert {}", args.contigs.display()))?;
            Ok((contigs, index))
        }
    }
}

/// Writes the per-cell table as CSV.
pub fn write_cell_table(result: &PipelineResult, path: &Path) -> Result<()> {
    let mut df = result.table.to_frame();
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    CsvWriter::new(&mut writer)
        .include_header(true)
        .finish(&mut df)
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

fn write_report(outcome: &AttachOutcome, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &RunReport::new(outcome))
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn run_schema(args: &SchemaArgs) -> Result<()> {
    let df = read_csv_table(&args.contigs)
        .with_context(|| format!("read {}", args.contigs.display()))?;
    let schema = infer_schema(&df, &args.key, None).context("infer schema")?;

    println!("Key: {}", schema.key());
    let mut table = Table::new();
    table.set_header(vec![header_cell("Field"), header_cell("Type")]);
    apply_table_style(&mut table);
    for spec in schema.fields() {
        table.add_row(vec![spec.name.to_string(), spec.field_type.to_string()]);
    }
    println!("{table}");
    Ok(())
}
