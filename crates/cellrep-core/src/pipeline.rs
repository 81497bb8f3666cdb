//! Repertoire pipeline: attach per-chain contig collections to cells,
//! filter them, annotate clonotype frequencies and collapse each cell to
//! its dominant contig.
//!
//! # Stages
//!
//! 1. **attach** - split contigs by chain and group each chain by cell
//! 2. **count** - per-cell contig and productive-contig counts
//! 3. **filter** - drop non-productive / partial contigs inside each cell
//! 4. **frequency** - flatten, count sequence occurrences, regroup
//! 5. **collapse** - keep the highest-ranked contig per cell
//! 6. **drop_empty** - optionally remove cells without any contig

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use cellrep_model::{
    FieldName, FieldType, FieldValue, PrimaryIndex, RecordCollection, RecordSchema, RecordTable,
    Selector, TieBreak,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};

use crate::cell_table::CellTable;
use crate::error::{CoreError, Result};

/// Boolean contig field marking productive rearrangements.
pub const PRODUCTIVE_FIELD: &str = "productive";
/// Boolean contig field marking full-length assemblies.
pub const FULL_LENGTH_FIELD: &str = "full_length";

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOptions {
    /// Field linking contigs to cells.
    pub key_column: String,
    /// Text field naming the receptor chain of a contig.
    pub chain_column: String,
    /// Chains to attach, in output order.
    pub chains: Vec<String>,
    /// Numeric field used to pick the dominant contig.
    pub rank_field: String,
    /// Field identifying a clonotype sequence.
    pub sequence_field: String,
    pub productive_only: bool,
    pub full_length_only: bool,
    pub drop_empty_cells: bool,
    pub tie_break: TieBreak,
    /// Number of most frequent sequences reported per chain.
    pub top_sequences: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            key_column: "barcode".to_string(),
            chain_column: "chain".to_string(),
            chains: vec!["TRA".to_string(), "TRB".to_string()],
            rank_field: "umis".to_string(),
            sequence_field: "cdr3".to_string(),
            productive_only: true,
            full_length_only: true,
            drop_empty_cells: false,
            tie_break: TieBreak::First,
            top_sequences: 5,
        }
    }
}

/// How often a sequence occurs among the kept contigs of a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequenceCount {
    pub sequence: String,
    pub count: usize,
}

/// Per-chain outcome of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainSummary {
    pub chain: String,
    /// Cells in the final table.
    pub cells: usize,
    /// Cells with at least one kept contig.
    pub cells_with_records: usize,
    /// Contigs kept after filtering.
    pub records: usize,
    /// Contigs removed by the productive/full-length filters.
    pub filtered_records: usize,
    /// Contigs whose barcode is not a known cell.
    pub dropped_records: usize,
    pub top_sequences: Vec<SequenceCount>,
}

/// Output of [`run_pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub table: CellTable,
    pub chains: Vec<ChainSummary>,
    /// Contigs in the input table.
    pub input_records: usize,
    /// Contigs of chains that were not requested.
    pub other_chain_records: usize,
    /// Cells removed because no chain had a contig.
    pub dropped_cells: usize,
}

/// Runs every pipeline stage over `contigs`, grouped against `index`.
pub fn run_pipeline(
    contigs: RecordTable,
    index: PrimaryIndex,
    options: &PipelineOptions,
) -> Result<PipelineResult> {
    let span = info_span!(
        "pipeline",
        cells = index.len(),
        contigs = contigs.len(),
        chains = ?options.chains
    );
    let _guard = span.enter();
    let start = Instant::now();

    let schema = contigs.schema().clone();
    check_schema(&schema, options)?;
    let input_records = contigs.len();

    let mut parts = contigs.split_by(&options.chain_column)?;
    let requested = unique_chains(&options.chains);

    let mut table = CellTable::new(index)?;
    let mut chains = Vec::with_capacity(requested.len());
    let mut taken = 0usize;

    for chain in requested {
        let part = parts
            .remove(chain)
            .unwrap_or_else(|| RecordTable::empty(schema.clone()));
        taken += part.len();
        let summary = info_span!("chain", chain = %chain)
            .in_scope(|| process_chain(&mut table, chain, part, options))?;
        chains.push(summary);
    }

    // Includes rows without a chain value.
    let other_chain_records = input_records - taken;
    if other_chain_records > 0 {
        debug!(other_chain_records, "ignoring contigs of other chains");
    }

    let mut dropped_cells = 0;
    if options.drop_empty_cells {
        let before = table.len();
        table = info_span!("drop_empty").in_scope(|| drop_empty_cells(&table))?;
        dropped_cells = before - table.len();
        for summary in &mut chains {
            summary.cells = table.len();
        }
        info!(dropped_cells, remaining = table.len(), "dropped cells without contigs");
    }

    info!(
        cells = table.len(),
        input_records,
        duration_ms = start.elapsed().as_millis(),
        "pipeline complete"
    );

    Ok(PipelineResult {
        table,
        chains,
        input_records,
        other_chain_records,
        dropped_cells,
    })
}

/// Requested chains in first-seen order, each once.
fn unique_chains(chains: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(chains.len());
    for chain in chains {
        if seen.insert(chain.as_str()) {
            unique.push(chain.as_str());
        } else {
            warn!(chain = %chain, "chain requested more than once, attaching it once");
        }
    }
    unique
}

fn check_schema(schema: &RecordSchema, options: &PipelineOptions) -> Result<()> {
    if schema.key().as_str() != options.key_column {
        return Err(CoreError::MissingField {
            field: options.key_column.clone(),
        });
    }
    for field in [
        &options.chain_column,
        &options.rank_field,
        &options.sequence_field,
    ] {
        if !schema.contains(field) {
            return Err(CoreError::MissingField {
                field: field.clone(),
            });
        }
    }
    Ok(())
}

fn process_chain(
    table: &mut CellTable,
    chain: &str,
    part: RecordTable,
    options: &PipelineOptions,
) -> Result<ChainSummary> {
    let (collection, report) = RecordCollection::build_with_report(part, table.index());
    info!(
        chain,
        kept = report.kept,
        dropped = report.dropped,
        "attached contigs"
    );

    table.add_counts(&format!("{chain}_contigs"), collection.lengths())?;
    if has_boolean(collection.schema(), PRODUCTIVE_FIELD) {
        let productive = collection
            .project_as::<bool>(PRODUCTIVE_FIELD)?
            .count_where(|value| *value == Some(true));
        table.add_counts(&format!("{chain}_productive"), productive)?;
    }

    let before = collection.total_records();
    let collection = filter_contigs(collection, options)?;
    let filtered_records = before - collection.total_records();

    let (collection, frequencies) = add_frequencies(collection, &options.sequence_field)?;
    let collection = collapse_into(table, chain, collection, options)?;

    let cells_with_records = collection.lengths().iter().filter(|&&n| n > 0).count();
    let records = collection.total_records();
    table.attach(chain, collection)?;

    Ok(ChainSummary {
        chain: chain.to_string(),
        cells: table.len(),
        cells_with_records,
        records,
        filtered_records,
        dropped_records: report.dropped,
        top_sequences: top_sequences(frequencies, options.top_sequences),
    })
}

fn has_boolean(schema: &RecordSchema, field: &str) -> bool {
    schema.field_type(field) == Some(FieldType::Boolean)
}

fn filter_contigs(
    mut collection: RecordCollection,
    options: &PipelineOptions,
) -> Result<RecordCollection> {
    let filters = [
        (options.productive_only, PRODUCTIVE_FIELD),
        (options.full_length_only, FULL_LENGTH_FIELD),
    ];
    for (enabled, field) in filters {
        if !enabled {
            continue;
        }
        if !has_boolean(collection.schema(), field) {
            warn!(field, "no boolean field to filter on, keeping all contigs");
            continue;
        }
        let before = collection.total_records();
        collection = collection.retain_where(field, |value| value.as_bool() == Some(true))?;
        debug!(
            field,
            removed = before - collection.total_records(),
            "filtered contigs"
        );
    }
    Ok(collection)
}

/// Adds `<sequence>_frequency` to every contig: how many contigs of the
/// collection share its sequence. A field of that name already present in
/// the contig table is replaced.
fn add_frequencies(
    collection: RecordCollection,
    sequence_field: &str,
) -> Result<(RecordCollection, HashMap<String, usize>)> {
    let (flat, grouping) = collection.into_flat();

    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in flat.column(sequence_field)? {
        if !value.is_missing() {
            *counts.entry(value.to_string()).or_default() += 1;
        }
    }

    let frequency: Vec<FieldValue> = flat
        .column(sequence_field)?
        .into_iter()
        .map(|value| {
            if value.is_missing() {
                FieldValue::Missing
            } else {
                let count = counts.get(&value.to_string()).copied().unwrap_or(0);
                FieldValue::Integer(i64::try_from(count).unwrap_or(i64::MAX))
            }
        })
        .collect();

    let name = FieldName::new(format!("{sequence_field}_frequency"))?;
    let flat = if flat.schema().contains(name.as_str()) {
        warn!(field = %name, "replacing existing frequency field");
        flat.without_column(name.as_str())?
    } else {
        flat
    };
    let flat = flat.with_column(name, FieldType::Integer, frequency)?;
    let collection = RecordCollection::regroup(flat, &grouping)?;
    Ok((collection, counts))
}

/// Adds the dominant contig's sequence, rank and frequency as cell columns.
fn collapse_into(
    table: &mut CellTable,
    chain: &str,
    collection: RecordCollection,
    options: &PipelineOptions,
) -> Result<RecordCollection> {
    let winners = collection.collapse(&options.rank_field, options.tie_break)?;
    let frequency_field = format!("{}_frequency", options.sequence_field);

    for field in [
        options.sequence_field.as_str(),
        options.rank_field.as_str(),
        frequency_field.as_str(),
    ] {
        let Some(field_type) = collection.schema().field_type(field) else {
            return Err(CoreError::MissingField {
                field: field.to_string(),
            });
        };
        let values = winners
            .iter()
            .map(|winner| {
                winner
                    .as_ref()
                    .and_then(|record| record.get(field))
                    .cloned()
                    .unwrap_or(FieldValue::Missing)
            })
            .collect();
        table.add_column(&format!("{chain}_{field}"), field_type, values)?;
    }

    let collapsed = winners.iter().filter(|winner| winner.is_some()).count();
    info!(chain, collapsed, "collapsed cells to dominant contig");
    Ok(collection)
}

fn top_sequences(counts: HashMap<String, usize>, limit: usize) -> Vec<SequenceCount> {
    let mut ranked: Vec<SequenceCount> = counts
        .into_iter()
        .map(|(sequence, count)| SequenceCount { sequence, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.sequence.cmp(&b.sequence)));
    ranked.truncate(limit);
    ranked
}

fn drop_empty_cells(table: &CellTable) -> Result<CellTable> {
    let mut keep = vec![false; table.len()];
    for collection in table.collections().values() {
        for (slot, len) in keep.iter_mut().zip(collection.lengths()) {
            *slot |= len > 0;
        }
    }
    table.subset(&Selector::Mask(keep))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_sequences_orders_by_count_then_sequence() {
        let counts = HashMap::from([
            ("CASSB".to_string(), 2),
            ("CASSA".to_string(), 2),
            ("CAVR".to_string(), 5),
            ("CSAR".to_string(), 1),
        ]);
        let top = top_sequences(counts, 3);
        let names: Vec<&str> = top.iter().map(|s| s.sequence.as_str()).collect();
        assert_eq!(names, vec!["CAVR", "CASSA", "CASSB"]);
    }

    #[test]
    fn default_options() {
        let options = PipelineOptions::default();
        assert_eq!(options.chains, vec!["TRA", "TRB"]);
        assert_eq!(options.rank_field, "umis");
        assert!(options.productive_only);
        assert!(!options.drop_empty_cells);
    }
}
