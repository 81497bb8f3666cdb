use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use cellrep_core::ChainSummary;

use crate::commands::AttachOutcome;

pub fn print_summary(outcome: &AttachOutcome) {
    let result = &outcome.result;
    println!("Contigs: {}", outcome.contigs.display());
    match &outcome.barcodes {
        Some(path) => println!("Barcodes: {}", path.display()),
        None => println!("Barcodes: from contig table"),
    }
    println!(
        "Cells: {} ({} dropped without contigs)",
        result.table.len(),
        result.dropped_cells
    );
    if result.other_chain_records > 0 {
        println!(
            "Contigs of other chains ignored: {}",
            result.other_chain_records
        );
    }
    if let Some(path) = &outcome.output {
        println!("Cell table: {}", path.display());
    }
    if let Some(path) = &outcome.json {
        println!("Summary: {}", path.display());
    }

    println!("{}", chain_table(&result.chains));
    if result.chains.iter().any(|chain| !chain.top_sequences.is_empty()) {
        println!("{}", sequence_table(&result.chains));
    }
}

fn chain_table(chains: &[ChainSummary]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Chain"),
        header_cell("Cells"),
        header_cell("With contigs"),
        header_cell("Contigs"),
        header_cell("Filtered"),
        header_cell("Unknown cell"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 1..6 {
        align_column(&mut table, index, CellAlignment::Right);
    }

    let mut total_records = 0usize;
    let mut total_filtered = 0usize;
    let mut total_dropped = 0usize;
    for chain in chains {
        total_records += chain.records;
        total_filtered += chain.filtered_records;
        total_dropped += chain.dropped_records;
        table.add_row(vec![
            Cell::new(&chain.chain)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(chain.cells),
            coverage_cell(chain.cells_with_records, chain.cells),
            Cell::new(chain.records),
            count_cell(chain.filtered_records, Color::Yellow),
            count_cell(chain.dropped_records, Color::Red),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        dim_cell("-"),
        Cell::new(total_records).add_attribute(Attribute::Bold),
        Cell::new(total_filtered).add_attribute(Attribute::Bold),
        Cell::new(total_dropped).add_attribute(Attribute::Bold),
    ]);
    table
}

fn sequence_table(chains: &[ChainSummary]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Chain"),
        header_cell("Rank"),
        header_cell("Sequence"),
        header_cell("Contigs"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    for chain in chains {
        for (rank, sequence) in chain.top_sequences.iter().enumerate() {
            table.add_row(vec![
                Cell::new(&chain.chain).fg(Color::Blue),
                Cell::new(rank + 1),
                Cell::new(&sequence.sequence),
                Cell::new(sequence.count),
            ]);
        }
    }
    table
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

pub fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// `n (p%)` of cells carrying at least one contig.
fn coverage_cell(with_records: usize, cells: usize) -> Cell {
    if cells == 0 {
        return dim_cell("-");
    }
    let percent = with_records as f64 * 100.0 / cells as f64;
    Cell::new(format!("{with_records} ({percent:.1}%)"))
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count == 0 {
        dim_cell(count)
    } else {
        Cell::new(count).fg(color)
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellrep_core::SequenceCount;

    fn summary(chain: &str, top: usize) -> ChainSummary {
        ChainSummary {
            chain: chain.to_string(),
            cells: 4,
            cells_with_records: 3,
            records: 5,
            filtered_records: 1,
            dropped_records: 0,
            top_sequences: (0..top)
                .map(|i| SequenceCount {
                    sequence: format!("CASS{i}"),
                    count: top - i,
                })
                .collect(),
        }
    }

    #[test]
    fn chain_table_has_total_row() {
        let table = chain_table(&[summary("TRA", 0), summary("TRB", 0)]);
        assert_eq!(table.row_count(), 3);
        let rendered = table.to_string();
        assert!(rendered.contains("TOTAL"));
        assert!(rendered.contains("3 (75.0%)"));
    }

    #[test]
    fn sequence_table_lists_every_rank() {
        let table = sequence_table(&[summary("TRA", 2), summary("TRB", 3)]);
        assert_eq!(table.row_count(), 5);
    }
}
