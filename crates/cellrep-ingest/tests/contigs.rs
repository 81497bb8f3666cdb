//! Loading contig annotation files from disk.

use std::io::Write;

use cellrep_ingest::{
    ContigLoadOptions, IngestError, barcodes_from_column, load_barcodes, load_contig_table,
    read_csv_table,
};
use cellrep_model::{FieldType, FieldValue, RecordCollection};
use tempfile::NamedTempFile;

const CONTIGS: &str = "\
barcode,is_cell,contig_id,high_confidence,length,chain,v_gene,d_gene,j_gene,c_gene,full_length,productive,cdr3,cdr3_nt,reads,umis,raw_clonotype_id
AAACCTGAGATCTGAA-1,True,AAACCTGAGATCTGAA-1_contig_1,True,500,TRB,TRBV20-1,None,TRBJ2-7,TRBC2,True,True,CSARDRGQYEQYF,TGCAGT,9327,12,clonotype1
AAACCTGAGATCTGAA-1,True,AAACCTGAGATCTGAA-1_contig_2,True,490,TRA,TRAV12-2,None,TRAJ34,TRAC,True,True,CAVNYDKLIF,TGTGCC,2201,3,clonotype1
AAACCTGAGATCTGAA-1,True,AAACCTGAGATCTGAA-1_contig_3,True,470,TRA,TRAV1-2,None,TRAJ33,TRAC,True,False,None,None,400,1,clonotype1
AAACCTGCAGATGGCA-1,True,AAACCTGCAGATGGCA-1_contig_1,True,510,TRB,TRBV9,None,TRBJ1-2,TRBC1,True,True,CASSVGTGGTNYGYTF,TGTGCC,5500,7,clonotype2
";

fn write_temp(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(content.as_bytes()).expect("write temp file");
    file
}

#[test]
fn loads_cell_ranger_contigs() {
    let file = write_temp(CONTIGS);
    let table = load_contig_table(file.path(), &ContigLoadOptions::default()).unwrap();

    assert_eq!(table.len(), 4);
    let schema = table.schema();
    assert_eq!(schema.key().as_str(), "barcode");
    assert_eq!(schema.field_type("productive"), Some(FieldType::Boolean));
    assert_eq!(schema.field_type("full_length"), Some(FieldType::Boolean));
    assert_eq!(schema.field_type("umis"), Some(FieldType::Integer));
    assert_eq!(schema.field_type("chain"), Some(FieldType::Text));

    let third = &table.records()[2];
    assert_eq!(third.get("productive"), Some(&FieldValue::Boolean(false)));
    assert_eq!(third.get("cdr3"), Some(&FieldValue::Missing));
    assert_eq!(third.get("d_gene"), Some(&FieldValue::Missing));
}

#[test]
fn loads_selected_columns() {
    let file = write_temp(CONTIGS);
    let options = ContigLoadOptions::default().with_columns(["chain", "umis", "cdr3"]);
    let table = load_contig_table(file.path(), &options).unwrap();
    assert_eq!(table.schema().len(), 3);
}

#[test]
fn unknown_selected_column_is_reported() {
    let file = write_temp(CONTIGS);
    let options = ContigLoadOptions::default().with_columns(["umis", "junction"]);
    let result = load_contig_table(file.path(), &options);
    assert!(matches!(
        result,
        Err(IngestError::MissingColumn { column, .. }) if column == "junction"
    ));
}

#[test]
fn missing_key_column_is_reported() {
    let file = write_temp("cell,umis\nc1,3\n");
    let result = load_contig_table(file.path(), &ContigLoadOptions::default());
    assert!(matches!(
        result,
        Err(IngestError::MissingColumn { column, .. }) if column == "barcode"
    ));
}

#[test]
fn contigs_group_against_barcode_list() {
    let contigs = write_temp(CONTIGS);
    let barcodes = write_temp("AAACCTGCAGATGGCA-1\nAAACCTGAGATCTGAA-1\nTTTGGTTTCAGTTTGG-1\n");

    let table = load_contig_table(contigs.path(), &ContigLoadOptions::default()).unwrap();
    let index = load_barcodes(barcodes.path()).unwrap();
    let collection = RecordCollection::build(table, &index);

    assert_eq!(collection.len(), 3);
    assert_eq!(collection.lengths(), vec![1, 3, 0]);
}

#[test]
fn index_from_contig_column() {
    let file = write_temp(CONTIGS);
    let df = read_csv_table(file.path()).unwrap();
    let index = barcodes_from_column(&df, "barcode").unwrap();
    assert_eq!(index.len(), 2);
    assert_eq!(index.position("AAACCTGCAGATGGCA-1"), Some(1));
}
