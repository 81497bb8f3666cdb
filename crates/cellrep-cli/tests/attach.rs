//! Integration tests for the attach and schema commands.

use std::fs;
use std::io::Write;

use clap::Parser;
use tempfile::{NamedTempFile, TempDir};

use cellrep_cli::cli::{Cli, Command};
use cellrep_cli::commands::{run_attach, run_schema};
use cellrep_model::TieBreak;

const CONTIGS: &str = "\
barcode,is_cell,contig_id,high_confidence,length,chain,v_gene,d_gene,j_gene,c_gene,full_length,productive,cdr3,cdr3_nt,reads,umis,raw_clonotype_id
AAAC-1,True,AAAC-1_contig_1,True,500,TRB,TRBV20-1,None,TRBJ2-7,TRBC2,True,True,CSARDRGQYEQYF,TGCAGT,9327,12,clonotype1
AAAC-1,True,AAAC-1_contig_2,True,490,TRA,TRAV12-2,None,TRAJ34,TRAC,True,True,CAVNYDKLIF,TGTGCC,2201,3,clonotype1
AAAC-1,True,AAAC-1_contig_3,True,480,TRA,TRAV1-2,None,TRAJ33,TRAC,True,True,CAVMDSNYQLIW,TGTGCT,3001,6,clonotype1
AAAG-1,True,AAAG-1_contig_1,True,510,TRB,TRBV9,None,TRBJ1-2,TRBC1,True,True,CSARDRGQYEQYF,TGCAGT,5500,7,clonotype2
AAAG-1,True,AAAG-1_contig_2,True,300,TRA,TRAV8-1,None,TRAJ9,TRAC,False,False,None,None,120,1,clonotype2
";

fn write_temp(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(content.as_bytes()).expect("write temp file");
    file
}

fn attach_args(argv: &[&str]) -> cellrep_cli::cli::AttachArgs {
    let mut full = vec!["cellrep", "attach"];
    full.extend_from_slice(argv);
    match Cli::try_parse_from(full).expect("parse arguments").command {
        Command::Attach(args) => args,
        Command::Schema(_) => panic!("expected attach"),
    }
}

#[test]
fn flags_map_to_pipeline_options() {
    let args = attach_args(&[
        "--contigs",
        "contigs.csv",
        "--chain",
        "IGH",
        "--chain",
        "IGK",
        "--all-contigs",
        "--tie-break",
        "last",
    ]);
    let options = args.pipeline_options();
    assert_eq!(options.chains, vec!["IGH", "IGK"]);
    assert!(!options.productive_only);
    assert!(options.full_length_only);
    assert_eq!(options.tie_break, TieBreak::Last);

    let defaults = attach_args(&["--contigs", "contigs.csv"]).pipeline_options();
    assert_eq!(defaults.chains, vec!["TRA", "TRB"]);
    assert_eq!(defaults.rank_field, "umis");
}

#[test]
fn attach_writes_cell_table_and_summary() {
    let contigs = write_temp(CONTIGS);
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("cells.csv");
    let json = dir.path().join("summary.json");

    let args = attach_args(&[
        "--contigs",
        contigs.path().to_str().unwrap(),
        "--output",
        output.to_str().unwrap(),
        "--json",
        json.to_str().unwrap(),
    ]);
    let outcome = run_attach(&args).unwrap();
    assert_eq!(outcome.result.table.len(), 2);

    let csv = fs::read_to_string(&output).unwrap();
    let mut lines = csv.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("barcode,"));
    assert!(header.contains("TRA_cdr3"));
    assert!(header.contains("TRB_umis"));
    assert_eq!(lines.count(), 2);
    assert!(csv.contains("CAVMDSNYQLIW"));

    let report: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
    assert_eq!(report["cells"], 2);
    assert_eq!(report["chains"][0]["chain"], "TRA");
    assert_eq!(report["chains"][0]["filtered_records"], 1);
    assert_eq!(report["chains"][1]["top_sequences"][0]["count"], 2);
}

#[test]
fn attach_uses_barcode_list() {
    let contigs = write_temp(CONTIGS);
    let barcodes = write_temp("AAAG-1\nTTTT-1\nAAAC-1\n");
    let args = attach_args(&[
        "--contigs",
        contigs.path().to_str().unwrap(),
        "--barcodes",
        barcodes.path().to_str().unwrap(),
        "--drop-empty",
    ]);
    let outcome = run_attach(&args).unwrap();
    assert_eq!(outcome.result.dropped_cells, 1);
    let ids: Vec<&str> = outcome
        .result
        .table
        .barcodes()
        .iter()
        .map(|barcode| barcode.as_str())
        .collect();
    assert_eq!(ids, vec!["AAAG-1", "AAAC-1"]);
}

#[test]
fn attach_reports_missing_file() {
    let args = attach_args(&["--contigs", "/nonexistent/contigs.csv"]);
    let err = run_attach(&args).unwrap_err();
    assert!(format!("{err:#}").contains("file not found"));
}

#[test]
fn schema_command_reads_header() {
    let contigs = write_temp(CONTIGS);
    let cli = Cli::try_parse_from([
        "cellrep",
        "schema",
        "--contigs",
        contigs.path().to_str().unwrap(),
    ])
    .unwrap();
    let Command::Schema(args) = cli.command else {
        panic!("expected schema");
    };
    run_schema(&args).unwrap();
}
