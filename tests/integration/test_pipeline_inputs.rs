//! Library-level runs over every input kind.

use std::path::{Path, PathBuf};
use std::time::Duration;

use epiforge_lib::aggregate::TopScoreMetric;
use epiforge_lib::algorithm::PredictionAlgorithm;
use epiforge_lib::gateway::ProcessPredictionTool;
use epiforge_lib::pipeline::{Pipeline, PipelineOptions, PipelineOutcome};
use epiforge_lib::strategies::InputKind;
use tempfile::TempDir;

use crate::helpers::{FakeTool, column_values, write_bedpe, write_vcf, write_vector_fasta};

fn options(input: PathBuf, input_kind: InputKind, output_dir: &Path) -> PipelineOptions {
    PipelineOptions {
        input,
        input_kind,
        sample_name: "SAMPLE".to_string(),
        alleles: vec!["HLA-A*02:01".to_string()],
        algorithms: vec![PredictionAlgorithm::NetMHC, PredictionAlgorithm::NetMHCpan],
        output_dir: output_dir.to_path_buf(),
        epitope_lengths: vec![9],
        peptide_sequence_length: 21,
        iedb_executable: None,
        iedb_retries: 0,
        retry_backoff: Duration::ZERO,
        min_call_interval: Duration::ZERO,
        fasta_size: 200,
        threads: 2,
        top_score_metric: TopScoreMetric::Median,
        binding_threshold: 500.0,
        pass_only: false,
        spacers: vec!["None".to_string()],
        allele_dir: None,
        allele_specific_cutoffs: false,
        additional_report_columns: Vec::new(),
        keep_tmp_files: false,
    }
}

#[test]
fn test_vcf_single_chunk() {
    let dir = TempDir::new().unwrap();
    let tool = FakeTool::install(dir.path());
    let out = dir.path().join("out");
    let opts = options(write_vcf(dir.path()), InputKind::Vcf, &out);

    let outcome = Pipeline::new(opts, &ProcessPredictionTool::new(&tool.script)).execute().unwrap();

    let ranked = out.join("SAMPLE.filtered.condensed.ranked.tsv");
    assert_eq!(outcome, PipelineOutcome::Completed(ranked.clone()));
    assert_eq!(tool.calls(), 2);
    assert_eq!(column_values(&ranked, "gene_name").len(), 3);
    let wildtypes = column_values(&out.join("SAMPLE.all_epitopes.tsv"), "wt_peptide");
    assert!(wildtypes.iter().all(|wt| wt != "NA"));
}

#[test]
fn test_bedpe_fusions() {
    let dir = TempDir::new().unwrap();
    let tool = FakeTool::install(dir.path());
    let out = dir.path().join("out");
    let opts = options(write_bedpe(dir.path()), InputKind::Bedpe, &out);

    Pipeline::new(opts, &ProcessPredictionTool::new(&tool.script)).execute().unwrap();

    let combined = out.join("SAMPLE.all_epitopes.tsv");
    assert_eq!(column_values(&combined, "variant_type"), vec!["fusion", "fusion"]);
    assert_eq!(column_values(&combined, "gene_name"), vec!["BCR--ABL1", "EML4--ALK"]);
    assert!(column_values(&combined, "wt_peptide").iter().all(|wt| wt == "NA"));
}

#[test]
fn test_vector_junctions() {
    let dir = TempDir::new().unwrap();
    let tool = FakeTool::install(dir.path());
    let out = dir.path().join("out");
    let mut opts = options(write_vector_fasta(dir.path()), InputKind::VectorFasta, &out);
    opts.spacers = vec!["None".to_string(), "AAY".to_string()];

    Pipeline::new(opts, &ProcessPredictionTool::new(&tool.script)).execute().unwrap();

    // One cell: the whole input at length 9, once per algorithm.
    assert_eq!(tool.calls(), 2);
    let indexes = column_values(&out.join("SAMPLE.filtered.condensed.ranked.tsv"), "index");
    let mut sorted = indexes.clone();
    sorted.sort();
    assert_eq!(
        sorted,
        vec!["MT.KRAS|AAY|MT.TP53", "MT.KRAS|MT.TP53", "MT.TP53|AAY|MT.KRAS", "MT.TP53|MT.KRAS"]
    );
}
