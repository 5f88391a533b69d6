//! End-to-end CLI tests for the run command.
//!
//! These tests run the actual `epiforge run` binary and validate:
//! 1. The combined, filtered and ranked reports
//! 2. The graceful abort when no combination is predictable
//! 3. Empty input and invalid settings
//! 4. Throttling of remote calls

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use std::time::{Duration, Instant};

use tempfile::TempDir;

use crate::helpers::{
    FakeTool, assert_no_partial_files, column_values, write_empty_vcf, write_vcf,
};

/// Runs `epiforge run` on `input` with test-friendly defaults and extra `args`.
///
/// Remote calls are not throttled unless `args` sets `--min-call-interval-secs`, and failed
/// calls are retried once unless `args` sets `--iedb-retries`.
pub fn run_epiforge(tool: &FakeTool, input: &Path, output_dir: &Path, args: &[&str]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_epiforge"));
    command
        .args(["run", "--input", input.to_str().unwrap(), "--sample-name", "TUMOR"])
        .args(["--output-dir", output_dir.to_str().unwrap()])
        .args(["--prediction-tool", tool.script.to_str().unwrap()])
        .args(["--retry-backoff-secs", "0"])
        .args(args);
    if !args.iter().any(|a| a.starts_with("--iedb-retries")) {
        command.args(["--iedb-retries", "1"]);
    }
    if !args.iter().any(|a| a.starts_with("--min-call-interval-secs")) {
        command.args(["--min-call-interval-secs", "0"]);
    }
    command.output().expect("Failed to run epiforge")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// Arguments of the standard three-chunk, 24-unit run.
pub const STANDARD_ARGS: [&str; 12] = [
    "--alleles",
    "HLA-A*02:01,HLA-B*07:02",
    "--algorithms",
    "NetMHC,SMM",
    "--epitope-lengths",
    "9,10",
    "--fasta-size",
    "2",
    "--threads",
    "4",
    "--keep-tmp-files",
    "--binding-threshold=500",
];

#[test]
fn test_run_writes_reports() {
    let dir = TempDir::new().unwrap();
    let tool = FakeTool::install(dir.path());
    let input = write_vcf(dir.path());
    let out = dir.path().join("out");

    let output = run_epiforge(&tool, &input, &out, &STANDARD_ARGS);

    assert!(output.status.success(), "run failed: {}", stderr(&output));
    // 3 chunks x 2 alleles x 2 lengths x 2 algorithms
    assert_eq!(tool.calls(), 24);

    let combined = out.join("TUMOR.all_epitopes.tsv");
    let indexes = column_values(&combined, "index");
    assert_eq!(indexes.len(), 3 * 2 * 2);
    let mut sorted = indexes.clone();
    sorted.sort();
    assert_eq!(indexes, sorted);

    let medians = column_values(&combined, "median_ic50");
    assert!(medians.iter().all(|m| m.parse::<f64>().unwrap() < 100.0));
    assert_eq!(column_values(&combined, "NetMHC_ic50").len(), 12);
    assert_eq!(column_values(&combined, "SMM_ic50").len(), 12);

    let ranked = out.join("TUMOR.filtered.condensed.ranked.tsv");
    let genes = column_values(&ranked, "gene_name");
    assert_eq!(genes.len(), 3);
    assert_eq!(column_values(&ranked, "rank"), vec!["1", "2", "3"]);
    assert!(out.join("TUMOR.filtered.tsv").is_file());
    assert!(out.join("log").join("inputs.yml").is_file());
    assert!(stderr(&output).contains("Done: Pipeline finished successfully."));
    assert_no_partial_files(&out);
}

#[test]
fn test_run_removes_tmp_dir_by_default() {
    let dir = TempDir::new().unwrap();
    let tool = FakeTool::install(dir.path());
    let input = write_vcf(dir.path());
    let out = dir.path().join("out");

    let output = run_epiforge(
        &tool,
        &input,
        &out,
        &["--alleles", "HLA-A*02:01", "--algorithms", "NetMHC", "--epitope-lengths", "9"],
    );

    assert!(output.status.success(), "run failed: {}", stderr(&output));
    assert!(!out.join("tmp").exists());
    assert!(out.join("TUMOR.filtered.condensed.ranked.tsv").is_file());
}

#[test]
fn test_no_compatible_combination_exits_cleanly() {
    let dir = TempDir::new().unwrap();
    let tool = FakeTool::install(dir.path());
    let input = write_vcf(dir.path());
    let out = dir.path().join("out");

    // A class II algorithm cannot predict a class I allele.
    let output = run_epiforge(
        &tool,
        &input,
        &out,
        &["--alleles", "HLA-A*02:01", "--algorithms", "NNalign", "--epitope-lengths", "15"],
    );

    assert!(output.status.success(), "run failed: {}", stderr(&output));
    assert!(stderr(&output).contains("No output files were created. Aborting."));
    assert_eq!(tool.calls(), 0);
    assert!(!out.join("TUMOR.all_epitopes.tsv").exists());
}

#[test]
fn test_empty_input_fails_with_hint() {
    let dir = TempDir::new().unwrap();
    let tool = FakeTool::install(dir.path());
    let input = write_empty_vcf(dir.path());
    let out = dir.path().join("out");

    let output = run_epiforge(&tool, &input, &out, &["--alleles", "HLA-A*02:01", "--algorithms", "NetMHC"]);

    assert!(!output.status.success());
    let message = stderr(&output);
    assert!(message.contains("The TSV file is empty."), "unexpected stderr: {message}");
    assert!(message.contains("missense, inframe indel, or frameshift"));
    assert_eq!(tool.calls(), 0);
}

#[test]
fn test_duplicate_allele_rejected() {
    let dir = TempDir::new().unwrap();
    let tool = FakeTool::install(dir.path());
    let input = write_vcf(dir.path());
    let out = dir.path().join("out");

    let output = run_epiforge(
        &tool,
        &input,
        &out,
        &["--alleles", "HLA-A*02:01,HLA-A*02:01", "--algorithms", "NetMHC"],
    );

    assert!(!output.status.success());
    assert!(stderr(&output).contains("alleles"));
    assert_eq!(tool.calls(), 0);
}

#[test]
fn test_remote_calls_are_spaced() {
    let dir = TempDir::new().unwrap();
    let tool = FakeTool::install(dir.path());
    let input = write_vcf(dir.path());
    let out = dir.path().join("out");

    let start = Instant::now();
    let output = run_epiforge(
        &tool,
        &input,
        &out,
        &[
            "--alleles",
            "HLA-A*02:01,HLA-B*07:02",
            "--algorithms",
            "NetMHC,SMM",
            "--epitope-lengths",
            "9",
            "--threads",
            "4",
            "--min-call-interval-secs=0.3",
        ],
    );

    assert!(output.status.success(), "run failed: {}", stderr(&output));
    assert_eq!(tool.calls(), 4);
    // Four throttled calls need at least three intervals between them.
    assert!(start.elapsed() >= Duration::from_millis(900));
}

#[test]
fn test_failed_unit_is_attempted_once_per_retry() {
    let dir = TempDir::new().unwrap();
    let tool = FakeTool::install(dir.path());
    let input = write_vcf(dir.path());
    let out = dir.path().join("out");
    tool.fail_for("HLA-B*07:02");

    let output = run_epiforge(
        &tool,
        &input,
        &out,
        &[
            "--alleles",
            "HLA-B*07:02",
            "--algorithms",
            "NetMHC",
            "--epitope-lengths",
            "9",
            "--iedb-retries=2",
        ],
    );

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Prediction tool failed"));
    // One unit, three attempts, and the tool never retries on its own.
    assert_eq!(tool.call_log(), vec!["ann HLA-B*07:02 9 0"; 3]);
}

#[test]
fn test_unknown_allele_rejected_before_any_call() {
    let dir = TempDir::new().unwrap();
    let tool = FakeTool::install(dir.path());
    let input = write_vcf(dir.path());
    let out = dir.path().join("out");
    let alleles = dir.path().join("alleles");
    fs::create_dir_all(alleles.join("class_i")).unwrap();
    fs::write(alleles.join("class_i").join("ann.tsv"), "MHC\tPeptideLength\nHLA-A*02:01\t9\n").unwrap();

    let output = run_epiforge(
        &tool,
        &input,
        &out,
        &[
            "--alleles",
            "HLA-A*02:01,HLA-A*02:0l",
            "--algorithms",
            "NetMHC",
            "--epitope-lengths",
            "9",
            "--allele-dir",
            alleles.to_str().unwrap(),
        ],
    );

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Allele HLA-A*02:0l not valid"), "unexpected stderr: {}", stderr(&output));
    assert_eq!(tool.calls(), 0);
    assert!(!out.exists());
}

#[test]
fn test_sample_name_report_column() {
    let dir = TempDir::new().unwrap();
    let tool = FakeTool::install(dir.path());
    let input = write_vcf(dir.path());
    let out = dir.path().join("out");

    let output = run_epiforge(
        &tool,
        &input,
        &out,
        &[
            "--alleles",
            "HLA-A*02:01",
            "--algorithms",
            "NetMHC",
            "--epitope-lengths",
            "9",
            "--additional-report-columns",
            "sample_name",
        ],
    );

    assert!(output.status.success(), "run failed: {}", stderr(&output));
    let combined = out.join("TUMOR.all_epitopes.tsv");
    let samples = column_values(&combined, "sample_name");
    assert_eq!(samples.len(), 3);
    assert!(samples.iter().all(|s| s == "TUMOR"));
    assert_eq!(column_values(&out.join("TUMOR.filtered.tsv"), "sample_name").len(), 3);
}
