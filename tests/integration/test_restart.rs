//! Restart and checkpoint tests.
//!
//! A run restarted in the same output directory must reuse every artifact already on disk
//! and produce the same reports as an uninterrupted run.

use std::fs;

use tempfile::TempDir;

use crate::helpers::{FakeTool, assert_no_partial_files, assert_same_content, write_vcf};
use crate::test_run_command::{STANDARD_ARGS, run_epiforge};

#[test]
fn test_rerun_makes_no_calls() {
    let dir = TempDir::new().unwrap();
    let tool = FakeTool::install(dir.path());
    let input = write_vcf(dir.path());
    let out = dir.path().join("out");

    assert!(run_epiforge(&tool, &input, &out, &STANDARD_ARGS).status.success());
    let combined = out.join("TUMOR.all_epitopes.tsv");
    let first = fs::read_to_string(&combined).unwrap();
    tool.reset_calls();

    let output = run_epiforge(&tool, &input, &out, &STANDARD_ARGS);

    assert!(output.status.success());
    assert_eq!(tool.calls(), 0);
    assert_eq!(fs::read_to_string(&combined).unwrap(), first);
}

#[test]
fn test_resume_after_tool_failure() {
    let dir = TempDir::new().unwrap();
    let tool = FakeTool::install(dir.path());
    let input = write_vcf(dir.path());
    let resumed = dir.path().join("resumed");
    let clean = dir.path().join("clean");

    // A single worker runs units in order, so the HLA-A*02:01 units of the first chunk
    // finish before the first HLA-B*07:02 unit fails.
    let mut single_thread = STANDARD_ARGS;
    single_thread[9] = "1";
    tool.fail_for("HLA-B*07:02");
    let failed = run_epiforge(&tool, &input, &resumed, &single_thread);
    assert!(!failed.status.success());
    assert!(String::from_utf8_lossy(&failed.stderr).contains("Prediction tool failed"));
    assert!(!resumed.join("TUMOR.all_epitopes.tsv").exists());
    assert_no_partial_files(&resumed);

    tool.heal();
    tool.reset_calls();
    assert!(run_epiforge(&tool, &input, &resumed, &STANDARD_ARGS).status.success());
    let resumed_calls = tool.calls();
    assert!(resumed_calls > 0);
    assert_eq!(resumed_calls, 24 - 4);

    assert!(run_epiforge(&tool, &input, &clean, &STANDARD_ARGS).status.success());
    assert_same_content(&resumed.join("TUMOR.all_epitopes.tsv"), &clean.join("TUMOR.all_epitopes.tsv"));
    assert_same_content(
        &resumed.join("TUMOR.filtered.condensed.ranked.tsv"),
        &clean.join("TUMOR.filtered.condensed.ranked.tsv"),
    );
}

#[test]
fn test_deleted_report_is_regenerated_without_calls() {
    let dir = TempDir::new().unwrap();
    let tool = FakeTool::install(dir.path());
    let input = write_vcf(dir.path());
    let out = dir.path().join("out");

    assert!(run_epiforge(&tool, &input, &out, &STANDARD_ARGS).status.success());
    let combined = out.join("TUMOR.all_epitopes.tsv");
    let ranked = out.join("TUMOR.filtered.condensed.ranked.tsv");
    let first_combined = fs::read_to_string(&combined).unwrap();
    let first_ranked = fs::read_to_string(&ranked).unwrap();
    fs::remove_file(&combined).unwrap();
    fs::remove_file(&ranked).unwrap();
    tool.reset_calls();

    assert!(run_epiforge(&tool, &input, &out, &STANDARD_ARGS).status.success());

    assert_eq!(tool.calls(), 0);
    assert_eq!(fs::read_to_string(&combined).unwrap(), first_combined);
    assert_eq!(fs::read_to_string(&ranked).unwrap(), first_ranked);
}

#[test]
fn test_restart_with_changed_settings_fails() {
    let dir = TempDir::new().unwrap();
    let tool = FakeTool::install(dir.path());
    let input = write_vcf(dir.path());
    let out = dir.path().join("out");

    assert!(run_epiforge(&tool, &input, &out, &STANDARD_ARGS).status.success());
    tool.reset_calls();

    let mut changed = STANDARD_ARGS;
    changed[5] = "9";
    let output = run_epiforge(&tool, &input, &out, &changed);

    assert!(!output.status.success());
    let message = String::from_utf8_lossy(&output.stderr);
    assert!(message.contains("Restart inputs are different from past inputs"), "{message}");
    assert!(message.contains("epitope_lengths"));
    assert_eq!(tool.calls(), 0);
}

#[test]
fn test_restart_with_more_threads_is_allowed() {
    let dir = TempDir::new().unwrap();
    let tool = FakeTool::install(dir.path());
    let input = write_vcf(dir.path());
    let out = dir.path().join("out");

    assert!(run_epiforge(&tool, &input, &out, &STANDARD_ARGS).status.success());

    let mut more_threads = STANDARD_ARGS;
    more_threads[9] = "8";
    assert!(run_epiforge(&tool, &input, &out, &more_threads).status.success());
}
