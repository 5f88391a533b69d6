//! End-to-end CLI tests for the utility commands.

use std::fs;
use std::process::Command;

use tempfile::TempDir;

#[test]
fn test_plan_threads_prints_plan() {
    let output = Command::new(env!("CARGO_BIN_EXE_epiforge"))
        .args(["plan-threads", "--chunks", "3", "--alleles", "2", "--lengths", "2"])
        .args(["--algorithms", "1", "--threads", "6"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec![
            "axis\ttotal_iterations\tthreads\titerations_per_thread",
            "file\t3\t2\t1.50",
            "allele\t2\t2\t1.00",
            "length\t2\t1\t2.00",
            "algorithm\t1\t1\t1.00",
        ]
    );
}

#[test]
fn test_valid_alleles_lists_table_entries() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("class_i")).unwrap();
    fs::write(
        dir.path().join("class_i").join("smm.tsv"),
        "MHC\tPeptideLength\nHLA-A*02:01\t9\nHLA-B*07:02\t9\nH-2-Kb\t8\n",
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_epiforge"))
        .args(["valid-alleles", "--allele-dir", dir.path().to_str().unwrap()])
        .args(["--algorithms", "SMM", "--filter", "hla"])
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().collect::<Vec<_>>(), vec!["SMM\tHLA-A*02:01", "SMM\tHLA-B*07:02"]);
}

#[test]
fn test_valid_alleles_prints_cutoffs() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("class_i")).unwrap();
    fs::write(dir.path().join("class_i").join("smm.tsv"), "MHC\tPeptideLength\nHLA-A*02:01\t9\n").unwrap();
    fs::write(
        dir.path().join("cutoffs.csv"),
        "allele,allele_specific_cutoff\nHLA-B*07:02,255.5\nHLA-A*02:01,100\n",
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_epiforge"))
        .args(["valid-alleles", "--allele-dir", dir.path().to_str().unwrap()])
        .args(["--algorithms", "SMM", "--print-cutoffs"])
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().collect::<Vec<_>>(), vec!["HLA-A*02:01\t100", "HLA-B*07:02\t255.5"]);
}

#[test]
fn test_valid_alleles_missing_dir_fails() {
    let output = Command::new(env!("CARGO_BIN_EXE_epiforge"))
        .args(["valid-alleles", "--allele-dir", "/no/such/allele/dir"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("does not exist"));
}

#[test]
fn test_version_flag() {
    let output = Command::new(env!("CARGO_BIN_EXE_epiforge")).arg("--version").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("epiforge "));
}
