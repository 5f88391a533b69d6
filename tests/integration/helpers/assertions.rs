//! Assertion helpers for pipeline outputs.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use epiforge_lib::aggregate::read_table;

/// Values of `column` in the TSV at `path`, in row order.
pub fn column_values(path: &Path, column: &str) -> Vec<String> {
    let (_, rows) = read_table(path).unwrap();
    rows.into_iter().map(|mut row| row.remove(column).unwrap()).collect()
}

/// Asserts that two files have identical content.
pub fn assert_same_content(left: &Path, right: &Path) {
    let left_content = fs::read_to_string(left).unwrap();
    let right_content = fs::read_to_string(right).unwrap();
    assert_eq!(left_content, right_content, "{} and {} differ", left.display(), right.display());
}

/// Asserts that no `.partial` file is left anywhere below `dir`.
pub fn assert_no_partial_files(dir: &Path) {
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            assert_no_partial_files(&path);
        } else {
            assert!(
                !path.to_string_lossy().ends_with(".partial"),
                "leftover partial file {}",
                path.display()
            );
        }
    }
}
