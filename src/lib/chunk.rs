//! Chunk planning over the converted tabular input.
//!
//! The tabular input is split into consecutive, fixed-size row ranges. Each range is written
//! to its own chunk file (with the header row) unless that file already exists, so planning
//! is always recomputed while writing stays idempotent.

use std::fmt;
use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use crate::artifacts::{ArtifactLayout, artifact_exists, write_atomically};

/// A 1-based, inclusive range of data rows in the tabular input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Chunk {
    /// First row of the chunk (1-based)
    pub start: usize,
    /// Last row of the chunk (inclusive)
    pub end: usize,
}

impl Chunk {
    /// Creates a chunk covering rows `start..=end`.
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start >= 1 && start <= end, "invalid chunk {start}-{end}");
        Self { start, end }
    }

    /// Number of rows in the chunk.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Chunks are never empty; provided for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Label of the chunk's tabular rows, e.g. `101-200`.
    #[must_use]
    pub fn tsv_label(&self) -> String {
        format!("{}-{}", self.start, self.end)
    }

    /// Label of the chunk's sequence entries.
    ///
    /// Row `i` contributes sequence numbers `2i - 1` (wildtype) and `2i` (mutant), so rows
    /// `101-200` map to sequences `201-400`.
    #[must_use]
    pub fn sequence_label(&self) -> String {
        format!("{}-{}", self.start * 2 - 1, self.end * 2)
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Splits rows `1..=total_rows` into consecutive chunks of `chunk_rows` rows.
///
/// The last chunk holds the remainder. Zero rows yield no chunks.
///
/// # Panics
///
/// Panics if `chunk_rows` is zero.
///
/// # Example
///
/// ```
/// use epiforge_lib::chunk::{Chunk, plan_chunks};
///
/// assert_eq!(plan_chunks(250, 200), vec![Chunk::new(1, 200), Chunk::new(201, 250)]);
/// assert!(plan_chunks(0, 200).is_empty());
/// ```
#[must_use]
pub fn plan_chunks(total_rows: usize, chunk_rows: usize) -> Vec<Chunk> {
    assert!(chunk_rows > 0, "chunk size must be positive");
    (1..=total_rows)
        .step_by(chunk_rows)
        .map(|start| Chunk::new(start, (start + chunk_rows - 1).min(total_rows)))
        .collect()
}

/// Opens a tab-delimited reader with a header row.
pub fn tsv_reader(path: &Path) -> Result<csv::Reader<File>> {
    csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open TSV: {}", path.display()))
}

/// Opens a tab-delimited writer.
pub fn tsv_writer(path: &Path) -> Result<csv::Writer<File>> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .with_context(|| format!("Failed to create TSV: {}", path.display()))
}

/// Counts data rows (excluding the header) of a TSV file.
pub fn count_rows(path: &Path) -> Result<usize> {
    let mut reader = tsv_reader(path)?;
    let mut count = 0;
    for record in reader.records() {
        record.with_context(|| format!("Failed to read TSV row from {}", path.display()))?;
        count += 1;
    }
    Ok(count)
}

/// Plans chunks over the tabular input and writes each missing chunk file.
///
/// Returns every planned chunk, whether its file was written now or already existed.
pub fn split_tabular(layout: &ArtifactLayout, total_rows: usize, chunk_rows: usize) -> Result<Vec<Chunk>> {
    let chunks = plan_chunks(total_rows, chunk_rows);
    let tabular = layout.tabular_path();
    let mut reader = tsv_reader(&tabular)?;
    let headers = reader.headers()?.clone();
    let mut records = reader.records();

    for chunk in &chunks {
        let path = layout.chunk_tabular_path(chunk);
        info!("Splitting TSV into smaller chunks - Entries {chunk}");
        if artifact_exists(&path) {
            info!("Split TSV file for Entries {chunk} already exists. Skipping.");
            for _ in 0..chunk.len() {
                records.next().transpose()?;
            }
            continue;
        }
        write_atomically(&path, |tmp| {
            let mut writer = tsv_writer(tmp)?;
            writer.write_record(&headers)?;
            for _ in 0..chunk.len() {
                let record = records.next().transpose()?.with_context(|| {
                    format!("{} ended before row {}", tabular.display(), chunk.end)
                })?;
                writer.write_record(&record)?;
            }
            writer.flush()?;
            Ok(())
        })?;
    }
    Ok(chunks)
}
