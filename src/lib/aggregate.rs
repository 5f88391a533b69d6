//! Merging of parsed cell artifacts into the combined output.
//!
//! Parsed files of different cells may carry different per-algorithm columns. The combined
//! header is the union of all headers in first-seen order; cells a file does not have are
//! written as `NA`. Rows are ordered by source index and then by the ranking score, so the
//! combined file does not depend on the order in which cells finished.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use log::info;
use serde::{Deserialize, Serialize};

use crate::artifacts::write_atomically;
use crate::chunk::{tsv_reader, tsv_writer};
use crate::errors::PipelineError;
use crate::logging::format_count;
use crate::strategies::parser::MISSING;

/// Score used to rank and filter epitopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TopScoreMetric {
    /// Median IC50 over all algorithms
    #[default]
    Median,
    /// Lowest (best) IC50 over all algorithms
    Lowest,
}

impl TopScoreMetric {
    /// Column of the parsed files holding this score.
    #[must_use]
    pub fn column(self) -> &'static str {
        match self {
            Self::Median => "median_ic50",
            Self::Lowest => "best_ic50",
        }
    }
}

impl fmt::Display for TopScoreMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Median => "median",
            Self::Lowest => "lowest",
        })
    }
}

/// Reads a TSV with a header into its header and rows keyed by column name.
pub fn read_table(path: &Path) -> Result<(Vec<String>, Vec<HashMap<String, String>>)> {
    let mut reader = tsv_reader(path)?;
    let header: Vec<String> = reader.headers()?.iter().map(ToString::to_string).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("Failed to read TSV row from {}", path.display()))?;
        rows.push(header.iter().cloned().zip(record.iter().map(ToString::to_string)).collect());
    }
    Ok((header, rows))
}

/// Parses a score cell; missing or malformed scores sort last.
#[must_use]
pub fn score_of(row: &HashMap<String, String>, column: &str) -> f64 {
    row.get(column).and_then(|v| v.parse::<f64>().ok()).unwrap_or(f64::INFINITY)
}

fn compare_rows(a: &HashMap<String, String>, b: &HashMap<String, String>, column: &str) -> Ordering {
    let field = |row: &HashMap<String, String>, name: &str| row.get(name).cloned().unwrap_or_default();
    field(a, "index")
        .cmp(&field(b, "index"))
        .then_with(|| score_of(a, column).total_cmp(&score_of(b, column)))
        .then_with(|| field(a, "allele").cmp(&field(b, "allele")))
        .then_with(|| field(a, "mt_peptide").cmp(&field(b, "mt_peptide")))
}

/// Combines parsed cell artifacts into one file at `output`.
///
/// # Errors
///
/// [`PipelineError::NoUsableOutput`] if `parsed_paths` is empty; nothing is written then.
pub fn combine(parsed_paths: &[PathBuf], output: &Path, metric: TopScoreMetric) -> Result<()> {
    if parsed_paths.is_empty() {
        return Err(PipelineError::NoUsableOutput.into());
    }

    let mut header: Vec<String> = Vec::new();
    let mut rows: Vec<HashMap<String, String>> = Vec::new();
    for path in parsed_paths {
        let (file_header, file_rows) = read_table(path)?;
        for column in file_header {
            if !header.contains(&column) {
                header.push(column);
            }
        }
        rows.extend(file_rows);
    }
    rows.sort_by(|a, b| compare_rows(a, b, metric.column()));

    write_atomically(output, |tmp| {
        let mut writer = tsv_writer(tmp)?;
        writer.write_record(&header)?;
        for row in &rows {
            writer.write_record(header.iter().map(|c| row.get(c).map_or(MISSING, String::as_str)))?;
        }
        writer.flush()?;
        Ok(())
    })?;
    info!(
        "Combined {} epitopes from {} parsed files into {}",
        format_count(rows.len() as u64),
        parsed_paths.len(),
        output.display()
    );
    Ok(())
}
