//! Row types of the tabular artifacts shared by every input kind.

use std::path::Path;

use anyhow::{Context, Result};
use fgoxide::io::DelimFile;
use serde::{Deserialize, Serialize};

use crate::artifacts::{artifact_is_empty, write_atomically};

/// One row of the converted tabular input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabularRow {
    /// Unique identifier of the source record
    pub index: String,
    /// Gene (or fusion / vector element) name
    pub gene_name: String,
    /// Kind of the source record, e.g. `missense` or `fusion`
    pub variant_type: String,
    /// Wildtype peptide context; empty when there is none
    pub wildtype_sequence: String,
    /// Mutant peptide context
    pub mutant_sequence: String,
}

/// One row of a sequence key file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRow {
    /// Sequence number used as the FASTA header
    pub seq_num: usize,
    /// Tabular row the sequence was generated from
    pub index: String,
}

/// One row of the prediction tool's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRow {
    /// Allele as reported by the tool
    pub allele: String,
    /// FASTA sequence number the epitope was cut from
    pub seq_num: usize,
    /// 1-based start of the epitope within its sequence
    pub start: usize,
    /// 1-based end of the epitope within its sequence
    pub end: usize,
    /// Epitope length
    pub length: usize,
    /// Epitope sequence
    pub peptide: String,
    /// Predicted IC50 (nM)
    pub ic50: f64,
    /// Percentile rank, when the algorithm reports one
    #[serde(default)]
    pub percentile: Option<f64>,
}

/// Reads every row of a TSV artifact with a header, treating a zero-byte file as no rows.
pub fn read_rows<T>(path: &Path) -> Result<Vec<T>>
where
    T: for<'de> Deserialize<'de>,
{
    if artifact_is_empty(path).with_context(|| format!("Failed to stat {}", path.display()))? {
        return Ok(Vec::new());
    }
    DelimFile::default()
        .read_tsv(&path)
        .with_context(|| format!("Failed to read TSV: {}", path.display()))
}

/// Writes rows to a TSV artifact through a partial file.
pub fn write_rows<T>(path: &Path, rows: Vec<T>) -> Result<()>
where
    T: Serialize,
{
    write_atomically(path, |tmp| {
        DelimFile::default()
            .write_tsv(&tmp, rows)
            .with_context(|| format!("Failed to write TSV: {}", tmp.display()))
    })
}
