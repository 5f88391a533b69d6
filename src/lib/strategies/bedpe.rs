//! Gene-fusion BEDPE input.
//!
//! Data lines carry the fusion name in column 7 and the fusion peptide in the last column.
//! Fusions have no wildtype counterpart, so only mutant sequences are generated.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fgoxide::io::Io;

use super::records::{TabularRow, write_rows};
use super::vcf::generate_missing_chunk_sequences;
use super::{CellOutputs, ConvertRequest, InputStrategy, SequenceParams};
use crate::artifacts::ArtifactLayout;
use crate::chunk::Chunk;
use crate::errors::PipelineError;

/// Columns through the fusion name.
const MIN_COLUMNS: usize = 8;

/// Fusion calls in BEDPE format.
#[derive(Debug, Clone, Copy, Default)]
pub struct BedpeInput;

/// Converts the data lines of a BEDPE file into tabular rows.
pub fn bedpe_rows(lines: &[String], path: &Path) -> Result<Vec<TabularRow>> {
    let mut rows = Vec::new();
    for (line_number, line) in lines.iter().enumerate() {
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < MIN_COLUMNS {
            return Err(PipelineError::InvalidFileFormat {
                file_type: "BEDPE".to_string(),
                path: path.to_path_buf(),
                reason: format!(
                    "line {} has {} columns, expected at least {MIN_COLUMNS}",
                    line_number + 1,
                    fields.len()
                ),
            }
            .into());
        }
        let name = fields[6];
        let peptide = fields[fields.len() - 1].trim();
        if peptide.is_empty() || peptide == "." || peptide == "NA" {
            continue;
        }
        rows.push(TabularRow {
            index: format!("{}.{name}", rows.len() + 1),
            gene_name: name.to_string(),
            variant_type: "fusion".to_string(),
            wildtype_sequence: String::new(),
            mutant_sequence: peptide.to_string(),
        });
    }
    Ok(rows)
}

impl InputStrategy for BedpeInput {
    fn convert(&self, request: &ConvertRequest<'_>) -> Result<()> {
        let lines = Io::default()
            .read_lines(&request.input)
            .with_context(|| format!("Failed to read BEDPE: {}", request.input.display()))?;
        write_rows(request.output, bedpe_rows(&lines, request.input)?)
    }

    fn empty_input_hint(&self) -> &'static str {
        "Please check that the input bedpe file contains fusion entries."
    }

    fn generate_sequences(
        &self,
        layout: &ArtifactLayout,
        chunks: &[Chunk],
        params: &SequenceParams<'_>,
    ) -> Result<()> {
        generate_missing_chunk_sequences(layout, chunks, params)
    }

    fn sequence_path(&self, layout: &ArtifactLayout, chunk: &Chunk, _length: usize) -> PathBuf {
        layout.chunk_sequence_path(chunk)
    }

    fn parse_output(&self, layout: &ArtifactLayout, cell: &CellOutputs<'_>) -> Result<()> {
        let tabular = layout.chunk_tabular_path(&cell.chunk);
        cell.parse(Some(&tabular))
    }
}
