//! Vaccine-vector peptide FASTA input.
//!
//! Every FASTA entry is one vaccine element. Sequence windows are the junctions between
//! every ordered pair of distinct elements, optionally joined by a spacer peptide, so they
//! depend on the epitope length and are generated once per length over the whole input.
//! The input is therefore planned as a single chunk.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fgoxide::io::Io;
use log::info;

use super::records::{TabularRow, read_rows, write_rows};
use super::sequences::{SequenceEntry, write_sequences};
use super::{CellOutputs, ConvertRequest, InputStrategy, SequenceParams};
use crate::artifacts::{ArtifactLayout, artifact_exists, key_path};
use crate::chunk::Chunk;
use crate::errors::PipelineError;

/// Spacer value meaning "join directly".
pub const NO_SPACER: &str = "None";

/// Peptide FASTA of vaccine-vector elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct VectorInput;

/// Converts a peptide FASTA into tabular rows, one per entry.
pub fn fasta_rows(lines: &[String], path: &Path) -> Result<Vec<TabularRow>> {
    let mut rows: Vec<TabularRow> = Vec::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(header) = line.strip_prefix('>') {
            let id = header.split_whitespace().next().unwrap_or_default().to_string();
            rows.push(TabularRow {
                index: id.clone(),
                gene_name: id,
                variant_type: "vector".to_string(),
                wildtype_sequence: String::new(),
                mutant_sequence: String::new(),
            });
        } else {
            if !line.is_ascii() {
                return Err(PipelineError::InvalidFileFormat {
                    file_type: "FASTA".to_string(),
                    path: path.to_path_buf(),
                    reason: format!("non-ASCII sequence data: {line}"),
                }
                .into());
            }
            let Some(current) = rows.last_mut() else {
                return Err(PipelineError::InvalidFileFormat {
                    file_type: "FASTA".to_string(),
                    path: path.to_path_buf(),
                    reason: "sequence data before the first header".to_string(),
                }
                .into());
            };
            current.mutant_sequence.push_str(&line.to_ascii_uppercase());
        }
    }
    Ok(rows)
}

/// Builds the junction peptides of every ordered pair of distinct elements.
///
/// Each junction is the last `length - 1` residues of the first element, the spacer, and
/// the first `length - 1` residues of the second element, so every `length`-mer in it
/// spans the junction. Junction `j` is numbered `2j`; there are no wildtype entries.
#[must_use]
pub fn junction_entries(rows: &[TabularRow], spacers: &[String], length: usize) -> Vec<SequenceEntry> {
    let flank = length.saturating_sub(1);
    let mut entries = Vec::new();
    for left in rows {
        for right in rows {
            if left.index == right.index {
                continue;
            }
            let left_seq = &left.mutant_sequence;
            let right_seq = &right.mutant_sequence;
            let tail = &left_seq[left_seq.len().saturating_sub(flank)..];
            let head = &right_seq[..flank.min(right_seq.len())];
            for spacer in spacers {
                let (index, joint) = if spacer == NO_SPACER {
                    (format!("{}|{}", left.index, right.index), String::new())
                } else {
                    (format!("{}|{spacer}|{}", left.index, right.index), spacer.clone())
                };
                entries.push(SequenceEntry {
                    seq_num: (entries.len() + 1) * 2,
                    index,
                    sequence: format!("{tail}{joint}{head}"),
                });
            }
        }
    }
    entries
}

impl InputStrategy for VectorInput {
    fn convert(&self, request: &ConvertRequest<'_>) -> Result<()> {
        let lines = Io::default()
            .read_lines(&request.input)
            .with_context(|| format!("Failed to read FASTA: {}", request.input.display()))?;
        write_rows(request.output, fasta_rows(&lines, request.input)?)
    }

    fn empty_input_hint(&self) -> &'static str {
        "Please check that the input FASTA contains peptide entries."
    }

    fn chunk_rows(&self, total_rows: usize, _requested: usize) -> usize {
        total_rows.max(1)
    }

    fn generate_sequences(
        &self,
        layout: &ArtifactLayout,
        _chunks: &[Chunk],
        params: &SequenceParams<'_>,
    ) -> Result<()> {
        let mut missing = Vec::new();
        for &length in params.epitope_lengths {
            if artifact_exists(&layout.length_sequence_path(length)) {
                info!("Junction FASTA file for Epitope Length {length} already exists. Skipping.");
            } else {
                missing.push(length);
            }
        }
        if missing.is_empty() {
            return Ok(());
        }
        let rows: Vec<TabularRow> = read_rows(&layout.tabular_path())?;
        for length in missing {
            info!("Generating Junction Peptide FASTA and Key Files - Epitope Length {length}");
            let fasta = layout.length_sequence_path(length);
            let entries = junction_entries(&rows, params.spacers, length);
            write_sequences(&fasta, &key_path(&fasta), &entries)?;
        }
        Ok(())
    }

    fn sequence_path(&self, layout: &ArtifactLayout, _chunk: &Chunk, length: usize) -> PathBuf {
        layout.length_sequence_path(length)
    }

    fn parse_output(&self, _layout: &ArtifactLayout, cell: &CellOutputs<'_>) -> Result<()> {
        cell.parse(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(id: &str, seq: &str) -> TabularRow {
        TabularRow {
            index: id.to_string(),
            gene_name: id.to_string(),
            variant_type: "vector".to_string(),
            wildtype_sequence: String::new(),
            mutant_sequence: seq.to_string(),
        }
    }

    #[test]
    fn test_fasta_rows_join_wrapped_sequence() -> Result<()> {
        let lines: Vec<String> =
            [">pep1 desc", "mtey", "klvv", ">pep2", "GADG"].iter().map(ToString::to_string).collect();
        let rows = fasta_rows(&lines, Path::new("vector.fa"))?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].index, "pep1");
        assert_eq!(rows[0].mutant_sequence, "MTEYKLVV");
        assert_eq!(rows[1].mutant_sequence, "GADG");
        Ok(())
    }

    #[test]
    fn test_sequence_before_header_is_rejected() {
        let lines = vec!["AAAA".to_string()];
        assert!(fasta_rows(&lines, Path::new("vector.fa")).is_err());
    }

    #[test]
    fn test_junctions_cover_ordered_pairs_and_spacers() {
        let rows = vec![element("a", "AAAAAAAA"), element("b", "CCCCCCCC")];
        let spacers = vec![NO_SPACER.to_string(), "GG".to_string()];
        let entries = junction_entries(&rows, &spacers, 3);
        let got: Vec<_> =
            entries.iter().map(|e| (e.seq_num, e.index.as_str(), e.sequence.as_str())).collect();
        assert_eq!(
            got,
            vec![
                (2, "a|b", "AACC"),
                (4, "a|GG|b", "AAGGCC"),
                (6, "b|a", "CCAA"),
                (8, "b|GG|a", "CCGGAA"),
            ]
        );
    }
}
