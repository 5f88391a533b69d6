//! Sequence-window FASTA and key file generation.
//!
//! Row `i` of the tabular input (1-based over the whole input) produces the FASTA entries
//! `>2i-1` (wildtype) and `>2i` (mutant). The key file maps every sequence number back to
//! the row's `index`, which is how the output parser re-attaches predictions to rows.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use fgoxide::io::Io;
use log::debug;

use super::records::{KeyRow, TabularRow, read_rows, write_rows};
use crate::artifacts::write_atomically;
use crate::chunk::Chunk;

/// One FASTA entry with its key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceEntry {
    /// Sequence number, used as the FASTA header
    pub seq_num: usize,
    /// Tabular row the entry came from
    pub index: String,
    /// Peptide sequence
    pub sequence: String,
}

/// Trims a peptide context to at most `length` residues, keeping the centre.
///
/// Non-ASCII input is returned unchanged.
///
/// # Example
///
/// ```
/// use epiforge_lib::strategies::sequences::centre_window;
///
/// assert_eq!(centre_window("AAAKLMAAA", 3), "KLM");
/// assert_eq!(centre_window("KLM", 9), "KLM");
/// ```
#[must_use]
pub fn centre_window(sequence: &str, length: usize) -> &str {
    if sequence.len() <= length || !sequence.is_ascii() {
        return sequence;
    }
    let start = (sequence.len() - length) / 2;
    &sequence[start..start + length]
}

/// Builds the FASTA entries of the rows of one chunk.
///
/// Sequences shorter than `min_length` cannot contain an epitope of that length and are
/// dropped, as are empty wildtype contexts.
#[must_use]
pub fn chunk_entries(
    chunk: &Chunk,
    rows: &[TabularRow],
    peptide_sequence_length: usize,
    min_length: usize,
) -> Vec<SequenceEntry> {
    let mut entries = Vec::with_capacity(rows.len() * 2);
    for (offset, row) in rows.iter().enumerate() {
        let row_number = chunk.start + offset;
        let candidates = [
            (row_number * 2 - 1, row.wildtype_sequence.as_str()),
            (row_number * 2, row.mutant_sequence.as_str()),
        ];
        for (seq_num, context) in candidates {
            let window = centre_window(context.trim(), peptide_sequence_length);
            if window.is_empty() || window.len() < min_length {
                debug!("Skipping sequence {seq_num} of {}: too short", row.index);
                continue;
            }
            entries.push(SequenceEntry {
                seq_num,
                index: row.index.clone(),
                sequence: window.to_ascii_uppercase(),
            });
        }
    }
    entries
}

/// Writes entries as a FASTA file plus key file, each through a partial file.
///
/// An empty entry list yields a zero-byte FASTA, which marks the chunk as having nothing
/// to predict on.
pub fn write_sequences(fasta_path: &Path, key_path: &Path, entries: &[SequenceEntry]) -> Result<()> {
    let keys: Vec<KeyRow> =
        entries.iter().map(|e| KeyRow { seq_num: e.seq_num, index: e.index.clone() }).collect();
    write_rows(key_path, keys)?;
    write_atomically(fasta_path, |tmp| {
        let mut writer = Io::default()
            .new_writer(&tmp)
            .with_context(|| format!("Failed to create FASTA: {}", tmp.display()))?;
        for entry in entries {
            writeln!(writer, ">{}\n{}", entry.seq_num, entry.sequence)?;
        }
        writer.flush()?;
        Ok(())
    })
}

/// Generates the FASTA and key files of one chunk from its tabular chunk file.
pub fn generate_chunk_sequences(
    tabular_chunk: &Path,
    chunk: &Chunk,
    fasta_path: &Path,
    key_path: &Path,
    peptide_sequence_length: usize,
    min_length: usize,
) -> Result<()> {
    let rows: Vec<TabularRow> = read_rows(tabular_chunk)?;
    let entries = chunk_entries(chunk, &rows, peptide_sequence_length, min_length);
    write_sequences(fasta_path, key_path, &entries)
}
