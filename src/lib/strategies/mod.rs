//! Input-kind specific collaborators of the engine.
//!
//! Each [`InputKind`] is bound at compile time to one [`InputStrategy`] implementation
//! that knows how to:
//!
//! - convert the raw input into the tabular representation ([`InputStrategy::convert`]);
//! - generate sequence-window FASTA and key files from tabular chunks
//!   ([`InputStrategy::generate_sequences`]);
//! - reduce the per-algorithm prediction files of one cell into a parsed file
//!   ([`InputStrategy::parse_output`]).
//!
//! The engine only talks to these three capabilities (plus a few planning hooks), so it
//! never needs to know the file format it is working on.

pub mod bedpe;
pub mod parser;
pub mod records;
pub mod sequences;
pub mod vcf;
pub mod vector;

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::ValueEnum;
use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

use crate::algorithm::PredictionAlgorithm;
use crate::artifacts::ArtifactLayout;
use crate::chunk::Chunk;

pub use bedpe::BedpeInput;
pub use parser::{ParseRequest, ReportColumn, parse_predictions};
pub use vcf::VcfInput;
pub use vector::VectorInput;

/// Inputs of [`InputStrategy::convert`].
#[derive(Debug, Clone, Copy)]
pub struct ConvertRequest<'a> {
    /// Raw input file
    pub input: &'a Path,
    /// Tabular file to create
    pub output: &'a Path,
    /// Keep only records that passed all filters (VCF only)
    pub pass_only: bool,
}

/// Parameters of sequence-window generation.
#[derive(Debug, Clone, Copy)]
pub struct SequenceParams<'a> {
    /// Maximum length of a generated sequence window
    pub peptide_sequence_length: usize,
    /// Epitope lengths that will be predicted
    pub epitope_lengths: &'a [usize],
    /// Spacer peptides placed between vector elements
    pub spacers: &'a [String],
}

impl SequenceParams<'_> {
    /// Shortest epitope length requested, or 1 if none are.
    #[must_use]
    pub fn min_epitope_length(&self) -> usize {
        self.epitope_lengths.iter().copied().min().unwrap_or(1)
    }
}

/// Everything the algorithms of one cell produced, ready to be parsed.
#[derive(Debug, Clone)]
pub struct CellOutputs<'a> {
    /// Chunk of the cell
    pub chunk: Chunk,
    /// Prediction file of every algorithm that ran for the cell
    pub prediction_files: &'a [(PredictionAlgorithm, PathBuf)],
    /// Key file of the cell's sequence-window file
    pub key_file: &'a Path,
    /// Parsed artifact to create
    pub output: &'a Path,
    /// Sample tag for the leading `sample_name` column, if requested
    pub sample_tag: Option<&'a str>,
}

impl CellOutputs<'_> {
    /// Runs the shared output parser over this cell.
    pub fn parse(&self, tabular_chunk: Option<&Path>) -> Result<()> {
        parse_predictions(&ParseRequest {
            prediction_files: self.prediction_files,
            tabular_chunk,
            key_file: self.key_file,
            output: self.output,
            sample_tag: self.sample_tag,
        })
    }
}

/// Format-specific collaborators of the engine.
#[enum_dispatch]
pub trait InputStrategy {
    /// Converts the raw input into the tabular file `request.output`.
    fn convert(&self, request: &ConvertRequest<'_>) -> Result<()>;

    /// Hint appended to the empty-input diagnostic.
    fn empty_input_hint(&self) -> &'static str;

    /// Number of tabular rows per chunk given the requested chunk size.
    fn chunk_rows(&self, _total_rows: usize, requested: usize) -> usize {
        requested
    }

    /// Writes every missing sequence-window file (and its key file).
    fn generate_sequences(
        &self,
        layout: &ArtifactLayout,
        chunks: &[Chunk],
        params: &SequenceParams<'_>,
    ) -> Result<()>;

    /// Sequence-window file used for one (chunk, epitope length).
    fn sequence_path(&self, layout: &ArtifactLayout, chunk: &Chunk, length: usize) -> PathBuf;

    /// Reduces the prediction files of one cell into its parsed artifact.
    fn parse_output(&self, layout: &ArtifactLayout, cell: &CellOutputs<'_>) -> Result<()>;
}

/// Compile-time binding of every input kind to its strategy.
#[enum_dispatch(InputStrategy)]
#[derive(Debug, Clone, Copy)]
pub enum InputHandler {
    VcfInput,
    BedpeInput,
    VectorInput,
}

/// Supported input file kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputKind {
    /// VCF annotated with `WT_SEQ`/`MT_SEQ` peptide contexts
    Vcf,
    /// Gene-fusion BEDPE with fusion peptides in the last column
    Bedpe,
    /// Peptide FASTA of vaccine-vector elements
    VectorFasta,
}

impl InputKind {
    /// The strategy implementing this kind.
    #[must_use]
    pub fn handler(self) -> InputHandler {
        match self {
            Self::Vcf => VcfInput.into(),
            Self::Bedpe => BedpeInput.into(),
            Self::VectorFasta => VectorInput.into(),
        }
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Vcf => "vcf",
            Self::Bedpe => "bedpe",
            Self::VectorFasta => "vector-fasta",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_vector_input_is_a_single_chunk() {
        assert_eq!(InputKind::Vcf.handler().chunk_rows(250, 100), 100);
        assert_eq!(InputKind::Bedpe.handler().chunk_rows(250, 100), 100);
        assert_eq!(InputKind::VectorFasta.handler().chunk_rows(250, 100), 250);
    }

    #[test]
    fn test_sequence_paths_by_kind() {
        let layout = ArtifactLayout::new(Path::new("/out"), "S", 21);
        let chunk = Chunk::new(1, 100);
        assert_eq!(
            InputKind::Vcf.handler().sequence_path(&layout, &chunk, 9),
            PathBuf::from("/out/tmp/S_21.fa.split_1-200")
        );
        assert_eq!(
            InputKind::VectorFasta.handler().sequence_path(&layout, &chunk, 9),
            PathBuf::from("/out/tmp/S_21.fa.split_1-2.9.tsv")
        );
    }

    #[test]
    fn test_min_epitope_length() {
        let lengths = [10, 8, 9];
        let params = SequenceParams { peptide_sequence_length: 21, epitope_lengths: &lengths, spacers: &[] };
        assert_eq!(params.min_epitope_length(), 8);
    }
}
