//! Annotated VCF input.
//!
//! Each ALT allele whose INFO field carries peptide-context annotations becomes one tabular
//! row. The annotations are `MT_SEQ` (mutant context, required), `WT_SEQ` (wildtype
//! context), `GENE` and `TYPE`. Multi-allelic records may give one comma-separated value per
//! ALT.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fgoxide::io::Io;
use log::{debug, info};

use super::records::{TabularRow, write_rows};
use super::sequences::generate_chunk_sequences;
use super::{CellOutputs, ConvertRequest, InputStrategy, SequenceParams};
use crate::artifacts::{ArtifactLayout, artifact_exists, key_path};
use crate::chunk::Chunk;
use crate::errors::PipelineError;

/// Minimum number of columns of a VCF data line (through INFO).
const MIN_COLUMNS: usize = 8;

/// Variant-call input annotated with peptide contexts.
#[derive(Debug, Clone, Copy, Default)]
pub struct VcfInput;

/// Looks up `key` in a VCF INFO field, choosing the value for ALT number `alt` when the
/// field holds one value per ALT.
fn info_value<'a>(info: &'a str, key: &str, alt: usize, alt_count: usize) -> Option<&'a str> {
    let raw = info.split(';').find_map(|entry| {
        let (k, v) = entry.split_once('=')?;
        (k == key).then_some(v)
    })?;
    let values: Vec<&str> = raw.split(',').collect();
    let value = if values.len() == alt_count { values[alt] } else { raw };
    (!value.is_empty() && value != ".").then_some(value)
}

/// Converts the data lines of a VCF into tabular rows.
pub fn vcf_rows(lines: &[String], path: &Path, pass_only: bool) -> Result<Vec<TabularRow>> {
    let mut rows = Vec::new();
    for (line_number, line) in lines.iter().enumerate() {
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < MIN_COLUMNS {
            return Err(PipelineError::InvalidFileFormat {
                file_type: "VCF".to_string(),
                path: path.to_path_buf(),
                reason: format!(
                    "line {} has {} columns, expected at least {MIN_COLUMNS}",
                    line_number + 1,
                    fields.len()
                ),
            }
            .into());
        }
        let (chrom, pos, reference, alts, filter, info) =
            (fields[0], fields[1], fields[3], fields[4], fields[6], fields[7]);
        if pass_only && filter != "PASS" && filter != "." {
            debug!("Skipping {chrom}:{pos} with filter {filter}");
            continue;
        }
        let alts: Vec<&str> = alts.split(',').collect();
        for (alt_index, alt) in alts.iter().enumerate() {
            let Some(mutant) = info_value(info, "MT_SEQ", alt_index, alts.len()) else {
                continue;
            };
            rows.push(TabularRow {
                index: format!("{chrom}.{pos}.{reference}.{alt}"),
                gene_name: info_value(info, "GENE", alt_index, alts.len()).unwrap_or("NA").to_string(),
                variant_type: info_value(info, "TYPE", alt_index, alts.len())
                    .unwrap_or("missense")
                    .to_string(),
                wildtype_sequence: info_value(info, "WT_SEQ", alt_index, alts.len())
                    .unwrap_or_default()
                    .to_string(),
                mutant_sequence: mutant.to_string(),
            });
        }
    }
    Ok(rows)
}

/// Generates the sequence-window files of every chunk that lacks one.
pub(super) fn generate_missing_chunk_sequences(
    layout: &ArtifactLayout,
    chunks: &[Chunk],
    params: &SequenceParams<'_>,
) -> Result<()> {
    for chunk in chunks {
        let fasta = layout.chunk_sequence_path(chunk);
        let label = chunk.sequence_label();
        if artifact_exists(&fasta) {
            info!("Split FASTA file for Entries {label} already exists. Skipping.");
            continue;
        }
        info!("Generating Variant Peptide FASTA and Key Files - Entries {label}");
        generate_chunk_sequences(
            &layout.chunk_tabular_path(chunk),
            chunk,
            &fasta,
            &key_path(&fasta),
            params.peptide_sequence_length,
            params.min_epitope_length(),
        )?;
    }
    Ok(())
}

impl InputStrategy for VcfInput {
    fn convert(&self, request: &ConvertRequest<'_>) -> Result<()> {
        let lines = Io::default()
            .read_lines(&request.input)
            .with_context(|| format!("Failed to read VCF: {}", request.input.display()))?;
        let rows = vcf_rows(&lines, request.input, request.pass_only)?;
        write_rows(request.output, rows)
    }

    fn empty_input_hint(&self) -> &'static str {
        "Please check that the input VCF contains missense, inframe indel, or frameshift mutations."
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

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn lines(data: &[&str]) -> Vec<String> {
        let mut lines = vec!["##fileformat=VCFv4.2".to_string(), "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO".to_string()];
        lines.extend(data.iter().map(ToString::to_string));
        lines
    }

    #[test]
    fn test_rows_from_annotated_records() -> Result<()> {
        let lines = lines(&[
            "chr12\t25398284\t.\tC\tA\t50\tPASS\tGENE=KRAS;TYPE=missense;WT_SEQ=MTEYKLVVVGAGGVGKSALTI;MT_SEQ=MTEYKLVVVGADGVGKSALTI",
            "chr1\t100\t.\tA\tT\t50\tPASS\tGENE=X",
        ]);
        let rows = vcf_rows(&lines, Path::new("in.vcf"), false)?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].index, "chr12.25398284.C.A");
        assert_eq!(rows[0].gene_name, "KRAS");
        assert_eq!(rows[0].wildtype_sequence, "MTEYKLVVVGAGGVGKSALTI");
        Ok(())
    }

    #[test]
    fn test_multi_allelic_values_are_split_per_alt() -> Result<()> {
        let lines = lines(&["chr1\t5\t.\tA\tC,G\t50\tPASS\tMT_SEQ=KKKKKKKKK,RRRRRRRRR;GENE=Y"]);
        let rows = vcf_rows(&lines, Path::new("in.vcf"), false)?;
        let got: Vec<_> = rows.iter().map(|r| (r.index.as_str(), r.mutant_sequence.as_str())).collect();
        assert_eq!(got, vec![("chr1.5.A.C", "KKKKKKKKK"), ("chr1.5.A.G", "RRRRRRRRR")]);
        assert_eq!(rows[1].gene_name, "Y");
        Ok(())
    }

    #[rstest]
    #[case("PASS", true, 1)]
    #[case(".", true, 1)]
    #[case("LowQual", true, 0)]
    #[case("LowQual", false, 1)]
    fn test_pass_only(#[case] filter: &str, #[case] pass_only: bool, #[case] expected: usize) {
        let record = format!("chr1\t5\t.\tA\tC\t50\t{filter}\tMT_SEQ=KKKKKKKKK");
        let rows = vcf_rows(&lines(&[&record]), Path::new("in.vcf"), pass_only).unwrap();
        assert_eq!(rows.len(), expected);
    }

    #[test]
    fn test_truncated_line_is_invalid_format() {
        let err = vcf_rows(&lines(&["chr1\t5\tA"]), Path::new("in.vcf"), false).unwrap_err();
        assert!(err.to_string().contains("expected at least 8"));
    }
}
