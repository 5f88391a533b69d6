//! Reduction of per-algorithm prediction files into one parsed file per cell.
//!
//! Every prediction row is mapped back to its tabular row through the key file. Mutant
//! epitopes (even sequence numbers) become output rows; wildtype epitopes (odd sequence
//! numbers) at the same start and length are attached to them for comparison. When a sample
//! tag is given, every row leads with a `sample_name` column holding it.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::records::{KeyRow, PredictionRow, TabularRow, read_rows};
use crate::algorithm::PredictionAlgorithm;
use crate::artifacts::write_atomically;
use crate::chunk::tsv_writer;
use crate::errors::PipelineError;

/// Value written for missing cells.
pub const MISSING: &str = "NA";

/// Column holding the sample tag, when one is requested.
pub const SAMPLE_COLUMN: &str = "sample_name";

/// Optional columns added to the parsed files and every report built from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportColumn {
    /// The sample name of the run
    #[value(name = "sample_name")]
    SampleName,
}

/// Columns every parsed file has, after the optional sample column.
pub const FIXED_COLUMNS: [&str; 12] = [
    "index",
    "gene_name",
    "variant_type",
    "allele",
    "peptide_length",
    "start",
    "mt_peptide",
    "wt_peptide",
    "best_method",
    "best_ic50",
    "median_ic50",
    "wt_median_ic50",
];

/// Inputs of one parse.
#[derive(Debug, Clone)]
pub struct ParseRequest<'a> {
    /// Prediction files of the cell, one per algorithm that ran
    pub prediction_files: &'a [(PredictionAlgorithm, PathBuf)],
    /// Tabular rows of the chunk, when the input kind has them
    pub tabular_chunk: Option<&'a Path>,
    /// Key file of the sequence-window file
    pub key_file: &'a Path,
    /// Parsed output artifact
    pub output: &'a Path,
    /// Sample tag written as the leading `sample_name` column, if any
    pub sample_tag: Option<&'a str>,
}

/// Scores of one epitope under one algorithm.
#[derive(Debug, Clone, Copy)]
struct Score {
    ic50: f64,
    percentile: Option<f64>,
}

#[derive(Debug, Default)]
struct Epitope {
    index: String,
    peptide: String,
    scores: BTreeMap<PredictionAlgorithm, Score>,
}

/// Identity of an epitope within a cell: (allele, length, sequence number, start).
type EpitopeKey = (String, usize, usize, usize);

/// Median of a non-empty slice.
fn median(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 { (values[mid - 1] + values[mid]) / 2.0 } else { values[mid] }
}

fn format_score(value: f64) -> String {
    format!("{value}")
}

/// Parses every prediction file of a cell into one parsed artifact.
pub fn parse_predictions(request: &ParseRequest<'_>) -> Result<()> {
    let keys: HashMap<usize, String> = read_rows::<KeyRow>(request.key_file)?
        .into_iter()
        .map(|k| (k.seq_num, k.index))
        .collect();
    let rows: HashMap<String, TabularRow> = match request.tabular_chunk {
        Some(path) => read_rows::<TabularRow>(path)?.into_iter().map(|r| (r.index.clone(), r)).collect(),
        None => HashMap::new(),
    };

    let mut mutants: BTreeMap<EpitopeKey, Epitope> = BTreeMap::new();
    let mut wildtypes: BTreeMap<EpitopeKey, Epitope> = BTreeMap::new();
    for (algorithm, path) in request.prediction_files {
        let predictions: Vec<PredictionRow> = read_rows(path)?;
        for prediction in predictions {
            let index = keys.get(&prediction.seq_num).ok_or_else(|| PipelineError::InvalidFileFormat {
                file_type: "prediction output".to_string(),
                path: path.clone(),
                reason: format!("sequence number {} is not in the key file", prediction.seq_num),
            })?;
            let is_mutant = prediction.seq_num % 2 == 0;
            // Wildtype entries are keyed by their mutant partner so the two line up.
            let partner = if is_mutant { prediction.seq_num } else { prediction.seq_num + 1 };
            let key = (prediction.allele.clone(), prediction.length, partner, prediction.start);
            let table = if is_mutant { &mut mutants } else { &mut wildtypes };
            let epitope = table.entry(key).or_insert_with(|| Epitope {
                index: index.clone(),
                peptide: prediction.peptide.clone(),
                scores: BTreeMap::new(),
            });
            epitope
                .scores
                .insert(*algorithm, Score { ic50: prediction.ic50, percentile: prediction.percentile });
        }
    }

    let mut methods: Vec<PredictionAlgorithm> =
        request.prediction_files.iter().map(|(a, _)| *a).collect();
    methods.sort();
    methods.dedup();

    write_atomically(request.output, |tmp| {
        let mut writer = tsv_writer(tmp)?;
        let mut header: Vec<String> = request.sample_tag.map(|_| SAMPLE_COLUMN.to_string()).into_iter().collect();
        header.extend(FIXED_COLUMNS.iter().map(ToString::to_string));
        for method in &methods {
            header.push(format!("{}_ic50", method.name()));
            header.push(format!("{}_percentile", method.name()));
        }
        writer.write_record(&header)?;

        for (key, mutant) in &mutants {
            let wildtype = wildtypes.get(key);
            if wildtype.is_some_and(|wt| wt.peptide == mutant.peptide) {
                continue;
            }
            let (allele, length, _, start) = key;
            let Some((best_method, best)) = mutant
                .scores
                .iter()
                .min_by(|a, b| a.1.ic50.total_cmp(&b.1.ic50))
                .map(|(m, s)| (*m, *s))
            else {
                continue;
            };
            let mut mt_ic50s: Vec<f64> = mutant.scores.values().map(|s| s.ic50).collect();
            let wt_median = wildtype.map(|wt| {
                let mut values: Vec<f64> = wt.scores.values().map(|s| s.ic50).collect();
                median(&mut values)
            });
            let source = rows.get(&mutant.index);

            let mut record: Vec<String> = request.sample_tag.map(str::to_string).into_iter().collect();
            record.extend([
                mutant.index.clone(),
                source.map_or_else(|| MISSING.to_string(), |r| r.gene_name.clone()),
                source.map_or_else(|| MISSING.to_string(), |r| r.variant_type.clone()),
                allele.clone(),
                length.to_string(),
                start.to_string(),
                mutant.peptide.clone(),
                wildtype.map_or_else(|| MISSING.to_string(), |wt| wt.peptide.clone()),
                best_method.name().to_string(),
                format_score(best.ic50),
                format_score(median(&mut mt_ic50s)),
                wt_median.map_or_else(|| MISSING.to_string(), format_score),
            ]);
            for method in &methods {
                match mutant.scores.get(method) {
                    Some(score) => {
                        record.push(format_score(score.ic50));
                        record.push(score.percentile.map_or_else(|| MISSING.to_string(), format_score));
                    }
                    None => {
                        record.push(MISSING.to_string());
                        record.push(MISSING.to_string());
                    }
                }
            }
            writer.write_record(&record)?;
        }
        writer.flush().with_context(|| format!("Failed to write {}", tmp.display()))?;
        Ok(())
    })
}
