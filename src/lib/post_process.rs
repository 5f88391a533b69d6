//! Filtering and ranking of the combined output.
//!
//! The filtered report keeps every combined row whose ranking score is at or below the
//! binding threshold. With allele-specific cutoffs, a row whose allele has a cutoff is held
//! to that cutoff instead; other alleles keep the binding threshold. The condensed report
//! keeps the best-scoring epitope of each source row and ranks them by score.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};

use crate::aggregate::{TopScoreMetric, read_table, score_of};
use crate::algorithm::AlleleCutoffs;
use crate::artifacts::write_atomically;
use crate::chunk::tsv_writer;
use crate::strategies::parser::MISSING;
use crate::strategies::records::write_rows;

/// One line of the condensed, ranked report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEpitope {
    /// 1-based rank by score
    pub rank: usize,
    /// Source row of the epitope
    pub index: String,
    /// Gene name of the source row
    pub gene_name: String,
    /// Variant type of the source row
    pub variant_type: String,
    /// Allele of the best prediction
    pub allele: String,
    /// Best-scoring mutant epitope
    pub mt_peptide: String,
    /// Matching wildtype epitope, or `NA`
    pub wt_peptide: String,
    /// Ranking score (IC50, nM)
    pub score: f64,
}

/// Counts of a post-processing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostProcessSummary {
    /// Rows in the filtered report
    pub passing: usize,
    /// Rows in the condensed report
    pub ranked: usize,
}

/// Writes the filtered and condensed reports from a combined file.
#[derive(Debug, Clone)]
pub struct PostProcessor {
    metric: TopScoreMetric,
    binding_threshold: f64,
    allele_cutoffs: Option<AlleleCutoffs>,
}

impl PostProcessor {
    /// Creates a post-processor ranking by `metric` and keeping scores `<= binding_threshold`.
    #[must_use]
    pub fn new(metric: TopScoreMetric, binding_threshold: f64) -> Self {
        Self { metric, binding_threshold, allele_cutoffs: None }
    }

    /// Holds alleles listed in `cutoffs` to their own cutoff instead of the binding threshold.
    #[must_use]
    pub fn with_allele_cutoffs(mut self, cutoffs: AlleleCutoffs) -> Self {
        self.allele_cutoffs = Some(cutoffs);
        self
    }

    /// Threshold a row predicted for `allele` must meet.
    fn threshold_for(&self, allele: Option<&str>) -> f64 {
        self.allele_cutoffs
            .as_ref()
            .zip(allele)
            .and_then(|(cutoffs, allele)| cutoffs.cutoff_for(allele))
            .unwrap_or(self.binding_threshold)
    }

    /// Reads `combined` and writes `filtered` and `ranked`.
    pub fn run(&self, combined: &Path, filtered: &Path, ranked: &Path) -> Result<PostProcessSummary> {
        let column = self.metric.column();
        let (header, rows) = read_table(combined)?;
        let passing: Vec<&HashMap<String, String>> = rows
            .iter()
            .filter(|row| score_of(row, column) <= self.threshold_for(row.get("allele").map(String::as_str)))
            .collect();

        write_atomically(filtered, |tmp| {
            let mut writer = tsv_writer(tmp)?;
            writer.write_record(&header)?;
            for row in &passing {
                writer.write_record(header.iter().map(|c| row.get(c).map_or(MISSING, String::as_str)))?;
            }
            writer.flush()?;
            Ok(())
        })?;
        let cutoffs = if self.allele_cutoffs.is_some() { " or the allele-specific cutoff" } else { "" };
        info!(
            "Filtering by {column} <= {}{cutoffs}: {} of {} epitopes kept",
            self.binding_threshold,
            passing.len(),
            rows.len()
        );

        let mut best: BTreeMap<&str, &HashMap<String, String>> = BTreeMap::new();
        for &row in &passing {
            let index = row.get("index").map_or("", String::as_str);
            let keep = best
                .get(index)
                .is_none_or(|current| score_of(row, column) < score_of(current, column));
            if keep {
                best.insert(index, row);
            }
        }
        let mut condensed: Vec<RankedEpitope> = best
            .into_iter()
            .map(|(index, row)| {
                let field = |name: &str| row.get(name).cloned().unwrap_or_else(|| MISSING.to_string());
                RankedEpitope {
                    rank: 0,
                    index: index.to_string(),
                    gene_name: field("gene_name"),
                    variant_type: field("variant_type"),
                    allele: field("allele"),
                    mt_peptide: field("mt_peptide"),
                    wt_peptide: field("wt_peptide"),
                    score: score_of(row, column),
                }
            })
            .collect();
        condensed.sort_by(|a, b| a.score.total_cmp(&b.score).then_with(|| a.index.cmp(&b.index)));
        for (i, epitope) in condensed.iter_mut().enumerate() {
            epitope.rank = i + 1;
        }

        let summary = PostProcessSummary { passing: passing.len(), ranked: condensed.len() };
        write_rows(ranked, condensed)?;
        Ok(summary)
    }
}
