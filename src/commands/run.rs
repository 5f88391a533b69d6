//! Run the full epitope prediction pipeline.
//!
//! Converts the input into the tabular file, predicts binding for every compatible
//! (chunk, allele, epitope length, algorithm) combination and writes the combined, filtered
//! and ranked reports. Re-running with the same output directory resumes from the artifacts
//! already on disk.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use epiforge_lib::aggregate::TopScoreMetric;
use epiforge_lib::gateway::ProcessPredictionTool;
use epiforge_lib::pipeline::{Pipeline, PipelineOptions, PipelineOutcome};
use epiforge_lib::strategies::{InputKind, ReportColumn};
use epiforge_lib::strategies::vector::NO_SPACER;
use log::{info, warn};

use crate::commands::command::Command;
use crate::commands::common::{
    AlleleDirOptions, PredictionToolOptions, ThreadingOptions, WorkAxisOptions,
};

/// Predict, combine and rank candidate epitopes.
#[derive(Debug, Parser)]
#[command(
    name = "run",
    about = "\x1b[38;5;72m[PIPELINE]\x1b[0m       \x1b[36mPredict, combine and rank candidate epitopes\x1b[0m",
    long_about = r#"
Predict, combine and rank candidate epitopes.

The input is converted into a tabular file, split into chunks of --fasta-size / 2 rows,
and turned into mutant/wildtype sequence windows. Every compatible combination of chunk,
allele, epitope length and algorithm is sent to the prediction tool, spread over
--threads worker threads. Remote calls are spaced at least --min-call-interval-secs apart
unless --iedb-executable points at a local installation.

Every intermediate file is a checkpoint: an interrupted run restarted with the same
settings and output directory skips the work already done. A restart with different
settings fails before any work starts.

With --allele-dir, every allele must appear in the allele table of at least one selected
algorithm. --allele-specific-cutoffs then filters each allele listed in
<allele-dir>/cutoffs.csv by its own cutoff instead of --binding-threshold.

Example usage:
  epiforge run -i tumor.vcf --input-kind vcf -s TUMOR -a HLA-A*02:01,HLA-B*07:02 \
      -p NetMHC,SMM -e 9,10 -o out/ --threads 8
"#
)]
pub struct Run {
    /// Input file (VCF, BEDPE or peptide FASTA)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,

    /// Kind of the input file
    #[arg(long = "input-kind", value_enum, default_value_t = InputKind::Vcf)]
    pub input_kind: InputKind,

    /// Sample name used in output file names
    #[arg(short = 's', long = "sample-name")]
    pub sample_name: String,

    /// Output directory
    #[arg(short = 'o', long = "output-dir")]
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub axes: WorkAxisOptions,

    /// Length of the peptide sequence windows around each variant
    #[arg(short = 'l', long = "peptide-sequence-length", default_value_t = 21)]
    pub peptide_sequence_length: usize,

    #[command(flatten)]
    pub tool: PredictionToolOptions,

    #[command(flatten)]
    pub allele_dir: AlleleDirOptions,

    /// Number of sequence entries per chunk (each input row yields two)
    #[arg(long = "fasta-size", default_value_t = 200)]
    pub fasta_size: usize,

    #[command(flatten)]
    pub threading: ThreadingOptions,

    /// Score used to filter and rank epitopes
    #[arg(short = 'm', long = "top-score-metric", value_enum, default_value_t = TopScoreMetric::Median)]
    pub top_score_metric: TopScoreMetric,

    /// Report only epitopes scoring at or below this IC50 (nM)
    #[arg(short = 'b', long = "binding-threshold", default_value_t = 500.0)]
    pub binding_threshold: f64,

    /// Filter alleles by their cutoff in <allele-dir>/cutoffs.csv where they have one
    #[arg(long = "allele-specific-cutoffs", default_value = "false")]
    pub allele_specific_cutoffs: bool,

    /// Additional columns to add to every report (comma separated)
    #[arg(long = "additional-report-columns", value_enum, value_delimiter = ',')]
    pub additional_report_columns: Vec<ReportColumn>,

    /// Only use VCF records whose FILTER is PASS
    #[arg(long = "pass-only", default_value = "false")]
    pub pass_only: bool,

    /// Spacers placed between vector elements (vector FASTA input)
    #[arg(long = "spacers", value_delimiter = ',', default_value = NO_SPACER)]
    pub spacers: Vec<String>,

    /// Keep the tmp/ directory after a successful run
    #[arg(short = 'k', long = "keep-tmp-files", default_value = "false")]
    pub keep_tmp_files: bool,
}

impl Run {
    fn options(&self) -> Result<PipelineOptions> {
        Ok(PipelineOptions {
            input: self.input.clone(),
            input_kind: self.input_kind,
            sample_name: self.sample_name.clone(),
            alleles: self.axes.alleles.clone(),
            algorithms: self.axes.algorithms.clone(),
            output_dir: self.output_dir.clone(),
            epitope_lengths: self.axes.epitope_lengths.clone(),
            peptide_sequence_length: self.peptide_sequence_length,
            iedb_executable: self.tool.iedb_executable.clone(),
            iedb_retries: self.tool.iedb_retries,
            retry_backoff: self.tool.retry_backoff()?,
            min_call_interval: self.tool.min_call_interval()?,
            fasta_size: self.fasta_size,
            threads: self.threading.threads,
            top_score_metric: self.top_score_metric,
            binding_threshold: self.binding_threshold,
            pass_only: self.pass_only,
            spacers: self.spacers.clone(),
            allele_dir: self.allele_dir.allele_dir.clone(),
            allele_specific_cutoffs: self.allele_specific_cutoffs,
            additional_report_columns: self.additional_report_columns.clone(),
            keep_tmp_files: self.keep_tmp_files,
        })
    }
}

impl Command for Run {
    fn execute(&self, command_line: &str) -> Result<()> {
        self.tool.validate()?;

        info!("Starting Run");
        info!("Command line: {command_line}");
        info!("Input: {} ({})", self.input.display(), self.input_kind);
        info!("Output directory: {}", self.output_dir.display());
        info!("Alleles: {}", self.axes.alleles.join(","));
        info!(
            "Algorithms: {}",
            self.axes.algorithms.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
        );
        info!(
            "Epitope lengths: {}",
            self.axes.epitope_lengths.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
        );

        let tool = ProcessPredictionTool::new(&self.tool.prediction_tool);
        match Pipeline::new(self.options()?, &tool).execute()? {
            PipelineOutcome::Completed(ranked) => info!("Ranked report: {}", ranked.display()),
            PipelineOutcome::NoOutput => warn!("No output files were created. Aborting."),
        }
        Ok(())
    }
}
