//! End-to-end orchestration of one run.
//!
//! A run proceeds through the stages below. Every stage checks for its artifacts before
//! writing them, so re-running an interrupted run resumes where it stopped.
//!
//! 1. Validate the settings, including every allele against the allele catalog, and record
//!    or check the run configuration (`log/inputs.yml`).
//! 2. Convert the raw input into the tabular file.
//! 3. Split the tabular file into chunks.
//! 4. Generate sequence-window FASTA and key files.
//! 5. Run the prediction engine over every (chunk, allele, length, algorithm) unit.
//! 6. Combine the parsed cell artifacts.
//! 7. Write the filtered and ranked reports.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::aggregate::{TopScoreMetric, combine};
use crate::algorithm::{AlleleCatalog, AlleleCutoffs, PredictionAlgorithm};
use crate::artifacts::{ArtifactLayout, artifact_exists};
use crate::chunk::{count_rows, split_tabular};
use crate::engine::{ExecutionEngine, WorkSettings};
use crate::errors::PipelineError;
use crate::gateway::{PredictionGateway, PredictionTool};
use crate::logging::{StageTimer, format_count};
use crate::post_process::PostProcessor;
use crate::rate_limit::RateLimiter;
use crate::run_config::RunConfig;
use crate::strategies::{ConvertRequest, InputKind, InputStrategy, ReportColumn, SequenceParams};
use crate::validation::{
    validate_distinct_non_empty, validate_file_exists, validate_positive, validate_sample_name,
};

/// Settings of one run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub input: PathBuf,
    pub input_kind: InputKind,
    pub sample_name: String,
    pub alleles: Vec<String>,
    pub algorithms: Vec<PredictionAlgorithm>,
    pub output_dir: PathBuf,
    pub epitope_lengths: Vec<usize>,
    pub peptide_sequence_length: usize,
    /// Local prediction executable; remote calls are throttled when absent
    pub iedb_executable: Option<PathBuf>,
    pub iedb_retries: usize,
    pub retry_backoff: Duration,
    pub min_call_interval: Duration,
    /// Sequence entries per chunk; each tabular row yields two entries
    pub fasta_size: usize,
    pub threads: usize,
    pub top_score_metric: TopScoreMetric,
    pub binding_threshold: f64,
    pub pass_only: bool,
    pub spacers: Vec<String>,
    pub allele_dir: Option<PathBuf>,
    /// Filter each allele by its cutoff from `<allele_dir>/cutoffs.csv` where it has one
    pub allele_specific_cutoffs: bool,
    /// Optional columns added to every report
    pub additional_report_columns: Vec<ReportColumn>,
    pub keep_tmp_files: bool,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Reports were written; holds the ranked report
    Completed(PathBuf),
    /// No work unit produced output, so nothing was combined
    NoOutput,
}

impl PipelineOptions {
    /// Checks the settings before anything touches the disk.
    pub fn validate(&self) -> Result<()> {
        validate_file_exists(&self.input, "Input file")?;
        validate_sample_name(&self.sample_name)?;
        validate_distinct_non_empty(&self.alleles, "alleles")?;
        validate_distinct_non_empty(&self.algorithms, "algorithms")?;
        validate_distinct_non_empty(&self.epitope_lengths, "epitope-lengths")?;
        validate_positive(self.peptide_sequence_length, "peptide-sequence-length")?;
        validate_positive(self.threads, "threads")?;
        if self.fasta_size < 2 {
            return Err(PipelineError::InvalidParameter {
                parameter: "fasta-size".to_string(),
                reason: format!("must be at least 2 (two sequences per row), got {}", self.fasta_size),
            }
            .into());
        }
        if let Some(&length) = self.epitope_lengths.iter().find(|&&l| l == 0) {
            return Err(PipelineError::InvalidParameter {
                parameter: "epitope-lengths".to_string(),
                reason: format!("lengths must be positive, got {length}"),
            }
            .into());
        }
        if self.allele_specific_cutoffs && self.allele_dir.is_none() {
            return Err(PipelineError::InvalidParameter {
                parameter: "allele-specific-cutoffs".to_string(),
                reason: "requires --allele-dir holding cutoffs.csv".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Loads the allele catalog of the selected algorithms and checks every allele against it.
    ///
    /// # Errors
    ///
    /// A read error for a missing allele table, or [`PipelineError::InvalidParameter`] for an
    /// allele no selected algorithm knows.
    pub fn catalog(&self) -> Result<AlleleCatalog> {
        let catalog = match &self.allele_dir {
            Some(dir) => AlleleCatalog::load(dir, &self.algorithms)?,
            None => AlleleCatalog::by_name(),
        };
        catalog.check_alleles_valid(&self.alleles)?;
        Ok(catalog)
    }

    /// Sample tag written into the reports, if `sample_name` is an additional report column.
    #[must_use]
    pub fn sample_tag(&self) -> Option<&str> {
        self.additional_report_columns
            .contains(&ReportColumn::SampleName)
            .then_some(self.sample_name.as_str())
    }

    /// The artifact-determining part of the settings.
    #[must_use]
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            epiforge_version: env!("CARGO_PKG_VERSION").to_string(),
            input: self.input.clone(),
            input_kind: self.input_kind,
            sample_name: self.sample_name.clone(),
            alleles: self.alleles.clone(),
            algorithms: self.algorithms.iter().map(|a| a.name().to_string()).collect(),
            epitope_lengths: self.epitope_lengths.clone(),
            peptide_sequence_length: self.peptide_sequence_length,
            fasta_size: self.fasta_size,
            top_score_metric: self.top_score_metric,
            binding_threshold: self.binding_threshold,
            pass_only: self.pass_only,
            spacers: self.spacers.clone(),
            allele_dir: self.allele_dir.clone(),
            allele_specific_cutoffs: self.allele_specific_cutoffs,
            additional_report_columns: self.additional_report_columns.clone(),
            iedb_executable: self.iedb_executable.clone(),
        }
    }

    /// Artifact locations of this run.
    #[must_use]
    pub fn layout(&self) -> ArtifactLayout {
        ArtifactLayout::new(&self.output_dir, &self.sample_name, self.peptide_sequence_length)
    }
}

/// One configured run.
pub struct Pipeline<'a> {
    options: PipelineOptions,
    tool: &'a dyn PredictionTool,
}

impl<'a> Pipeline<'a> {
    /// Creates a run that calls `tool` for predictions.
    #[must_use]
    pub fn new(options: PipelineOptions, tool: &'a dyn PredictionTool) -> Self {
        Self { options, tool }
    }

    /// Runs every stage.
    ///
    /// # Errors
    ///
    /// Any fatal [`PipelineError`] (wrapped in `anyhow`), or an I/O failure. The graceful
    /// "no usable output" abort is reported as [`PipelineOutcome::NoOutput`] instead.
    pub fn execute(&self) -> Result<PipelineOutcome> {
        let opts = &self.options;
        opts.validate()?;
        let catalog = opts.catalog()?;
        let cutoffs: Option<AlleleCutoffs> =
            if opts.allele_specific_cutoffs { Some(catalog.cutoffs()?) } else { None };
        let layout = opts.layout();
        layout.create_dirs()?;
        opts.run_config().check_or_record(&layout.inputs_log_path())?;
        let handler = opts.input_kind.handler();

        let tabular = layout.tabular_path();
        if artifact_exists(&tabular) {
            info!("TSV file already exists. Skipping.");
        } else {
            let timer = StageTimer::new(&format!("Converting .{} to TSV", opts.input_kind));
            handler.convert(&ConvertRequest {
                input: &opts.input,
                output: &tabular,
                pass_only: opts.pass_only,
            })?;
            timer.log_completion();
        }

        let total_rows = count_rows(&tabular)?;
        if total_rows == 0 {
            return Err(PipelineError::EmptyInput { hint: handler.empty_input_hint().to_string() }.into());
        }
        info!("{} entries in {}", format_count(total_rows as u64), tabular.display());

        let timer = StageTimer::new("Splitting TSV into smaller chunks");
        let chunk_rows = handler.chunk_rows(total_rows, opts.fasta_size / 2);
        let chunks = split_tabular(&layout, total_rows, chunk_rows)?;
        timer.log_completion();

        let timer = StageTimer::new("Generating Variant Peptide FASTA and Key Files");
        handler.generate_sequences(
            &layout,
            &chunks,
            &SequenceParams {
                peptide_sequence_length: opts.peptide_sequence_length,
                epitope_lengths: &opts.epitope_lengths,
                spacers: &opts.spacers,
            },
        )?;
        timer.log_completion();

        let limiter = RateLimiter::new(opts.min_call_interval);
        let gateway = PredictionGateway::new(self.tool, &limiter, opts.retry_backoff);
        let settings = WorkSettings {
            alleles: &opts.alleles,
            epitope_lengths: &opts.epitope_lengths,
            algorithms: &opts.algorithms,
            retries: opts.iedb_retries,
            executable: opts.iedb_executable.as_deref(),
            threads: opts.threads,
            sample_tag: opts.sample_tag(),
        };
        let timer = StageTimer::new("Running predictions");
        let parsed = ExecutionEngine::new(&layout, handler, &catalog, gateway, settings).run(&chunks)?;
        timer.log_completion();

        let combined = layout.combined_path();
        if artifact_exists(&combined) {
            info!("Combined output {} already exists. Skipping.", combined.display());
        } else {
            let timer = StageTimer::new("Combining Parsed IEDB Output Files");
            match combine(&parsed, &combined, opts.top_score_metric) {
                Ok(()) => timer.log_completion(),
                Err(e) if is_graceful(&e) => {
                    warn!("{e}");
                    return Ok(PipelineOutcome::NoOutput);
                }
                Err(e) => return Err(e),
            }
        }

        let timer = StageTimer::new("Filtering and ranking epitopes");
        let ranked = layout.ranked_path();
        let mut post_processor = PostProcessor::new(opts.top_score_metric, opts.binding_threshold);
        if let Some(cutoffs) = cutoffs {
            info!("Using allele-specific cutoffs for {} allele(s)", cutoffs.len());
            post_processor = post_processor.with_allele_cutoffs(cutoffs);
        }
        let summary = post_processor.run(
            &combined,
            &layout.filtered_path(),
            &ranked,
        )?;
        info!(
            "{} epitopes pass the binding filter; {} ranked",
            format_count(summary.passing as u64),
            format_count(summary.ranked as u64)
        );
        timer.log_completion();

        info!(
            "Done: Pipeline finished successfully. File {} contains list of filtered putative neoantigens.",
            ranked.display()
        );
        if !opts.keep_tmp_files {
            remove_tmp_dir(layout.tmp_dir())?;
        }
        Ok(PipelineOutcome::Completed(ranked))
    }
}

fn is_graceful(error: &anyhow::Error) -> bool {
    error.downcast_ref::<PipelineError>().is_some_and(PipelineError::is_graceful)
}

fn remove_tmp_dir(dir: &Path) -> Result<()> {
    fs::remove_dir_all(dir).with_context(|| format!("Failed to remove {}", dir.display()))
}
