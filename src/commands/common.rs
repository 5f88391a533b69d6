//! Common CLI options shared across commands.
//!
//! This module provides shared argument structures that can be composed into
//! command structs using `#[command(flatten)]`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail};
use clap::Args;

use epiforge_lib::algorithm::PredictionAlgorithm;
use epiforge_lib::validation::validate_file_exists;

/// Options selecting the prediction work axes.
#[derive(Debug, Clone, Args)]
pub struct WorkAxisOptions {
    /// Alleles to predict for (comma separated)
    #[arg(short = 'a', long = "alleles", value_delimiter = ',', required = true)]
    pub alleles: Vec<String>,

    /// Prediction algorithms to run (comma separated), e.g. NetMHC,SMM
    #[arg(short = 'p', long = "algorithms", value_delimiter = ',', required = true)]
    pub algorithms: Vec<PredictionAlgorithm>,

    /// Epitope lengths to predict (comma separated)
    #[arg(short = 'e', long = "epitope-lengths", value_delimiter = ',', default_value = "8,9,10,11")]
    pub epitope_lengths: Vec<usize>,
}

/// Options for calling the external prediction tool.
#[derive(Debug, Clone, Args)]
pub struct PredictionToolOptions {
    /// Program implementing the prediction tool contract
    #[arg(long = "prediction-tool", default_value = "iedb-predict")]
    pub prediction_tool: PathBuf,

    /// Local prediction executable; when set, calls are not throttled
    #[arg(long = "iedb-executable")]
    pub iedb_executable: Option<PathBuf>,

    /// Number of retries of a failed prediction call
    #[arg(short = 'r', long = "iedb-retries", default_value_t = 5)]
    pub iedb_retries: usize,

    /// Base delay between retries, in seconds; grows linearly with the attempt number
    #[arg(long = "retry-backoff-secs", default_value_t = 60.0)]
    pub retry_backoff_secs: f64,

    /// Minimum spacing of remote prediction calls, in seconds
    #[arg(long = "min-call-interval-secs", default_value_t = 60.0)]
    pub min_call_interval_secs: f64,
}

impl PredictionToolOptions {
    /// Validates the tool options.
    ///
    /// # Errors
    ///
    /// Returns an error if a delay is negative or too large, or the local executable is missing.
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(exe) = &self.iedb_executable {
            validate_file_exists(exe, "IEDB executable")?;
        }
        self.retry_backoff()?;
        self.min_call_interval()?;
        Ok(())
    }

    /// Delay unit between retries.
    ///
    /// # Errors
    ///
    /// Returns an error if `--retry-backoff-secs` is not a representable delay.
    pub fn retry_backoff(&self) -> anyhow::Result<Duration> {
        seconds("--retry-backoff-secs", self.retry_backoff_secs)
    }

    /// Throttle interval of remote calls.
    ///
    /// # Errors
    ///
    /// Returns an error if `--min-call-interval-secs` is not a representable delay.
    pub fn min_call_interval(&self) -> anyhow::Result<Duration> {
        seconds("--min-call-interval-secs", self.min_call_interval_secs)
    }
}

/// Converts a delay option to a [`Duration`].
fn seconds(name: &str, secs: f64) -> anyhow::Result<Duration> {
    if !secs.is_finite() || secs < 0.0 {
        bail!("{name} must be a non-negative number of seconds, got {secs}");
    }
    Duration::try_from_secs_f64(secs).map_err(|e| anyhow!("{name} is too large ({secs} seconds): {e}"))
}

/// Options locating per-algorithm allele tables.
#[derive(Debug, Clone, Default, Args)]
pub struct AlleleDirOptions {
    /// Directory with `class_i/<method>.tsv` and `class_ii/<method>.tsv` allele tables and an
    /// optional `cutoffs.csv`
    #[arg(long = "allele-dir")]
    pub allele_dir: Option<PathBuf>,
}

/// Thread budget of a run.
///
/// # Examples
///
/// ```bash
/// epiforge run --threads 8 ...
/// # Splits 8 threads over the chunk, allele, length and algorithm axes
/// ```
#[derive(Debug, Clone, Args)]
pub struct ThreadingOptions {
    /// Total number of worker threads
    #[arg(short = 't', long = "threads", default_value_t = 1)]
    pub threads: usize,
}
