//! Invocation of the external prediction tool.
//!
//! [`PredictionGateway::invoke`] wraps one prediction request with, in order:
//!
//! 1. a checkpoint check: an existing output artifact is reported without calling the tool;
//! 2. throttling through the shared [`RateLimiter`] when no local executable is configured
//!    (the tool then talks to a shared remote service);
//! 3. a bounded retry loop: the tool gets `1 + retries` attempts, with a linear backoff
//!    between attempts, before the request fails with
//!    [`PipelineError::ExternalToolFailure`].
//!
//! The retry loop is the only retry layer: the tool itself is always called with `-r 0`.
//!
//! The tool writes into a `.partial` file that is renamed into place only after it succeeds.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use log::{debug, warn};

use crate::algorithm::PredictionAlgorithm;
use crate::artifacts::{artifact_exists, write_atomically};
use crate::errors::PipelineError;
use crate::rate_limit::{CancellationToken, RateLimiter};

/// Maximum number of stderr bytes echoed in failure messages.
const STDERR_TAIL: usize = 2_000;

/// Everything the prediction tool needs for one work unit.
#[derive(Debug, Clone, Copy)]
pub struct PredictionRequest<'a> {
    /// Sequence-window FASTA to predict on
    pub sequence_path: &'a Path,
    /// Canonical output artifact
    pub output_path: &'a Path,
    /// Algorithm to run
    pub algorithm: PredictionAlgorithm,
    /// Allele to predict for
    pub allele: &'a str,
    /// Epitope length to predict
    pub epitope_length: usize,
    /// Number of retries after the first failed attempt
    pub retries: usize,
    /// Local executable override, forwarded to the tool as `-e`
    pub executable: Option<&'a Path>,
}

impl fmt::Display for PredictionRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Allele {} and Epitope Length {} with Method {}",
            self.allele, self.epitope_length, self.algorithm
        )
    }
}

/// The external prediction tool.
///
/// Implementations run a single attempt and leave the predictions at `output`.
pub trait PredictionTool: Send + Sync {
    /// Runs one attempt of `request`, writing the predictions to `output`.
    fn run(&self, request: &PredictionRequest<'_>, output: &Path) -> Result<()>;
}

impl<F> PredictionTool for F
where
    F: Fn(&PredictionRequest<'_>, &Path) -> Result<()> + Send + Sync,
{
    fn run(&self, request: &PredictionRequest<'_>, output: &Path) -> Result<()> {
        self(request, output)
    }
}

/// Runs a prediction program as a child process.
///
/// The program is called as
/// `<program> <sequence_file> <output_file> <method> <allele> -r 0 [-e <executable>] [-l <length>]`,
/// where `-l` is only passed to algorithms that need an epitope length. Each call is a single
/// attempt; [`PredictionGateway`] does the retrying.
#[derive(Debug, Clone)]
pub struct ProcessPredictionTool {
    program: PathBuf,
}

impl ProcessPredictionTool {
    /// Creates a tool that runs `program`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }

    /// Builds the command line for one attempt.
    #[must_use]
    pub fn command(&self, request: &PredictionRequest<'_>, output: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg(request.sequence_path)
            .arg(output)
            .arg(request.algorithm.method())
            .arg(request.algorithm.service_allele_name(request.allele))
            .arg("-r")
            .arg("0");
        if let Some(executable) = request.executable {
            command.arg("-e").arg(executable);
        }
        if request.algorithm.needs_epitope_length() {
            command.arg("-l").arg(request.epitope_length.to_string());
        }
        command
    }
}

impl PredictionTool for ProcessPredictionTool {
    fn run(&self, request: &PredictionRequest<'_>, output: &Path) -> Result<()> {
        let result = self
            .command(request, output)
            .output()
            .with_context(|| format!("Failed to launch prediction tool {}", self.program.display()))?;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let mut start = stderr.len().saturating_sub(STDERR_TAIL);
            while !stderr.is_char_boundary(start) {
                start += 1;
            }
            let tail = &stderr[start..];
            bail!("{} ({})", result.status, tail.trim());
        }
        if !output.is_file() {
            bail!("tool exited successfully but wrote no output to {}", output.display());
        }
        Ok(())
    }
}

/// How a gateway call was satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// The output artifact already existed; the tool was not called
    CheckpointHit(PathBuf),
    /// The tool ran and produced the output artifact
    Produced(PathBuf),
}

impl Invocation {
    /// Path of the output artifact.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::CheckpointHit(p) | Self::Produced(p) => p,
        }
    }
}

/// Throttled, retrying front end to a [`PredictionTool`].
pub struct PredictionGateway<'a> {
    tool: &'a dyn PredictionTool,
    limiter: &'a RateLimiter,
    retry_backoff: Duration,
}

impl<'a> PredictionGateway<'a> {
    /// Creates a gateway sharing `limiter` with every other caller of the remote service.
    #[must_use]
    pub fn new(tool: &'a dyn PredictionTool, limiter: &'a RateLimiter, retry_backoff: Duration) -> Self {
        Self { tool, limiter, retry_backoff }
    }

    /// Produces the output artifact of `request`, unless it already exists.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Cancelled`] if `cancel` fires before the tool succeeds, or
    /// [`PipelineError::ExternalToolFailure`] once every attempt has failed.
    pub fn invoke(
        &self,
        request: &PredictionRequest<'_>,
        cancel: &CancellationToken,
    ) -> std::result::Result<Invocation, PipelineError> {
        if artifact_exists(request.output_path) {
            return Ok(Invocation::CheckpointHit(request.output_path.to_path_buf()));
        }

        let throttled = request.executable.is_none();
        let attempts = request.retries + 1;
        let mut last_error = None;
        for attempt in 0..attempts {
            if attempt > 1 && !cancel.sleep(self.retry_backoff * (attempt as u32 - 1)) {
                return Err(PipelineError::Cancelled);
            }
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            if throttled && !self.limiter.acquire(cancel) {
                return Err(PipelineError::Cancelled);
            }
            debug!("Prediction attempt {} of {attempts} for {request}", attempt + 1);
            let result = write_atomically(request.output_path, |tmp| self.tool.run(request, tmp));
            if throttled {
                self.limiter.record_completion();
            }
            match result {
                Ok(()) => return Ok(Invocation::Produced(request.output_path.to_path_buf())),
                Err(e) => {
                    warn!("Prediction attempt {} of {attempts} failed for {request}: {e:#}", attempt + 1);
                    last_error = Some(e);
                }
            }
        }

        Err(PipelineError::ExternalToolFailure {
            algorithm: request.algorithm.method().to_string(),
            allele: request.allele.to_string(),
            length: request.epitope_length,
            attempts,
            reason: last_error.map_or_else(String::new, |e| format!("{e:#}")),
        })
    }
}
