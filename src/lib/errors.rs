//! Custom error types for epiforge operations.
//!
//! Every fatal condition of a pipeline run maps to one [`PipelineError`] variant, so callers
//! can tell a graceful abort ([`PipelineError::NoUsableOutput`]) from a hard failure by
//! downcasting an `anyhow::Error`.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for epiforge operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Error type for epiforge operations
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Restart inputs disagree with the configuration recorded by a previous run
    #[error(
        "Restart inputs are different from past inputs:\n\
         Past input: {field} - {past}\n\
         Current input: {field} - {current}\n\
         Aborting."
    )]
    Configuration {
        /// The configuration field that differs
        field: String,
        /// Value recorded by the previous run (`<absent>` if it was not recorded)
        past: String,
        /// Value supplied to this run
        current: String,
    },

    /// The converted tabular input has no data rows
    #[error("The TSV file is empty. {hint}")]
    EmptyInput {
        /// Input-kind specific hint naming the likely cause
        hint: String,
    },

    /// The external prediction tool did not succeed within its retry budget
    #[error(
        "Prediction tool failed for algorithm {algorithm}, allele {allele}, \
         epitope length {length} after {attempts} attempt(s): {reason}"
    )]
    ExternalToolFailure {
        /// Algorithm (IEDB method) that was requested
        algorithm: String,
        /// Allele that was requested
        allele: String,
        /// Epitope length that was requested
        length: usize,
        /// Number of attempts made
        attempts: usize,
        /// Description of the last failure
        reason: String,
    },

    /// Every work unit was skipped or produced nothing
    #[error("No output files were created. Aborting.")]
    NoUsableOutput,

    /// The run was cancelled because a sibling work unit failed
    #[error("Work cancelled after an earlier failure")]
    Cancelled,

    /// Invalid parameter value provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// The parameter name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// File format error
    #[error("Invalid {file_type} file '{}': {reason}", path.display())]
    InvalidFileFormat {
        /// Type of file (e.g., "VCF", "prediction TSV")
        file_type: String,
        /// Path to the file
        path: PathBuf,
        /// Explanation of the problem
        reason: String,
    },
}

impl PipelineError {
    /// Returns true if this error should end a run quietly instead of failing it.
    #[must_use]
    pub fn is_graceful(&self) -> bool {
        matches!(self, Self::NoUsableOutput)
    }
}
