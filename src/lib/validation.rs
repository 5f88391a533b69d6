//! Input validation utilities
//!
//! This module provides common validation functions for command-line parameters and
//! file paths with consistent error messages. All functions return structured errors from
//! [`crate::errors`].

use crate::errors::{PipelineError, Result};
use std::fmt::Display;
use std::path::Path;

/// Validate that a file exists
///
/// # Arguments
/// * `path` - Path to validate
/// * `description` - Human-readable description of the file (e.g., "Input VCF")
///
/// # Errors
/// Returns an error if the file does not exist
///
/// # Example
/// ```
/// use epiforge_lib::validation::validate_file_exists;
///
/// let result = validate_file_exists("/nonexistent/input.vcf", "Input VCF");
/// assert!(result.is_err());
/// ```
pub fn validate_file_exists<P: AsRef<Path>>(path: P, description: &str) -> Result<()> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        return Err(PipelineError::InvalidFileFormat {
            file_type: description.to_string(),
            path: path_ref.to_path_buf(),
            reason: "File does not exist".to_string(),
        });
    }
    Ok(())
}

/// Validate that a value is positive (> 0)
///
/// # Errors
/// Returns an error if the value is not positive
///
/// # Example
/// ```
/// use epiforge_lib::validation::validate_positive;
///
/// validate_positive(4, "threads").unwrap();
/// assert!(validate_positive(0, "threads").is_err());
/// ```
#[allow(clippy::needless_pass_by_value)]
pub fn validate_positive<T: Ord + Display + Default>(value: T, name: &str) -> Result<()> {
    if value <= T::default() {
        return Err(PipelineError::InvalidParameter {
            parameter: name.to_string(),
            reason: format!("Must be positive (> 0), got: {value}"),
        });
    }
    Ok(())
}

/// Validate that a list parameter has at least one entry and no duplicates.
///
/// # Errors
/// Returns an error if the list is empty or an entry appears twice
///
/// # Example
/// ```
/// use epiforge_lib::validation::validate_distinct_non_empty;
///
/// validate_distinct_non_empty(&["HLA-A*02:01", "HLA-B*07:02"], "alleles").unwrap();
/// assert!(validate_distinct_non_empty::<&str>(&[], "alleles").is_err());
/// assert!(validate_distinct_non_empty(&[9, 9], "epitope-lengths").is_err());
/// ```
pub fn validate_distinct_non_empty<T: PartialEq + Display>(values: &[T], name: &str) -> Result<()> {
    if values.is_empty() {
        return Err(PipelineError::InvalidParameter {
            parameter: name.to_string(),
            reason: "At least one value is required".to_string(),
        });
    }
    for (i, value) in values.iter().enumerate() {
        if values[..i].contains(value) {
            return Err(PipelineError::InvalidParameter {
                parameter: name.to_string(),
                reason: format!("Duplicate value: {value}"),
            });
        }
    }
    Ok(())
}

/// Validate that a sample name can be embedded in artifact file names.
///
/// Artifact names are dot- and underscore-delimited, so path separators and
/// whitespace would break the deterministic naming scheme.
///
/// # Errors
/// Returns an error if the name is empty or contains `/`, `\` or whitespace
pub fn validate_sample_name(name: &str) -> Result<()> {
    if name.is_empty() || name.chars().any(|c| c == '/' || c == '\\' || c.is_whitespace()) {
        return Err(PipelineError::InvalidParameter {
            parameter: "sample-name".to_string(),
            reason: format!(
                "Must be non-empty and contain no path separators or whitespace, got: '{name}'"
            ),
        });
    }
    Ok(())
}
