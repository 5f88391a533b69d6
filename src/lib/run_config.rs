//! Recorded run configuration for restart checks.
//!
//! The first run in an output directory records every artifact-determining setting in
//! `log/inputs.yml`. A later run in the same directory must use the same settings, since
//! it will trust the artifacts already on disk: a changed or added setting is a
//! [`PipelineError::Configuration`] error raised before any work starts, as is a recorded
//! configuration that cannot be parsed. Operational
//! settings (thread count, retry policy, throttle interval, tmp-file retention) are not
//! recorded and may change between runs. A different tool version only logs a warning.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::aggregate::TopScoreMetric;
use crate::artifacts::write_atomically;
use crate::errors::PipelineError;
use crate::strategies::{InputKind, ReportColumn};

/// Key holding the tool version.
const VERSION_KEY: &str = "epiforge_version";

/// Settings that determine the content of a run's artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Version of the tool that wrote the configuration
    pub epiforge_version: String,
    /// Raw input file
    pub input: PathBuf,
    /// Kind of the raw input
    pub input_kind: InputKind,
    /// Sample name embedded in artifact names
    pub sample_name: String,
    /// Alleles to predict for
    pub alleles: Vec<String>,
    /// Prediction algorithms, by name
    pub algorithms: Vec<String>,
    /// Epitope lengths to predict
    pub epitope_lengths: Vec<usize>,
    /// Length of generated sequence windows
    pub peptide_sequence_length: usize,
    /// Sequence entries per chunk
    pub fasta_size: usize,
    /// Ranking score
    pub top_score_metric: TopScoreMetric,
    /// Binding threshold of the filtered report
    pub binding_threshold: f64,
    /// Keep only PASS records (VCF input)
    pub pass_only: bool,
    /// Spacers between vector elements
    pub spacers: Vec<String>,
    /// Directory of per-method allele tables
    pub allele_dir: Option<PathBuf>,
    /// Filter by allele-specific cutoffs
    pub allele_specific_cutoffs: bool,
    /// Optional report columns
    pub additional_report_columns: Vec<ReportColumn>,
    /// Local prediction executable
    pub iedb_executable: Option<PathBuf>,
}

/// Renders a YAML value on one line for diagnostics.
fn render(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Sequence(items) => {
            format!("[{}]", items.iter().map(render).collect::<Vec<_>>().join(", "))
        }
        Value::Tagged(tagged) => render(&tagged.value),
        Value::Mapping(_) => serde_yaml::to_string(value).unwrap_or_default().trim().to_string(),
    }
}

impl RunConfig {
    /// Writes the configuration as YAML.
    pub fn write(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialise run configuration")?;
        write_atomically(path, |tmp| {
            fs::write(tmp, yaml).with_context(|| format!("Failed to write {}", tmp.display()))
        })
    }

    /// Compares this configuration with one recorded earlier.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Configuration`] naming the first setting that was added or changed.
    pub fn compare_with(&self, recorded: &Value) -> Result<()> {
        let current = serde_yaml::to_value(self).context("Failed to serialise run configuration")?;
        let (Value::Mapping(current), Value::Mapping(past)) = (&current, recorded) else {
            return Err(PipelineError::Configuration {
                field: "inputs.yml".to_string(),
                past: render(recorded),
                current: "a mapping of run settings".to_string(),
            }
            .into());
        };

        for (key, value) in current {
            let field = key.as_str().unwrap_or_default();
            let past_value = past.get(key);
            if field == VERSION_KEY {
                if past_value != Some(value) {
                    warn!(
                        "Restart to be executed with a different epiforge version:\nPast version: {}\nCurrent version: {}",
                        past_value.map_or_else(|| "<absent>".to_string(), render),
                        render(value)
                    );
                }
                continue;
            }
            match past_value {
                None if value.is_null() => {}
                Some(past) if past == value => {}
                _ => {
                    return Err(PipelineError::Configuration {
                        field: field.to_string(),
                        past: past_value.map_or_else(|| "<absent>".to_string(), render),
                        current: render(value),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Records this configuration at `path`, or checks it against the one recorded there.
    pub fn check_or_record(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            info!("Recording run configuration to {}", path.display());
            return self.write(path);
        }
        let text = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let recorded: Value = serde_yaml::from_str(&text).map_err(|e| PipelineError::Configuration {
            field: path.display().to_string(),
            past: format!("malformed YAML ({e})"),
            current: "a mapping of run settings".to_string(),
        })?;
        self.compare_with(&recorded)?;
        info!("Restart configuration matches {}", path.display());
        Ok(())
    }
}
