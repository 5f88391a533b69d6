//! Deterministic artifact naming and write-once checkpoints.
//!
//! Every intermediate and final file of a run lives at a path that is a pure function of
//! its identifying tuple (sample, chunk, allele, length, algorithm or "parsed"). The
//! existence of a file at its canonical path is the only record that the work producing it
//! has completed, so every writer goes through [`write_atomically`]: content is written to a
//! `.partial` sibling and renamed into place only once it is complete. A process killed
//! mid-write leaves a `.partial` file behind, never a truncated canonical artifact.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::chunk::Chunk;

/// Suffix of in-progress artifacts.
pub const PARTIAL_SUFFIX: &str = ".partial";

/// Canonical locations of every artifact produced by a run.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    output_dir: PathBuf,
    tmp_dir: PathBuf,
    sample_name: String,
    peptide_sequence_length: usize,
    tabular_override: Option<PathBuf>,
}

impl ArtifactLayout {
    /// Creates a layout rooted at `output_dir` for one sample.
    #[must_use]
    pub fn new(output_dir: &Path, sample_name: &str, peptide_sequence_length: usize) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            tmp_dir: output_dir.join("tmp"),
            sample_name: sample_name.to_string(),
            peptide_sequence_length,
            tabular_override: None,
        }
    }

    /// Uses an existing file as the converted tabular input instead of `<sample>.tsv`.
    #[must_use]
    pub fn with_tabular_path(mut self, path: PathBuf) -> Self {
        self.tabular_override = Some(path);
        self
    }

    /// Creates the output, `tmp` and `log` directories.
    pub fn create_dirs(&self) -> Result<()> {
        for dir in [&self.output_dir, &self.tmp_dir, &self.log_dir()] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }

    /// Sample name embedded in artifact names.
    #[must_use]
    pub fn sample_name(&self) -> &str {
        &self.sample_name
    }

    /// Top-level output directory.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Directory holding per-unit intermediate artifacts.
    #[must_use]
    pub fn tmp_dir(&self) -> &Path {
        &self.tmp_dir
    }

    /// Directory holding the recorded run configuration.
    #[must_use]
    pub fn log_dir(&self) -> PathBuf {
        self.output_dir.join("log")
    }

    /// Recorded run configuration of the first run in this directory.
    #[must_use]
    pub fn inputs_log_path(&self) -> PathBuf {
        self.log_dir().join("inputs.yml")
    }

    /// The whole converted tabular input.
    #[must_use]
    pub fn tabular_path(&self) -> PathBuf {
        self.tabular_override
            .clone()
            .unwrap_or_else(|| self.output_dir.join(format!("{}.tsv", self.sample_name)))
    }

    /// Tabular rows of one chunk, e.g. `sample.tsv_1-100`.
    #[must_use]
    pub fn chunk_tabular_path(&self, chunk: &Chunk) -> PathBuf {
        append_to_path(&self.tabular_path(), &format!("_{}", chunk.tsv_label()))
    }

    /// Common prefix of all sequence-window files.
    #[must_use]
    pub fn sequence_basename(&self) -> PathBuf {
        self.tmp_dir.join(format!("{}_{}.fa.split", self.sample_name, self.peptide_sequence_length))
    }

    /// Sequence-window file generated for one chunk.
    #[must_use]
    pub fn chunk_sequence_path(&self, chunk: &Chunk) -> PathBuf {
        append_to_path(&self.sequence_basename(), &format!("_{}", chunk.sequence_label()))
    }

    /// Sequence-window file generated globally for one epitope length.
    #[must_use]
    pub fn length_sequence_path(&self, length: usize) -> PathBuf {
        append_to_path(&self.sequence_basename(), &format!("_1-2.{length}.tsv"))
    }

    /// Prediction output of one (algorithm, allele, length, chunk) work unit.
    #[must_use]
    pub fn prediction_path(&self, method: &str, allele: &str, length: usize, chunk: &Chunk) -> PathBuf {
        self.tmp_dir.join(format!(
            "{}.{method}.{allele}.{length}.tsv_{}",
            self.sample_name,
            chunk.sequence_label()
        ))
    }

    /// Parsed output merging every algorithm of one (allele, length, chunk) cell.
    #[must_use]
    pub fn parsed_path(&self, allele: &str, length: usize, chunk: &Chunk) -> PathBuf {
        self.tmp_dir.join(format!(
            "{}.{allele}.{length}.parsed.tsv_{}",
            self.sample_name,
            chunk.sequence_label()
        ))
    }

    /// Combined parsed output of the whole run.
    #[must_use]
    pub fn combined_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.all_epitopes.tsv", self.sample_name))
    }

    /// Report of combined rows passing the binding filter.
    #[must_use]
    pub fn filtered_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.filtered.tsv", self.sample_name))
    }

    /// Condensed report ranked by score.
    #[must_use]
    pub fn ranked_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.filtered.condensed.ranked.tsv", self.sample_name))
    }
}

/// Key file accompanying a sequence-window file.
#[must_use]
pub fn key_path(sequence_path: &Path) -> PathBuf {
    append_to_path(sequence_path, ".key")
}

/// In-progress sibling of an artifact.
#[must_use]
pub fn partial_path(path: &Path) -> PathBuf {
    append_to_path(path, PARTIAL_SUFFIX)
}

/// Returns true if a completed artifact exists at `path`.
#[must_use]
pub fn artifact_exists(path: &Path) -> bool {
    path.is_file()
}

/// Returns true if the artifact at `path` has zero bytes.
pub fn artifact_is_empty(path: &Path) -> io::Result<bool> {
    Ok(fs::metadata(path)?.len() == 0)
}

/// Writes an artifact through a `.partial` sibling and renames it into place.
///
/// `write` receives the partial path and must leave the complete content there. Any stale
/// partial file from an interrupted earlier attempt is removed first. If `write` fails the
/// partial file is removed and the canonical path is left untouched.
pub fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&Path) -> Result<()>,
{
    let partial = partial_path(path);
    remove_if_present(&partial)?;
    if let Err(e) = write(&partial) {
        let _ = fs::remove_file(&partial);
        return Err(e);
    }
    fs::rename(&partial, path).with_context(|| {
        format!("Failed to move {} into place at {}", partial.display(), path.display())
    })
}

/// Removes a file, treating "not found" as success.
pub fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
    }
}

fn append_to_path(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}
