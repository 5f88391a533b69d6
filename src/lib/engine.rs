//! Parallel, checkpointed execution of prediction work.
//!
//! The engine walks the four work axes (chunk, allele, epitope length, algorithm) and runs
//! one external-tool invocation per compatible combination. Work is organised in two
//! levels:
//!
//! - a **cell** is one (chunk, allele, length) combination. Cells whose sequence-window file
//!   is empty are dropped before anything is scheduled, as are algorithms that cannot
//!   predict the cell's allele and length.
//! - a **work unit** is one (cell, algorithm) invocation. All units of all cells are
//!   flattened onto a single `rayon` pool sized to the [`ThreadPlan`]'s thread product.
//!
//! Each cell counts down its outstanding units; the unit that settles last parses the
//! cell's prediction files into its parsed artifact, so a cell is parsed only after every
//! algorithm for it has finished. The first failure cancels the run: units that have not
//! started yet are skipped and throttle waits wake early.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use log::{debug, info};
use parking_lot::Mutex;
use rayon::prelude::*;

use crate::algorithm::{AlleleCatalog, PredictionAlgorithm};
use crate::artifacts::{ArtifactLayout, artifact_exists, artifact_is_empty, key_path};
use crate::chunk::Chunk;
use crate::errors::PipelineError;
use crate::gateway::{Invocation, PredictionGateway, PredictionRequest};
use crate::logging::log_thread_plan;
use crate::progress::{UnitOutcome, UnitTally};
use crate::rate_limit::CancellationToken;
use crate::strategies::{CellOutputs, InputHandler, InputStrategy};
use crate::thread_plan::{ThreadPlan, allocate_threads};

/// The work axes and per-unit settings of one run.
#[derive(Debug, Clone, Copy)]
pub struct WorkSettings<'a> {
    /// Alleles to predict for
    pub alleles: &'a [String],
    /// Epitope lengths to predict
    pub epitope_lengths: &'a [usize],
    /// Algorithms to run
    pub algorithms: &'a [PredictionAlgorithm],
    /// Retry budget of every tool invocation
    pub retries: usize,
    /// Local executable override; disables throttling when set
    pub executable: Option<&'a Path>,
    /// Total thread budget
    pub threads: usize,
    /// Sample tag written into every parsed artifact, if requested
    pub sample_tag: Option<&'a str>,
}

/// One (chunk, allele, length) cell that survived pre-filtering.
#[derive(Debug)]
struct Cell<'a> {
    chunk: Chunk,
    allele: &'a str,
    length: usize,
    sequence_path: PathBuf,
    algorithms: Vec<PredictionAlgorithm>,
}

impl Cell<'_> {
    fn describe(&self) -> String {
        format!(
            "Allele {} and Epitope Length {} - Entries {}",
            self.allele,
            self.length,
            self.chunk.sequence_label()
        )
    }
}

/// Mutable bookkeeping of a cell while its units run.
#[derive(Debug)]
struct CellState<'a> {
    cell: Cell<'a>,
    remaining: AtomicUsize,
    outputs: Mutex<Vec<(PredictionAlgorithm, PathBuf)>>,
    parsed: Mutex<Option<PathBuf>>,
}

/// Runs the nested chunk/allele/length/algorithm workload of one run.
pub struct ExecutionEngine<'a> {
    layout: &'a ArtifactLayout,
    handler: InputHandler,
    catalog: &'a AlleleCatalog,
    gateway: PredictionGateway<'a>,
    settings: WorkSettings<'a>,
}

impl<'a> ExecutionEngine<'a> {
    /// Creates an engine over the artifacts of `layout`.
    #[must_use]
    pub fn new(
        layout: &'a ArtifactLayout,
        handler: InputHandler,
        catalog: &'a AlleleCatalog,
        gateway: PredictionGateway<'a>,
        settings: WorkSettings<'a>,
    ) -> Self {
        Self { layout, handler, catalog, gateway, settings }
    }

    /// Allocates the thread budget over the four work axes for `chunk_count` chunks.
    #[must_use]
    pub fn plan(&self, chunk_count: usize) -> ThreadPlan {
        allocate_threads(
            [
                chunk_count,
                self.settings.alleles.len(),
                self.settings.epitope_lengths.len(),
                self.settings.algorithms.len(),
            ],
            self.settings.threads,
        )
    }

    /// Runs every work unit over `chunks` and parses each cell.
    ///
    /// Returns the parsed artifact of every cell that has one, in chunk, allele, length
    /// order. Cells with no prediction output are left out.
    ///
    /// # Errors
    ///
    /// The first error raised by a work unit or parse, typically
    /// [`PipelineError::ExternalToolFailure`].
    pub fn run(&self, chunks: &[Chunk]) -> Result<Vec<PathBuf>> {
        let plan = self.plan(chunks.len());
        log_thread_plan(&plan, self.settings.threads);

        let states: Vec<CellState<'_>> = self
            .cells(chunks)?
            .into_iter()
            .map(|cell| CellState {
                remaining: AtomicUsize::new(cell.algorithms.len()),
                outputs: Mutex::new(Vec::with_capacity(cell.algorithms.len())),
                parsed: Mutex::new(None),
                cell,
            })
            .collect();
        let units: Vec<(&CellState<'_>, PredictionAlgorithm)> = states
            .iter()
            .flat_map(|state| state.cell.algorithms.iter().map(move |&a| (state, a)))
            .collect();

        let tally = UnitTally::new(units.len());
        let cancel = CancellationToken::new();
        let first_error: Mutex<Option<anyhow::Error>> = Mutex::new(None);
        let fail = |error: anyhow::Error| {
            cancel.cancel();
            let mut slot = first_error.lock();
            let is_cancellation =
                matches!(error.downcast_ref::<PipelineError>(), Some(PipelineError::Cancelled));
            if slot.is_none() && !is_cancellation {
                *slot = Some(error);
            }
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(plan.total_threads())
            .thread_name(|i| format!("epiforge-worker-{i}"))
            .build()
            .context("Failed to build the worker pool")?;
        pool.install(|| {
            units.par_iter().for_each(|&(state, algorithm)| {
                match self.run_unit(state, algorithm, &cancel) {
                    Ok(outcome) => tally.record(outcome),
                    Err(e) => {
                        tally.record(if cancel.is_cancelled() {
                            UnitOutcome::Cancelled
                        } else {
                            UnitOutcome::Failed
                        });
                        fail(e.into());
                    }
                }
                if state.remaining.fetch_sub(1, Ordering::AcqRel) == 1 && !cancel.is_cancelled() {
                    match self.finish_cell(state) {
                        Ok(parsed) => *state.parsed.lock() = parsed,
                        Err(e) => fail(e),
                    }
                }
            });
        });
        tally.log_final();

        if let Some(error) = first_error.into_inner() {
            return Err(error);
        }
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled.into());
        }
        Ok(states.into_iter().filter_map(|state| state.parsed.into_inner()).collect())
    }

    /// Enumerates the cells of the run, dropping empty and fully incompatible ones.
    fn cells<'s>(&'s self, chunks: &[Chunk]) -> Result<Vec<Cell<'s>>> {
        let mut cells = Vec::new();
        for chunk in chunks {
            for allele in self.settings.alleles {
                for &length in self.settings.epitope_lengths {
                    let sequence_path = self.handler.sequence_path(self.layout, chunk, length);
                    let mut cell =
                        Cell { chunk: *chunk, allele, length, sequence_path, algorithms: Vec::new() };
                    info!("Processing entries for {}", cell.describe());
                    let empty = artifact_is_empty(&cell.sequence_path).with_context(|| {
                        format!("Missing sequence file: {}", cell.sequence_path.display())
                    })?;
                    if empty {
                        info!("Fasta file is empty. Skipping");
                        continue;
                    }
                    for &algorithm in self.settings.algorithms {
                        if algorithm.supports(self.catalog, allele, length) {
                            cell.algorithms.push(algorithm);
                        } else {
                            info!(
                                "Epitope Length {length} or Allele {allele} is not valid for Method {algorithm}. Skipping."
                            );
                        }
                    }
                    if !cell.algorithms.is_empty() {
                        cells.push(cell);
                    }
                }
            }
        }
        Ok(cells)
    }

    /// Runs (or checkpoint-skips) one work unit, recording its output in the cell.
    fn run_unit(
        &self,
        state: &CellState<'_>,
        algorithm: PredictionAlgorithm,
        cancel: &CancellationToken,
    ) -> std::result::Result<UnitOutcome, PipelineError> {
        let cell = &state.cell;
        if cancel.is_cancelled() {
            return Ok(UnitOutcome::Cancelled);
        }
        let output =
            self.layout.prediction_path(algorithm.method(), cell.allele, cell.length, &cell.chunk);
        let request = PredictionRequest {
            sequence_path: &cell.sequence_path,
            output_path: &output,
            algorithm,
            allele: cell.allele,
            epitope_length: cell.length,
            retries: self.settings.retries,
            executable: self.settings.executable,
        };

        let outcome = match self.gateway.invoke(&request, cancel)? {
            Invocation::CheckpointHit(_) => {
                info!(
                    "IEDB file for {request} (Entries {}) already exists. Skipping.",
                    cell.chunk.sequence_label()
                );
                UnitOutcome::CheckpointHit
            }
            Invocation::Produced(_) => {
                info!("Running IEDB on {request} - Entries {} - Completed", cell.chunk.sequence_label());
                UnitOutcome::Ran
            }
        };
        state.outputs.lock().push((algorithm, output));
        Ok(outcome)
    }

    /// Parses a cell whose units have all settled, unless its parsed artifact exists.
    fn finish_cell(&self, state: &CellState<'_>) -> Result<Option<PathBuf>> {
        let cell = &state.cell;
        let parsed = self.layout.parsed_path(cell.allele, cell.length, &cell.chunk);
        if artifact_exists(&parsed) {
            info!("Parsed Output File for {} already exists. Skipping", cell.describe());
            return Ok(Some(parsed));
        }
        let mut files = state.outputs.lock().clone();
        if files.is_empty() {
            debug!("No prediction output for {}", cell.describe());
            return Ok(None);
        }
        files.sort();

        info!("Parsing IEDB Output for {}", cell.describe());
        let key_file = key_path(&cell.sequence_path);
        self.handler
            .parse_output(
                self.layout,
                &CellOutputs {
                    chunk: cell.chunk,
                    prediction_files: &files,
                    key_file: &key_file,
                    output: &parsed,
                    sample_tag: self.settings.sample_tag,
                },
            )
            .with_context(|| format!("Failed to parse prediction output for {}", cell.describe()))?;
        info!("Parsing IEDB Output for {} - Completed", cell.describe());
        Ok(Some(parsed))
    }
}
