//! Preview how a thread budget is split over the work axes.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use epiforge_lib::logging::log_thread_plan;
use epiforge_lib::thread_plan::{ThreadPlan, allocate_threads};
use epiforge_lib::validation::validate_positive;
use fgoxide::io::DelimFile;
use serde::Serialize;

use crate::commands::command::Command;

/// One axis of a thread plan, as written to the plan TSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreadPlanRow {
    pub axis: String,
    pub total_iterations: usize,
    pub threads: usize,
    pub iterations_per_thread: f64,
}

impl ThreadPlanRow {
    fn rows(plan: &ThreadPlan) -> Vec<Self> {
        plan.axes()
            .iter()
            .map(|axis| Self {
                axis: axis.kind.name().to_string(),
                total_iterations: axis.total_iterations,
                threads: axis.threads,
                iterations_per_thread: axis.iterations_per_thread,
            })
            .collect()
    }
}

/// Preview the thread plan of a run.
#[derive(Debug, Parser)]
#[command(
    name = "plan-threads",
    about = "\x1b[38;5;30m[UTILITIES]\x1b[0m      \x1b[36mPreview how threads are split over the work axes\x1b[0m",
    long_about = r#"
Preview how a thread budget is split over the chunk, allele, epitope length and algorithm
axes of a run, without running anything. Threads are added one at a time to the axis with
the most iterations per thread until the budget is reached.

Example usage:
  epiforge plan-threads --chunks 3 --alleles 2 --lengths 2 --algorithms 1 --threads 6
"#
)]
pub struct PlanThreads {
    /// Number of chunks
    #[arg(long = "chunks")]
    pub chunks: usize,

    /// Number of alleles
    #[arg(long = "alleles")]
    pub alleles: usize,

    /// Number of epitope lengths
    #[arg(long = "lengths")]
    pub lengths: usize,

    /// Number of algorithms
    #[arg(long = "algorithms")]
    pub algorithms: usize,

    /// Total thread budget
    #[arg(short = 't', long = "threads")]
    pub threads: usize,

    /// Optional TSV to write the plan to; printed to stdout when omitted
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

impl PlanThreads {
    fn plan(&self) -> Result<ThreadPlan> {
        validate_positive(self.threads, "threads")?;
        Ok(allocate_threads([self.chunks, self.alleles, self.lengths, self.algorithms], self.threads))
    }
}

impl Command for PlanThreads {
    fn execute(&self, _command_line: &str) -> Result<()> {
        let plan = self.plan()?;
        log_thread_plan(&plan, self.threads);
        let rows = ThreadPlanRow::rows(&plan);
        match &self.output {
            Some(path) => DelimFile::default().write_tsv(path, rows)?,
            None => {
                println!("axis\ttotal_iterations\tthreads\titerations_per_thread");
                for row in rows {
                    println!(
                        "{}\t{}\t{}\t{:.2}",
                        row.axis, row.total_iterations, row.threads, row.iterations_per_thread
                    );
                }
            }
        }
        Ok(())
    }
}
