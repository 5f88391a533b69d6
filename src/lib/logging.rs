//! Logging utilities for formatted pipeline output.
//!
//! This module provides consistent, user-friendly logging helpers for counts, durations,
//! stage timing and the thread plan summary. All output goes through the `log` facade; the
//! installed logger serialises records, so messages from concurrent workers never interleave
//! within a line.

use std::time::{Duration, Instant};

use crate::thread_plan::ThreadPlan;

/// Formats an integer with thousands separators.
///
/// # Examples
///
/// ```
/// use epiforge_lib::logging::format_count;
///
/// assert_eq!(format_count(0), "0");
/// assert_eq!(format_count(1234567), "1,234,567");
/// ```
#[must_use]
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Formats a duration in human-readable form.
///
/// # Examples
///
/// ```
/// use epiforge_lib::logging::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_secs(45)), "45s");
/// assert_eq!(format_duration(Duration::from_secs(135)), "2m 15s");
/// assert_eq!(format_duration(Duration::from_secs(5400)), "1h 30m");
/// ```
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        let mins = secs / 60;
        let remaining_secs = secs % 60;
        if remaining_secs == 0 { format!("{mins}m") } else { format!("{mins}m {remaining_secs}s") }
    } else {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        if mins == 0 { format!("{hours}h") } else { format!("{hours}h {mins}m") }
    }
}

/// Logs the per-axis thread assignment of a plan.
pub fn log_thread_plan(plan: &ThreadPlan, budget: usize) {
    log::info!("Thread plan ({} of {budget} threads):", plan.total_threads());
    for axis in plan.axes() {
        log::info!(
            "  {:<9} {} iteration(s) on {} thread(s) ({:.2} per thread)",
            axis.kind.name(),
            axis.total_iterations,
            axis.threads,
            axis.iterations_per_thread
        );
    }
}

/// Stage timing helper.
///
/// Logs the start of a pipeline stage on construction and its completion with elapsed time.
///
/// # Examples
///
/// ```no_run
/// use epiforge_lib::logging::StageTimer;
///
/// let timer = StageTimer::new("Splitting TSV into smaller chunks");
/// // ... do work ...
/// timer.log_completion();
/// ```
pub struct StageTimer {
    stage: String,
    start_time: Instant,
}

impl StageTimer {
    /// Creates a new stage timer and logs the start.
    #[must_use]
    pub fn new(stage: &str) -> Self {
        log::info!("{stage}");
        Self { stage: stage.to_string(), start_time: Instant::now() }
    }

    /// Logs the completion with the elapsed time.
    pub fn log_completion(&self) {
        log::info!("{} - Completed in {}", self.stage, format_duration(self.start_time.elapsed()));
    }

    /// Time since the stage started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}
