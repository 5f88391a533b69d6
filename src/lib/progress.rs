//! Progress tracking for work units.
//!
//! [`UnitTally`] counts how each work unit settled and logs a running total whenever the
//! number of settled units crosses a multiple of the logging interval. It is shared by
//! reference across the worker pool.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use log::info;

use crate::logging::format_count;

/// How a single work unit settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    /// The external tool ran and produced the artifact
    Ran,
    /// The artifact already existed
    CheckpointHit,
    /// Skipped because the run was cancelled
    Cancelled,
    /// The external tool failed after all retries
    Failed,
}

impl UnitOutcome {
    const ALL: [UnitOutcome; 4] =
        [UnitOutcome::Ran, UnitOutcome::CheckpointHit, UnitOutcome::Cancelled, UnitOutcome::Failed];

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for UnitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ran => "ran",
            Self::CheckpointHit => "already present",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Thread-safe tally of work-unit outcomes.
///
/// # Example
/// ```
/// use epiforge_lib::progress::{UnitOutcome, UnitTally};
///
/// let tally = UnitTally::new(10).with_interval(5);
/// for _ in 0..3 {
///     tally.record(UnitOutcome::Ran);
/// }
/// tally.record(UnitOutcome::CheckpointHit);
/// assert_eq!(tally.settled(), 4);
/// assert_eq!(tally.count(UnitOutcome::Ran), 3);
/// tally.log_final();
/// ```
#[derive(Debug)]
pub struct UnitTally {
    expected: u64,
    interval: u64,
    counts: [AtomicU64; 4],
    settled: AtomicU64,
}

impl UnitTally {
    /// Creates a tally expecting `expected` units, logging every 10 settled units.
    #[must_use]
    pub fn new(expected: usize) -> Self {
        Self {
            expected: expected as u64,
            interval: 10,
            counts: Default::default(),
            settled: AtomicU64::new(0),
        }
    }

    /// Sets the logging interval.
    #[must_use]
    pub fn with_interval(mut self, interval: u64) -> Self {
        self.interval = interval.max(1);
        self
    }

    /// Records one settled unit and logs if an interval boundary was crossed.
    pub fn record(&self, outcome: UnitOutcome) {
        self.counts[outcome.index()].fetch_add(1, Ordering::Relaxed);
        let settled = self.settled.fetch_add(1, Ordering::Relaxed) + 1;
        if settled.is_multiple_of(self.interval) {
            info!(
                "Settled {} of {} prediction units",
                format_count(settled),
                format_count(self.expected)
            );
        }
    }

    /// Number of units recorded with `outcome`.
    #[must_use]
    pub fn count(&self, outcome: UnitOutcome) -> u64 {
        self.counts[outcome.index()].load(Ordering::Relaxed)
    }

    /// Number of units recorded so far.
    #[must_use]
    pub fn settled(&self) -> u64 {
        self.settled.load(Ordering::Relaxed)
    }

    /// Logs the outcome breakdown.
    pub fn log_final(&self) {
        let breakdown: Vec<String> = UnitOutcome::ALL
            .iter()
            .filter(|o| self.count(**o) > 0)
            .map(|o| format!("{} {o}", format_count(self.count(*o))))
            .collect();
        if breakdown.is_empty() {
            info!("No prediction units were scheduled");
        } else {
            info!("Prediction units: {}", breakdown.join(", "));
        }
    }
}
