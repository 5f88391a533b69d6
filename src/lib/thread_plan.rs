//! Thread budget allocation across the four work axes.
//!
//! A run iterates over input chunks, alleles, epitope lengths and prediction algorithms.
//! [`allocate_threads`] splits a fixed thread budget across those axes so that the product of
//! the per-axis thread counts never exceeds the budget, greedily giving one more thread to
//! whichever axis currently has the most iterations per thread.
//!
//! # Example
//!
//! ```
//! use epiforge_lib::thread_plan::{AxisKind, allocate_threads};
//!
//! // 3 chunks, 2 alleles, 2 lengths, 1 algorithm on 6 threads
//! let plan = allocate_threads([3, 2, 2, 1], 6);
//! assert!(plan.total_threads() <= 6);
//! assert_eq!(plan.axis(AxisKind::File).threads, 2);
//! assert_eq!(plan.axis(AxisKind::Allele).threads, 2);
//! ```

use std::fmt;

/// One of the four independent dimensions over which work is distributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisKind {
    /// Input chunks
    File,
    /// Allele identifiers
    Allele,
    /// Epitope lengths
    Length,
    /// Prediction algorithms
    Algorithm,
}

impl AxisKind {
    /// All axes in iteration (and tie-breaking) order.
    pub const ALL: [AxisKind; 4] =
        [AxisKind::File, AxisKind::Allele, AxisKind::Length, AxisKind::Algorithm];

    /// Short lowercase name used in logs.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            AxisKind::File => "file",
            AxisKind::Allele => "allele",
            AxisKind::Length => "length",
            AxisKind::Algorithm => "algorithm",
        }
    }

    fn index(self) -> usize {
        match self {
            AxisKind::File => 0,
            AxisKind::Allele => 1,
            AxisKind::Length => 2,
            AxisKind::Algorithm => 3,
        }
    }
}

impl fmt::Display for AxisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Thread assignment for a single work axis.
///
/// `iterations_per_thread` always equals `total_iterations / threads`.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkAxis {
    /// Which axis this is
    pub kind: AxisKind,
    /// Number of iterations along this axis
    pub total_iterations: usize,
    /// `total_iterations / threads`
    pub iterations_per_thread: f64,
    /// Threads assigned to this axis (always >= 1)
    pub threads: usize,
}

impl WorkAxis {
    /// Creates an axis with a single thread.
    #[must_use]
    pub fn new(kind: AxisKind, total_iterations: usize) -> Self {
        Self { kind, total_iterations, iterations_per_thread: total_iterations as f64, threads: 1 }
    }

    fn set_threads(&mut self, threads: usize) {
        self.threads = threads;
        self.iterations_per_thread = self.total_iterations as f64 / threads as f64;
    }
}

/// The per-axis thread counts produced by [`allocate_threads`].
///
/// The product of all four thread counts never exceeds the budget the plan was built for.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadPlan {
    axes: [WorkAxis; 4],
}

impl ThreadPlan {
    /// A plan with one thread on every axis.
    #[must_use]
    pub fn single_threaded(totals: [usize; 4]) -> Self {
        Self { axes: AxisKind::ALL.map(|kind| WorkAxis::new(kind, totals[kind.index()])) }
    }

    /// The assignment for one axis.
    #[must_use]
    pub fn axis(&self, kind: AxisKind) -> &WorkAxis {
        &self.axes[kind.index()]
    }

    /// All four axes in iteration order.
    #[must_use]
    pub fn axes(&self) -> &[WorkAxis; 4] {
        &self.axes
    }

    /// Product of the per-axis thread counts; the size of the worker pool.
    #[must_use]
    pub fn total_threads(&self) -> usize {
        self.axes.iter().map(|a| a.threads).product()
    }

    /// The axis with the highest iterations per thread, first in axis order on ties.
    #[must_use]
    pub fn busiest_axis(&self) -> AxisKind {
        let mut best = &self.axes[0];
        for axis in &self.axes[1..] {
            if axis.iterations_per_thread > best.iterations_per_thread {
                best = axis;
            }
        }
        best.kind
    }

    fn saturated(&self) -> bool {
        self.axes.iter().all(|a| a.iterations_per_thread <= 1.0)
    }
}

/// Allocates `budget` threads across the four axes.
///
/// `totals` holds the iteration counts in [`AxisKind::ALL`] order. At most `budget - 1`
/// increments are attempted. Each attempt gives the busiest axis one more thread; if the
/// resulting product would exceed the budget the increment is undone and the plan is final.
/// Allocation also stops once every axis has at most one iteration per thread.
///
/// The result is a local greedy approximation of minimising the worst per-thread load, not a
/// global optimum.
#[must_use]
pub fn allocate_threads(totals: [usize; 4], budget: usize) -> ThreadPlan {
    let mut plan = ThreadPlan::single_threaded(totals);
    for _ in 1..budget {
        let kind = plan.busiest_axis();
        let threads = plan.axis(kind).threads;
        plan.axes[kind.index()].set_threads(threads + 1);
        if plan.total_threads() > budget {
            plan.axes[kind.index()].set_threads(threads);
            return plan;
        }
        if plan.saturated() {
            return plan;
        }
    }
    plan
}
