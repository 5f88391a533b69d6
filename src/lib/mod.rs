#![deny(unsafe_code)]
// Clippy lint configuration for CI
// - cast_*: row and thread counts are converted for logging and arithmetic
// - missing_*_doc: Documentation improvements tracked separately
// - needless_pass_by_value: Some APIs take ownership of row vectors
// - items_after_statements: Some test code uses late item declarations
// - module_name_repetitions: Types such as `RunConfig` live in `run_config`
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::needless_pass_by_value,
    clippy::items_after_statements,
    clippy::module_name_repetitions,
    clippy::too_many_lines,
    clippy::redundant_closure_for_method_calls,
    clippy::struct_excessive_bools,
    clippy::uninlined_format_args
)]

//! # epiforge - checkpointed epitope prediction batches
//!
//! This library turns a list of variants into candidate epitopes by fanning a large
//! (chunk × allele × epitope length × algorithm) workload out to an external binding
//! prediction tool, and merging the results into ranked reports.
//!
//! ## Overview
//!
//! ### Planning
//!
//! - **[`chunk`]** - Splitting the tabular input into contiguous row ranges
//! - **[`thread_plan`]** - Dividing a thread budget over the four work axes
//! - **[`strategies`]** - Input kinds (VCF, BEDPE fusions, vector FASTA): conversion,
//!   sequence-window generation and prediction parsing
//!
//! ### Execution
//!
//! - **[`engine`]** - Parallel, checkpointed execution of every work unit
//! - **[`gateway`]** - Retrying, throttled calls to the external prediction tool
//! - **[`rate_limit`]** - Minimum spacing between remote calls, and run cancellation
//! - **[`artifacts`]** - Artifact naming and atomic writes
//!
//! ### Results
//!
//! - **[`aggregate`]** - Merging parsed artifacts into the combined output
//! - **[`post_process`]** - Filtered and ranked reports
//! - **[`pipeline`]** - The stages of a run, in order
//!
//! ### Utilities
//!
//! - **[`algorithm`]** - Prediction algorithms and allele validity
//! - **[`run_config`]** - Recorded settings for restart checks
//! - **[`validation`]** - Input validation utilities for parameters and files
//! - **[`progress`]** - Progress of settled work units
//! - **[`logging`]** - Logging helpers with formatting
//! - **[`errors`]** - Typed pipeline errors
//!
//! ## Quick Start
//!
//! ### Planning threads
//!
//! ```
//! use epiforge_lib::thread_plan::allocate_threads;
//!
//! let plan = allocate_threads([3, 2, 2, 1], 6);
//! assert!(plan.total_threads() <= 6);
//! ```
//!
//! ### Planning chunks
//!
//! ```
//! use epiforge_lib::chunk::plan_chunks;
//!
//! let chunks = plan_chunks(250, 100);
//! let labels: Vec<String> = chunks.iter().map(|c| c.tsv_label()).collect();
//! assert_eq!(labels, vec!["1-100", "101-200", "201-250"]);
//! ```

pub mod aggregate;
pub mod algorithm;
pub mod artifacts;
pub mod chunk;
pub mod engine;
pub mod errors;
pub mod gateway;
pub mod logging;
pub mod pipeline;
pub mod post_process;
pub mod progress;
pub mod rate_limit;
pub mod run_config;
pub mod strategies;
pub mod thread_plan;
pub mod validation;

pub use errors::PipelineError;
pub use pipeline::{Pipeline, PipelineOptions, PipelineOutcome};
