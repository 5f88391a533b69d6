//! CLI command implementations for epiforge.
//!
//! Each submodule implements one subcommand.
//!
//! # Command Categories
//!
//! ## Pipeline
//! - [`run`] - Predict, combine and rank candidate epitopes
//!
//! ## Utilities
//! - [`valid_alleles`] - List valid alleles per prediction algorithm
//! - [`plan_threads`] - Preview the thread plan of a run

#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::too_many_lines,
    clippy::uninlined_format_args
)]

pub mod command;
pub mod common;
pub mod plan_threads;
pub mod run;
pub mod valid_alleles;
