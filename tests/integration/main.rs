//! Integration tests for epiforge.
//!
//! These tests drive whole runs, through the library and through the compiled binary,
//! against a fake prediction tool.

mod helpers;
mod test_pipeline_inputs;
mod test_restart;
mod test_run_command;
mod test_utility_commands;
