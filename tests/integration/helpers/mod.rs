//! Helper utilities for integration tests.

pub mod assertions;
pub mod fake_tool;
pub mod inputs;

pub use assertions::*;
pub use fake_tool::*;
pub use inputs::*;
