//! Command-line harness library for the Spillway simulator.

use env_logger as _;

/// Scenario and input loading plus the harness error type.
pub mod load;
/// Text and JSON rendering of simulation results.
pub mod render;

pub use load::CliError;

#[cfg(test)]
use tempfile as _;
