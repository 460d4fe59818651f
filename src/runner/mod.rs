// src/runner/mod.rs

//! Supervised test-command execution.
//!
//! [`ProcessSupervisor`] drives one interactive test command to completion on
//! a pseudo-terminal. The [`Invoker`] trait is the seam the scheduler runs
//! against, so tests can substitute a fake runner.

pub mod supervisor;

pub use supervisor::{ProcessSupervisor, RunOutcome};

/// Executes one full test invocation (primary command plus optional suite)
/// and reports `(passed, message)`.
pub trait Invoker: Send + Sync {
    fn invoke(&self, test_cmd: &str, suite_cmd: Option<&str>) -> (bool, String);
}
