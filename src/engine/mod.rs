// src/engine/mod.rs

//! The watch → debounce → run → notify pipeline.
//!
//! This module ties together:
//! - the change coalescer (config-reload vs. run-trigger decision)
//! - the single-slot run scheduler (at most one run in flight, one deferred
//!   rerun after a burst)
//! - the main event loop that reacts to file changes, run completions, and
//!   shutdown signals

pub mod coalescer;
pub mod runtime;
pub mod scheduler;

pub use coalescer::ChangeCoalescer;
pub use runtime::{ChangeEvent, Engine, RuntimeEvent};
pub use scheduler::RunScheduler;
