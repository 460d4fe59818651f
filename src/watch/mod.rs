// src/watch/mod.rs

//! File watching.
//!
//! This module is responsible for:
//! - The named event-kind mask algebra (`include & !exclude`).
//! - Regex exclude predicates for watched paths.
//! - The `WatchBackend` trait that keeps descriptor lifecycle management
//!   independent of any concrete watch implementation.
//! - The `notify`-backed production backend.
//!
//! It does **not** decide what a change event means; it only turns raw
//! filesystem activity into delivered `ChangeEvent`s.

pub mod backend;
pub mod filter;
pub mod mask;
pub mod mock;
pub mod watcher;

pub use backend::{WatchBackend, WatchDescriptor, WatchSpec};
pub use filter::ExcludeFilter;
pub use mask::{EventClass, EventMask};
pub use mock::{MockBackend, WatchOp};
pub use watcher::NotifyBackend;
