// src/watch/backend.rs

//! Backend-independent watch registration.
//!
//! `ConfigResolver` manages watch targets purely through this trait: it
//! registers a `WatchSpec` and gets back an opaque `WatchDescriptor` it can
//! later remove. The production implementation is [`NotifyBackend`]; tests
//! use [`MockBackend`] to observe the add/remove lifecycle.
//!
//! [`NotifyBackend`]: crate::watch::watcher::NotifyBackend
//! [`MockBackend`]: crate::watch::mock::MockBackend

use std::path::PathBuf;

use crate::errors::Result;
use crate::watch::filter::ExcludeFilter;
use crate::watch::mask::EventMask;

/// Everything needed to register one watch target.
#[derive(Debug, Clone)]
pub struct WatchSpec {
    pub path: PathBuf,
    pub mask: EventMask,
    /// Watch the whole tree below `path`.
    pub recursive: bool,
    /// Extend the watch to subdirectories created after registration.
    /// Only meaningful together with `recursive`.
    pub auto_extend: bool,
    /// Paths matching this predicate produce no delivered events.
    pub exclude: Option<ExcludeFilter>,
}

/// Opaque handle for an active watch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WatchDescriptor(pub(crate) u64);

/// A filesystem-watch provider.
pub trait WatchBackend: Send {
    fn add_watch(&mut self, spec: WatchSpec) -> Result<WatchDescriptor>;

    /// Remove a watch, recursively for recursive watches. Removing an
    /// already-removed descriptor is an error.
    fn remove_watch(&mut self, descriptor: WatchDescriptor) -> Result<()>;
}
