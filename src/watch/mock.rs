// src/watch/mock.rs

//! Recording watch backend for tests.

use std::sync::{Arc, Mutex};

use anyhow::anyhow;

use crate::errors::Result;
use crate::watch::backend::{WatchBackend, WatchDescriptor, WatchSpec};

/// One recorded backend operation.
#[derive(Debug, Clone)]
pub enum WatchOp {
    Added { id: u64, spec: WatchSpec },
    Removed { id: u64 },
}

/// A `WatchBackend` that performs no real watching and records every
/// add/remove call. Clone the op log handle via [`MockBackend::ops`] before
/// handing the backend off.
#[derive(Debug, Default)]
pub struct MockBackend {
    next_id: u64,
    active: Vec<u64>,
    ops: Arc<Mutex<Vec<WatchOp>>>,
}

impl MockBackend {
    pub fn new() -> MockBackend {
        MockBackend::default()
    }

    /// Shared handle to the recorded operation log.
    pub fn ops(&self) -> Arc<Mutex<Vec<WatchOp>>> {
        Arc::clone(&self.ops)
    }
}

impl WatchBackend for MockBackend {
    fn add_watch(&mut self, spec: WatchSpec) -> Result<WatchDescriptor> {
        let id = self.next_id;
        self.next_id += 1;
        self.active.push(id);
        self.ops
            .lock()
            .expect("ops lock poisoned")
            .push(WatchOp::Added { id, spec });
        Ok(WatchDescriptor(id))
    }

    fn remove_watch(&mut self, descriptor: WatchDescriptor) -> Result<()> {
        let WatchDescriptor(id) = descriptor;
        let pos = self
            .active
            .iter()
            .position(|active| *active == id)
            .ok_or_else(|| anyhow!("unknown watch descriptor {id}"))?;
        self.active.remove(pos);
        self.ops
            .lock()
            .expect("ops lock poisoned")
            .push(WatchOp::Removed { id });
        Ok(())
    }
}
