// src/watch/watcher.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use notify::event::{AccessKind, ModifyKind};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::{ChangeEvent, RuntimeEvent};
use crate::errors::Result;
use crate::watch::backend::{WatchBackend, WatchDescriptor, WatchSpec};
use crate::watch::mask::{EventClass, EventMask};

/// One registered watch, as seen by the forwarding loop.
#[derive(Debug)]
struct ActiveWatch {
    path: PathBuf,
    spec: WatchSpec,
}

type WatchTable = Arc<Mutex<HashMap<u64, ActiveWatch>>>;

/// Production `WatchBackend` backed by `notify`'s recommended watcher.
///
/// Raw events arrive on a blocking callback and cross into the async world
/// over an unbounded channel; a forwarding task filters them against the
/// active watch table (mask + exclude predicate) before delivering
/// `RuntimeEvent::FileChanged`. Filtered paths therefore never reach the
/// event-ingestion path at all.
pub struct NotifyBackend {
    watcher: RecommendedWatcher,
    table: WatchTable,
    next_id: u64,
}

impl std::fmt::Debug for NotifyBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyBackend").finish()
    }
}

impl NotifyBackend {
    /// Create the backend and spawn its forwarding task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(runtime_tx: mpsc::UnboundedSender<RuntimeEvent>) -> Result<NotifyBackend> {
        let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<Event>();

        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if raw_tx.send(event).is_err() {
                        // Forwarding loop is gone; nothing useful left to do.
                        eprintln!("testwatch: event forwarding channel closed");
                    }
                }
                Err(err) => {
                    eprintln!("testwatch: file watch error: {err}");
                }
            },
            Config::default(),
        )?;

        let table: WatchTable = Arc::new(Mutex::new(HashMap::new()));

        let loop_table = Arc::clone(&table);
        tokio::spawn(async move {
            while let Some(event) = raw_rx.recv().await {
                forward_event(&loop_table, &runtime_tx, event);
            }
            debug!("watch forwarding loop ended");
        });

        Ok(NotifyBackend {
            watcher,
            table,
            next_id: 0,
        })
    }
}

impl WatchBackend for NotifyBackend {
    fn add_watch(&mut self, spec: WatchSpec) -> Result<WatchDescriptor> {
        // Canonicalize so delivered (absolute) event paths compare against
        // the registered root.
        let path = spec
            .path
            .canonicalize()
            .unwrap_or_else(|_| spec.path.clone());

        let mode = if spec.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        self.watcher.watch(&path, mode)?;

        let id = self.next_id;
        self.next_id += 1;
        self.table
            .lock()
            .expect("watch table lock poisoned")
            .insert(id, ActiveWatch { path, spec });

        Ok(WatchDescriptor(id))
    }

    fn remove_watch(&mut self, descriptor: WatchDescriptor) -> Result<()> {
        let WatchDescriptor(id) = descriptor;
        let removed = self
            .table
            .lock()
            .expect("watch table lock poisoned")
            .remove(&id);

        match removed {
            Some(active) => {
                // The watched path may have disappeared; the table entry is
                // already gone, so just note the failure.
                if let Err(err) = self.watcher.unwatch(&active.path) {
                    warn!(path = ?active.path, error = %err, "failed to unwatch path");
                }
                Ok(())
            }
            None => Err(anyhow::anyhow!("unknown watch descriptor {id}").into()),
        }
    }
}

/// Deliver a raw notify event to the runtime if any active watch wants it.
fn forward_event(
    table: &WatchTable,
    runtime_tx: &mpsc::UnboundedSender<RuntimeEvent>,
    event: Event,
) {
    let kinds = classify(&event.kind);

    let table = table.lock().expect("watch table lock poisoned");
    for path in &event.paths {
        let wanted = table
            .values()
            .any(|active| watch_wants(active, path, kinds));
        if !wanted {
            continue;
        }

        debug!(path = ?path, kinds = ?kinds, "delivering change event");
        if runtime_tx
            .send(RuntimeEvent::FileChanged(ChangeEvent {
                path: path.clone(),
                at: Instant::now(),
            }))
            .is_err()
        {
            debug!("runtime channel closed; dropping change event");
            return;
        }
    }
}

fn watch_wants(active: &ActiveWatch, path: &Path, kinds: EventMask) -> bool {
    let covered = if active.spec.recursive {
        path.starts_with(&active.path)
    } else {
        path == active.path
    };
    if !covered || !active.spec.mask.intersects(kinds) {
        return false;
    }

    if let Some(exclude) = &active.spec.exclude {
        if exclude.matches(&path.to_string_lossy()) {
            return false;
        }
    }

    true
}

/// Map a backend event kind onto the named kinds of the mask algebra.
fn classify(kind: &EventKind) -> EventMask {
    match kind {
        EventKind::Create(_) => EventClass::Create.mask(),
        EventKind::Remove(_) => EventClass::Remove.mask(),
        EventKind::Modify(ModifyKind::Name(_)) => EventClass::Rename.mask(),
        EventKind::Modify(ModifyKind::Metadata(_)) => EventClass::Metadata.mask(),
        EventKind::Modify(_) => EventClass::Modify.mask(),
        EventKind::Access(AccessKind::Open(_)) => EventClass::Open.mask(),
        EventKind::Access(AccessKind::Close(_)) => EventClass::Close.mask(),
        EventKind::Access(_) => EventClass::Access.mask(),
        EventKind::Any | EventKind::Other => EventClass::Other.mask(),
    }
}
