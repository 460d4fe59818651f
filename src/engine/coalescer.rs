// src/engine/coalescer.rs

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::config::ConfigResolver;
use crate::engine::runtime::ChangeEvent;
use crate::engine::scheduler::RunScheduler;

/// Decides what a delivered change event means.
///
/// For every event: first check whether the changed path is the active
/// config file (if so, reload the configuration before anything else), then
/// stamp the activity clock and ask the scheduler for a run. The
/// config-reload check always precedes the run decision for the same event.
#[derive(Debug, Default)]
pub struct ChangeCoalescer;

impl ChangeCoalescer {
    pub fn new() -> ChangeCoalescer {
        ChangeCoalescer
    }

    pub fn on_event(
        &self,
        resolver: &mut ConfigResolver,
        scheduler: &mut RunScheduler,
        event: &ChangeEvent,
    ) {
        if is_active_config(resolver, &event.path) {
            debug!(path = ?event.path, "active config file changed");
            // A failed reload keeps the prior configuration active; the
            // watch loop itself must survive.
            if let Err(err) = resolver.reload() {
                warn!(error = %err, "config reload failed, keeping previous config");
            }
        }

        scheduler.record_activity(event.at);
        scheduler.try_start(resolver);
    }
}

/// File-identity check: both paths must exist and resolve to the same file.
/// A file with the same basename in another directory is not the config.
pub fn is_active_config(resolver: &ConfigResolver, path: &Path) -> bool {
    let config_path = match resolver.config_path() {
        Ok(p) => p,
        Err(_) => return false,
    };

    match (fs::canonicalize(path), fs::canonicalize(&config_path)) {
        (Ok(changed), Ok(config)) => changed == config,
        _ => false,
    }
}
