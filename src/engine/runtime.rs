// src/engine/runtime.rs

use std::path::PathBuf;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::ConfigResolver;
use crate::engine::coalescer::ChangeCoalescer;
use crate::engine::scheduler::RunScheduler;
use crate::errors::Result;
use crate::notification::NotificationSink;

/// One delivered filesystem change.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub at: Instant,
}

/// Events consumed by the engine loop.
///
/// - the watch backend sends `FileChanged`
/// - the worker slot sends `RunCompleted`
/// - Ctrl-C handling sends `ShutdownRequested`
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    FileChanged(ChangeEvent),
    RunCompleted { passed: bool, message: String },
    ShutdownRequested,
}

/// The main dispatch loop.
///
/// Processes events in delivery order on a single task, which serializes all
/// mutation of the resolver's watch state and the scheduler's run state.
/// Nothing here ever waits on a test run.
pub struct Engine {
    resolver: ConfigResolver,
    coalescer: ChangeCoalescer,
    scheduler: RunScheduler,
    sink: NotificationSink,
    events_rx: mpsc::UnboundedReceiver<RuntimeEvent>,
}

impl Engine {
    pub fn new(
        resolver: ConfigResolver,
        scheduler: RunScheduler,
        sink: NotificationSink,
        events_rx: mpsc::UnboundedReceiver<RuntimeEvent>,
    ) -> Engine {
        Engine {
            resolver,
            coalescer: ChangeCoalescer::new(),
            scheduler,
            sink,
            events_rx,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        info!("testwatch engine started");

        while let Some(event) = self.events_rx.recv().await {
            debug!(?event, "engine received event");

            match event {
                RuntimeEvent::FileChanged(change) => {
                    self.coalescer
                        .on_event(&mut self.resolver, &mut self.scheduler, &change);
                }
                RuntimeEvent::RunCompleted { passed, message } => {
                    self.scheduler.on_complete(
                        passed,
                        &message,
                        &self.resolver,
                        &mut self.sink,
                    );
                }
                RuntimeEvent::ShutdownRequested => {
                    info!("shutdown requested, stopping engine");
                    break;
                }
            }
        }

        info!("testwatch engine exiting");
        Ok(())
    }
}
