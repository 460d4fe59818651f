// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod notification;
pub mod runner;
pub mod watch;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use crate::cli::CliArgs;
use crate::config::{CommandLineConfig, ConfigResolver, Defaults};
use crate::engine::{Engine, RunScheduler, RuntimeEvent};
use crate::errors::Result;
use crate::notification::{DesktopNotifier, NotificationSink};
use crate::runner::{Invoker, ProcessSupervisor};
use crate::watch::NotifyBackend;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config resolution (command line > local file > defaults)
/// - the filesystem watch backend
/// - the coalescer / scheduler / supervisor pipeline
/// - desktop notifications
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    info!("start watching");

    // Unified event channel: watch backend, worker slot and the Ctrl-C
    // handler all feed the same engine loop.
    let (rt_tx, rt_rx) = mpsc::unbounded_channel::<RuntimeEvent>();

    let backend = NotifyBackend::spawn(rt_tx.clone())?;

    let command_line = CommandLineConfig::from_args(&args);
    let mut resolver = ConfigResolver::new(command_line, Defaults::default(), Box::new(backend));

    // Initial load: a missing command-line config file is fatal here, before
    // the loop starts.
    resolver.reload()?;

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested);
        });
    }

    let invoker: Arc<dyn Invoker> = Arc::new(ProcessSupervisor::new());
    let scheduler = RunScheduler::new(invoker, rt_tx.clone());
    let sink = NotificationSink::new(Box::new(DesktopNotifier));

    let engine = Engine::new(resolver, scheduler, sink, rt_rx);
    engine.run().await
}
