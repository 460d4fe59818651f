// src/engine/scheduler.rs

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::{CommandKind, ConfigResolver};
use crate::engine::runtime::RuntimeEvent;
use crate::notification::NotificationSink;
use crate::runner::Invoker;

/// Single-slot asynchronous run executor.
///
/// At most one test invocation is ever in flight: the slot is the one
/// `JoinHandle` held here, only ever swapped whole. Submission is
/// fire-and-forget; the worker reports back by sending
/// `RuntimeEvent::RunCompleted` over the runtime channel, so `try_start`
/// returns immediately whether or not a run is already executing.
pub struct RunScheduler {
    invoker: Arc<dyn Invoker>,
    runtime_tx: mpsc::UnboundedSender<RuntimeEvent>,

    in_flight: Option<JoinHandle<()>>,
    run_started_at: Option<Instant>,
    last_event_at: Option<Instant>,
    delay: Duration,
}

impl RunScheduler {
    pub fn new(
        invoker: Arc<dyn Invoker>,
        runtime_tx: mpsc::UnboundedSender<RuntimeEvent>,
    ) -> RunScheduler {
        RunScheduler {
            invoker,
            runtime_tx,
            in_flight: None,
            run_started_at: None,
            last_event_at: None,
            delay: Duration::from_secs(2),
        }
    }

    /// Stamp the activity clock used by the rerun decision.
    pub fn record_activity(&mut self, at: Instant) {
        self.last_event_at = Some(at);
    }

    /// Start a run unless one is still in flight.
    ///
    /// Builds the primary and suite commands from the current configuration
    /// and hands them to the worker slot. Never blocks.
    pub fn try_start(&mut self, resolver: &ConfigResolver) {
        if let Some(handle) = &self.in_flight {
            if !handle.is_finished() {
                debug!("run already in flight, not starting another");
                return;
            }
        }

        self.delay = resolver.runner_delay();

        let test_cmd = match resolver.build_test_command(CommandKind::Tests) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => {
                warn!("no test command configured, skipping run");
                return;
            }
            Err(err) => {
                warn!(error = %err, "could not build test command");
                return;
            }
        };
        let suite_cmd = match resolver.build_test_command(CommandKind::Suite) {
            Ok(cmd) => cmd,
            Err(err) => {
                warn!(error = %err, "could not build suite command");
                None
            }
        };

        self.run_started_at = Some(Instant::now());

        let invoker = Arc::clone(&self.invoker);
        let tx = self.runtime_tx.clone();
        self.in_flight = Some(tokio::task::spawn_blocking(move || {
            let (passed, message) = invoker.invoke(&test_cmd, suite_cmd.as_deref());
            // Engine gone means nobody cares about the result any more.
            let _ = tx.send(RuntimeEvent::RunCompleted { passed, message });
        }));
    }

    /// Handle a finished run: notify, then coalesce the burst.
    ///
    /// Any number of events landing after the run started collapse into at
    /// most one follow-up run, and only when activity continued beyond the
    /// grace window.
    pub fn on_complete(
        &mut self,
        passed: bool,
        message: &str,
        resolver: &ConfigResolver,
        sink: &mut NotificationSink,
    ) {
        // The completion event itself proves the run is over; the join
        // handle may still be in its send epilogue and report unfinished.
        self.in_flight = None;

        sink.notify(passed, message);

        if self.rerun_due() {
            debug!("activity continued past the grace window, rerunning");
            self.try_start(resolver);
        }
    }

    /// True iff the last event landed more than `delay` after the run start.
    pub fn rerun_due(&self) -> bool {
        match (self.last_event_at, self.run_started_at) {
            (Some(event), Some(started)) => {
                event.saturating_duration_since(started) > self.delay
            }
            _ => false,
        }
    }
}

impl std::fmt::Debug for RunScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunScheduler")
            .field("in_flight", &self.in_flight.is_some())
            .field("run_started_at", &self.run_started_at)
            .field("last_event_at", &self.last_event_at)
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}
