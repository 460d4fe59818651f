use std::error::Error;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::sleep;

use testwatch::config::{CommandLineConfig, ConfigResolver, Defaults};
use testwatch::engine::{ChangeEvent, Engine, RunScheduler, RuntimeEvent};
use testwatch::notification::{NotificationSink, Notifier};
use testwatch::runner::Invoker;
use testwatch::watch::MockBackend;

type TestResult = Result<(), Box<dyn Error>>;

/// Invoker that sleeps for a fixed duration and counts invocations.
struct FakeInvoker {
    calls: Arc<AtomicUsize>,
    busy_for: Duration,
    passed: bool,
}

impl Invoker for FakeInvoker {
    fn invoke(&self, _test_cmd: &str, _suite_cmd: Option<&str>) -> (bool, String) {
        std::thread::sleep(self.busy_for);
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.passed, "fake run".to_string())
    }
}

/// Invoker that records each primary command it is given.
struct CommandRecorder {
    commands: Arc<Mutex<Vec<String>>>,
}

impl Invoker for CommandRecorder {
    fn invoke(&self, test_cmd: &str, _suite_cmd: Option<&str>) -> (bool, String) {
        self.commands.lock().unwrap().push(test_cmd.to_string());
        (true, "recorded run".to_string())
    }
}

/// Notifier that records every displayed message.
struct RecordingNotifier {
    shown: Arc<Mutex<Vec<String>>>,
}

impl Notifier for RecordingNotifier {
    fn show(&mut self, message: &str, _icon: Option<&str>) -> anyhow::Result<()> {
        self.shown.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

fn resolver_with_delay(delay_secs: f64) -> Result<(ConfigResolver, tempfile::TempDir), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let config_path = dir.path().join("testwatch.toml");
    fs::write(&config_path, format!("RUNNER_DELAY = {delay_secs}\n"))?;

    let defaults = Defaults {
        config: config_path.to_string_lossy().into_owned(),
        watch_dir: dir.path().to_string_lossy().into_owned(),
        ..Defaults::default()
    };
    let mut resolver = ConfigResolver::new(
        CommandLineConfig::default(),
        defaults,
        Box::new(MockBackend::new()),
    );
    resolver.reload()?;
    Ok((resolver, dir))
}

#[tokio::test]
async fn try_start_declines_while_run_in_flight() -> TestResult {
    let (resolver, _dir) = resolver_with_delay(0.05)?;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let calls = Arc::new(AtomicUsize::new(0));
    let invoker = Arc::new(FakeInvoker {
        calls: Arc::clone(&calls),
        busy_for: Duration::from_millis(100),
        passed: true,
    });
    let mut scheduler = RunScheduler::new(invoker, tx);

    scheduler.try_start(&resolver);
    scheduler.try_start(&resolver);
    scheduler.try_start(&resolver);

    // One completion, one invocation.
    let completed = rx.recv().await;
    assert!(matches!(
        completed,
        Some(RuntimeEvent::RunCompleted { passed: true, .. })
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Once the slot is free, a new run may start.
    sleep(Duration::from_millis(50)).await;
    scheduler.try_start(&resolver);
    assert!(matches!(
        rx.recv().await,
        Some(RuntimeEvent::RunCompleted { .. })
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    Ok(())
}

#[tokio::test]
async fn quiet_burst_does_not_rerun() -> TestResult {
    let (resolver, _dir) = resolver_with_delay(0.5)?;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let calls = Arc::new(AtomicUsize::new(0));
    let invoker = Arc::new(FakeInvoker {
        calls: Arc::clone(&calls),
        busy_for: Duration::from_millis(50),
        passed: true,
    });
    let mut scheduler = RunScheduler::new(invoker, tx);

    scheduler.record_activity(Instant::now());
    scheduler.try_start(&resolver);

    let _ = rx.recv().await;

    // The only activity landed at run start, inside the grace window.
    assert!(!scheduler.rerun_due());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    Ok(())
}

#[tokio::test]
async fn burst_during_run_collapses_into_one_rerun() -> TestResult {
    let (resolver, _dir) = resolver_with_delay(0.05)?;
    let (rt_tx, rt_rx) = mpsc::unbounded_channel();

    let calls = Arc::new(AtomicUsize::new(0));
    let invoker = Arc::new(FakeInvoker {
        calls: Arc::clone(&calls),
        busy_for: Duration::from_millis(200),
        passed: true,
    });
    let scheduler = RunScheduler::new(invoker, rt_tx.clone());

    let shown = Arc::new(Mutex::new(Vec::new()));
    let sink = NotificationSink::new(Box::new(RecordingNotifier {
        shown: Arc::clone(&shown),
    }));

    let engine = Engine::new(resolver, scheduler, sink, rt_rx);
    let engine_task = tokio::spawn(engine.run());

    let source_event = || {
        RuntimeEvent::FileChanged(ChangeEvent {
            path: std::path::PathBuf::from("src/lib.rs"),
            at: Instant::now(),
        })
    };

    // First write starts a run.
    rt_tx.send(source_event())?;
    sleep(Duration::from_millis(100)).await;

    // Burst while the run is in flight: no concurrent run, but the activity
    // lands beyond the 50ms grace window.
    rt_tx.send(source_event())?;
    rt_tx.send(source_event())?;

    // First run finishes ~200ms in, rerun finishes ~400ms in.
    sleep(Duration::from_millis(600)).await;
    rt_tx.send(RuntimeEvent::ShutdownRequested)?;
    engine_task.await??;

    assert_eq!(
        calls.load(Ordering::SeqCst),
        2,
        "a burst collapses into exactly one follow-up run"
    );

    // Same result twice: the notification fired once.
    assert_eq!(shown.lock().unwrap().len(), 1);

    Ok(())
}

#[tokio::test]
async fn completion_event_frees_the_slot_before_the_handle_settles() -> TestResult {
    let (resolver, _dir) = resolver_with_delay(0.05)?;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let calls = Arc::new(AtomicUsize::new(0));
    let invoker = Arc::new(FakeInvoker {
        calls: Arc::clone(&calls),
        busy_for: Duration::from_millis(50),
        passed: true,
    });
    let mut scheduler = RunScheduler::new(invoker, tx);
    let mut sink = NotificationSink::new(Box::new(RecordingNotifier {
        shown: Arc::new(Mutex::new(Vec::new())),
    }));

    scheduler.try_start(&resolver);
    // Activity well past the grace window guarantees a follow-up run.
    scheduler.record_activity(Instant::now() + Duration::from_millis(100));

    let Some(RuntimeEvent::RunCompleted { passed, message }) = rx.recv().await else {
        panic!("expected a completion event");
    };
    // The completion lands while the worker task can still be in its
    // epilogue after sending; the rerun must start regardless.
    scheduler.on_complete(passed, &message, &resolver, &mut sink);

    assert!(matches!(
        rx.recv().await,
        Some(RuntimeEvent::RunCompleted { .. })
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    Ok(())
}

#[tokio::test]
async fn config_file_change_reloads_before_the_run_decision() -> TestResult {
    let dir = tempfile::tempdir()?;
    let config_path = dir.path().join("testwatch.toml");
    fs::write(&config_path, "TEST_RUNNER = \"runner-one\"\n")?;

    let defaults = Defaults {
        config: config_path.to_string_lossy().into_owned(),
        watch_dir: dir.path().to_string_lossy().into_owned(),
        ..Defaults::default()
    };
    let mut resolver = ConfigResolver::new(
        CommandLineConfig::default(),
        defaults,
        Box::new(MockBackend::new()),
    );
    resolver.reload()?;

    let (rt_tx, rt_rx) = mpsc::unbounded_channel();
    let commands = Arc::new(Mutex::new(Vec::new()));
    let scheduler = RunScheduler::new(
        Arc::new(CommandRecorder {
            commands: Arc::clone(&commands),
        }),
        rt_tx.clone(),
    );
    let sink = NotificationSink::new(Box::new(RecordingNotifier {
        shown: Arc::new(Mutex::new(Vec::new())),
    }));

    let engine = Engine::new(resolver, scheduler, sink, rt_rx);
    let engine_task = tokio::spawn(engine.run());

    // A source change runs with the original configuration.
    rt_tx.send(RuntimeEvent::FileChanged(ChangeEvent {
        path: dir.path().join("lib.rs"),
        at: Instant::now(),
    }))?;
    sleep(Duration::from_millis(100)).await;

    // An event on the active config file reloads it before the run
    // decision, so that same event already runs the new command.
    fs::write(&config_path, "TEST_RUNNER = \"runner-two\"\n")?;
    rt_tx.send(RuntimeEvent::FileChanged(ChangeEvent {
        path: config_path.clone(),
        at: Instant::now(),
    }))?;
    sleep(Duration::from_millis(100)).await;

    rt_tx.send(RuntimeEvent::ShutdownRequested)?;
    engine_task.await??;

    let commands = commands.lock().unwrap();
    assert_eq!(
        commands.as_slice(),
        ["runner-one test".to_string(), "runner-two test".to_string()]
    );

    Ok(())
}

#[tokio::test]
async fn single_event_runs_once() -> TestResult {
    let (resolver, _dir) = resolver_with_delay(0.5)?;
    let (rt_tx, rt_rx) = mpsc::unbounded_channel();

    let calls = Arc::new(AtomicUsize::new(0));
    let invoker = Arc::new(FakeInvoker {
        calls: Arc::clone(&calls),
        busy_for: Duration::from_millis(50),
        passed: false,
    });
    let scheduler = RunScheduler::new(invoker, rt_tx.clone());

    let shown = Arc::new(Mutex::new(Vec::new()));
    let sink = NotificationSink::new(Box::new(RecordingNotifier {
        shown: Arc::clone(&shown),
    }));

    let engine = Engine::new(resolver, scheduler, sink, rt_rx);
    let engine_task = tokio::spawn(engine.run());

    rt_tx.send(RuntimeEvent::FileChanged(ChangeEvent {
        path: std::path::PathBuf::from("src/lib.rs"),
        at: Instant::now(),
    }))?;

    sleep(Duration::from_millis(300)).await;
    rt_tx.send(RuntimeEvent::ShutdownRequested)?;
    engine_task.await??;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(shown.lock().unwrap().as_slice(), ["fake run".to_string()]);

    Ok(())
}
