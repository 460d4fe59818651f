#![cfg(unix)]

use std::error::Error;
use std::fs;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use testwatch::engine::RuntimeEvent;
use testwatch::watch::{
    EventMask, ExcludeFilter, NotifyBackend, WatchBackend, WatchSpec,
};

type TestResult = Result<(), Box<dyn Error>>;

async fn next_change(
    rx: &mut mpsc::UnboundedReceiver<RuntimeEvent>,
    within: Duration,
) -> Option<std::path::PathBuf> {
    match timeout(within, rx.recv()).await {
        Ok(Some(RuntimeEvent::FileChanged(change))) => Some(change.path),
        _ => None,
    }
}

#[tokio::test]
async fn changes_are_delivered_and_excluded_paths_are_not() -> TestResult {
    let dir = tempfile::tempdir()?;
    let (rt_tx, mut rt_rx) = mpsc::unbounded_channel();

    let mut backend = NotifyBackend::spawn(rt_tx)?;
    backend.add_watch(WatchSpec {
        path: dir.path().to_path_buf(),
        mask: EventMask::ALL,
        recursive: true,
        auto_extend: true,
        exclude: Some(ExcludeFilter::new(&[r".*\.tmp$"])?),
    })?;

    // A plain source file is delivered.
    fs::write(dir.path().join("lib.rs"), "fn main() {}")?;
    let delivered = next_change(&mut rt_rx, Duration::from_secs(5)).await;
    assert!(
        delivered.is_some_and(|p| p.ends_with("lib.rs")),
        "expected a change event for lib.rs"
    );

    // Drain whatever else the first write produced.
    while next_change(&mut rt_rx, Duration::from_millis(200)).await.is_some() {}

    // An excluded path produces no delivered event at all.
    fs::write(dir.path().join("scratch.tmp"), "ignored")?;
    let delivered = next_change(&mut rt_rx, Duration::from_millis(500)).await;
    assert!(delivered.is_none(), "excluded path must not be delivered");

    Ok(())
}

#[tokio::test]
async fn removed_watch_stops_delivery() -> TestResult {
    let dir = tempfile::tempdir()?;
    let (rt_tx, mut rt_rx) = mpsc::unbounded_channel();

    let mut backend = NotifyBackend::spawn(rt_tx)?;
    let descriptor = backend.add_watch(WatchSpec {
        path: dir.path().to_path_buf(),
        mask: EventMask::ALL,
        recursive: true,
        auto_extend: true,
        exclude: None,
    })?;

    fs::write(dir.path().join("a.txt"), "x")?;
    assert!(next_change(&mut rt_rx, Duration::from_secs(5)).await.is_some());
    while next_change(&mut rt_rx, Duration::from_millis(200)).await.is_some() {}

    backend.remove_watch(descriptor)?;

    fs::write(dir.path().join("b.txt"), "y")?;
    assert!(
        next_change(&mut rt_rx, Duration::from_millis(500)).await.is_none(),
        "no delivery after the descriptor was removed"
    );

    Ok(())
}
