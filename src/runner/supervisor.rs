// src/runner/supervisor.rs

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use portable_pty::{native_pty_system, CommandBuilder, PtySize};
use tracing::{debug, error, info};

use crate::errors::Result;
use crate::runner::Invoker;

/// How a terminal-pattern wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitOutcome {
    /// Normal end of output; the process ran to completion.
    Eof,
    /// A debugger-breakpoint marker appeared in the output stream.
    Breakpoint,
    /// No output and no pattern within the timeout window.
    TimedOut,
}

/// Result of one supervised test run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub passed: bool,
    /// Output captured before the terminal pattern (or all output when the
    /// run ended normally). Recorded so failures can be logged in full.
    pub output: String,
}

/// Runs a test command as a controlled interactive process.
///
/// The command is spawned on a pseudo-terminal and driven to completion,
/// with one special case: when a recognized debugger prompt appears in the
/// output, the terminal is handed over to the user until the debugger
/// session ends. That handoff blocks the worker slot indefinitely by design;
/// event ingestion keeps running.
#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    breakpoint_markers: Vec<String>,
    pattern_timeout: Duration,
}

impl Default for ProcessSupervisor {
    fn default() -> ProcessSupervisor {
        ProcessSupervisor {
            breakpoint_markers: vec!["ipdb>".to_string(), "(Pdb)".to_string()],
            pattern_timeout: Duration::from_secs(5),
        }
    }
}

impl ProcessSupervisor {
    pub fn new() -> ProcessSupervisor {
        ProcessSupervisor::default()
    }

    pub fn with_pattern_timeout(mut self, timeout: Duration) -> ProcessSupervisor {
        self.pattern_timeout = timeout;
        self
    }

    /// Run a single command and classify the result by exit status.
    ///
    /// When `progress` is set, live output is mirrored to the controlling
    /// terminal while waiting.
    pub fn run_test(&self, command: &str, progress: bool) -> Result<RunOutcome> {
        debug!(command = %command, "to run");

        let pty = native_pty_system();
        let pair = pty.openpty(PtySize {
            rows: 24,
            cols: 80,
            pixel_width: 0,
            pixel_height: 0,
        })?;

        let mut builder = CommandBuilder::new("sh");
        builder.arg("-c");
        builder.arg(command);

        let mut child = pair.slave.spawn_command(builder)?;
        // The child keeps its own slave handle; ours would keep the master
        // from seeing EOF.
        drop(pair.slave);

        let mut reader = pair.master.try_clone_reader()?;
        let mut writer = pair.master.take_writer()?;

        // Reader thread bridges the blocking PTY into a channel the pattern
        // wait can poll with a timeout. It exits on EOF or read error, which
        // disconnects the channel.
        let (chunk_tx, chunk_rx) = mpsc::channel::<Vec<u8>>();
        thread::spawn(move || {
            let mut buf = [0u8; 4096];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if chunk_tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        let mut captured = String::new();
        let outcome = loop {
            match chunk_rx.recv_timeout(self.pattern_timeout) {
                Ok(chunk) => {
                    let text = String::from_utf8_lossy(&chunk);
                    if progress {
                        eprint!("{text}");
                    }
                    captured.push_str(&text);
                    if self.matches_breakpoint(&captured) {
                        break WaitOutcome::Breakpoint;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break WaitOutcome::Eof,
                Err(RecvTimeoutError::Timeout) => break WaitOutcome::TimedOut,
            }
        };

        match outcome {
            WaitOutcome::Eof => {}
            WaitOutcome::Breakpoint => {
                // Show what led up to the prompt, nudge the debugger with an
                // empty line, then hand the terminal over until the user
                // exits the session.
                info!("{}", captured.trim_end_matches(['\r', '\n']));
                writer.write_all(b"\n")?;
                writer.flush()?;

                // Stdin reads can not be interrupted, so the copier checks a
                // gate after each one. A read completing after the session
                // ended is discarded, never forwarded into a later handoff.
                let forwarding = Arc::new(AtomicBool::new(true));
                let gate = Arc::clone(&forwarding);
                thread::spawn(move || {
                    let mut stdin = std::io::stdin();
                    let mut buf = [0u8; 1024];
                    loop {
                        match stdin.read(&mut buf) {
                            Ok(0) | Err(_) => break,
                            Ok(n) => {
                                if !gate.load(Ordering::Acquire) {
                                    break;
                                }
                                if writer.write_all(&buf[..n]).is_err()
                                    || writer.flush().is_err()
                                {
                                    break;
                                }
                            }
                        }
                    }
                });

                let mut stdout = std::io::stdout();
                while let Ok(chunk) = chunk_rx.recv() {
                    stdout.write_all(&chunk)?;
                    stdout.flush()?;
                }
                forwarding.store(false, Ordering::Release);
            }
            WaitOutcome::TimedOut => {
                error!(
                    timeout = ?self.pattern_timeout,
                    "timed out waiting for test output"
                );
                child.kill()?;
            }
        }

        let status = child.wait()?;
        let passed = outcome != WaitOutcome::TimedOut && status.success();

        if !passed {
            error!("\n{captured}");
        }

        Ok(RunOutcome {
            passed,
            output: captured,
        })
    }

    fn matches_breakpoint(&self, output: &str) -> bool {
        self.breakpoint_markers
            .iter()
            .any(|marker| output.contains(marker))
    }

    /// Run the primary test command and, when it passes, the optional suite
    /// command (mirrored live). Never fails hard: spawn errors classify as a
    /// failed run.
    pub fn invoke(&self, test_cmd: &str, suite_cmd: Option<&str>) -> (bool, String) {
        if !self.run_passed(test_cmd, false) {
            let msg = "Tests failed";
            error!("{msg}");
            return (false, msg.to_string());
        }

        let msg = "Tests are fine \u{263a}";
        info!("{msg}");

        let Some(suite_cmd) = suite_cmd else {
            return (true, msg.to_string());
        };

        if !self.run_passed(suite_cmd, true) {
            let msg = "Test suite failed";
            error!("{msg}");
            return (false, msg.to_string());
        }

        info!("Test suite run fine too \u{263a}");
        (true, "All tests are fine \u{263a}".to_string())
    }

    fn run_passed(&self, command: &str, progress: bool) -> bool {
        match self.run_test(command, progress) {
            Ok(outcome) => outcome.passed,
            Err(err) => {
                error!(command = %command, error = %err, "test command failed to run");
                false
            }
        }
    }
}

impl Invoker for ProcessSupervisor {
    fn invoke(&self, test_cmd: &str, suite_cmd: Option<&str>) -> (bool, String) {
        ProcessSupervisor::invoke(self, test_cmd, suite_cmd)
    }
}
