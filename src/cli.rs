// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `testwatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "testwatch",
    version,
    about = "Automatic test runner for TDD: watch files, run tests, notify.",
    long_about = None
)]
pub struct CliArgs {
    /// Test runner command.
    #[arg(short = 'r', value_name = "RUNNER")]
    pub runner: Option<String>,

    /// Config file (TOML). Defaults to `testwatch.toml` in the working
    /// directory; when given here, the file must exist.
    #[arg(short = 'c', value_name = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Directory (or file) to watch.
    #[arg(short = 'd', value_name = "WATCH_DIR")]
    pub dir: Option<String>,

    /// Tests to run.
    #[arg(value_name = "TEST")]
    pub test: Vec<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TESTWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
