// src/config/model.rs

//! Configuration keys, values and the three prioritized sources.
//!
//! Resolution never merges sources: for each key the first source that
//! defines it wins, in the order command line > local config file > built-in
//! defaults. `ConfigValue::Absent` is an explicit "feature disabled" marker,
//! distinct from a source simply not defining a key.

use serde::Deserialize;

use crate::cli::CliArgs;
use crate::watch::mask::EventMask;

/// Every recognized configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    TestRunner,
    TestRunnerOptions,
    Tests,
    TestsOptions,
    TestSuite,
    TestSuiteOptions,
    WatchDir,
    Config,
    EventsInclude,
    EventsExclude,
    ExcludeFilter,
    RunnerDelay,
}

impl ConfigKey {
    /// The upper-case name used in config files and error messages.
    pub fn name(self) -> &'static str {
        match self {
            ConfigKey::TestRunner => "TEST_RUNNER",
            ConfigKey::TestRunnerOptions => "TEST_RUNNER_OPTIONS",
            ConfigKey::Tests => "TESTS",
            ConfigKey::TestsOptions => "TESTS_OPTIONS",
            ConfigKey::TestSuite => "TEST_SUITE",
            ConfigKey::TestSuiteOptions => "TEST_SUITE_OPTIONS",
            ConfigKey::WatchDir => "WATCH_DIR",
            ConfigKey::Config => "CONFIG",
            ConfigKey::EventsInclude => "EVENTS_INCLUDE",
            ConfigKey::EventsExclude => "EVENTS_EXCLUDE",
            ConfigKey::ExcludeFilter => "EXCLUDE_FILTER",
            ConfigKey::RunnerDelay => "RUNNER_DELAY",
        }
    }
}

/// A resolved configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    /// Explicitly not set; the feature behind the key is disabled.
    Absent,
    Str(String),
    List(Vec<String>),
    Mask(EventMask),
    Masks(Vec<EventMask>),
    Seconds(f64),
}

impl ConfigValue {
    /// Falsy values never contribute to a command line: the explicit absent
    /// marker, empty strings, and empty lists.
    pub fn is_falsy(&self) -> bool {
        match self {
            ConfigValue::Absent => true,
            ConfigValue::Str(s) => s.is_empty(),
            ConfigValue::List(l) => l.is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// Which source a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigTier {
    CommandLine,
    Local,
    Default,
}

/// One prioritized configuration source.
pub trait ConfigSource {
    /// The value this source defines for `key`, if any.
    fn lookup(&self, key: ConfigKey) -> Option<ConfigValue>;
}

/// Overrides captured from the command line.
///
/// Empty command-line values do not shadow lower tiers.
#[derive(Debug, Clone, Default)]
pub struct CommandLineConfig {
    pub runner: Option<String>,
    pub config: Option<String>,
    pub watch_dir: Option<String>,
    pub tests: Vec<String>,
}

impl CommandLineConfig {
    pub fn from_args(args: &CliArgs) -> CommandLineConfig {
        CommandLineConfig {
            runner: args.runner.clone().filter(|s| !s.is_empty()),
            config: args.config.clone().filter(|s| !s.is_empty()),
            watch_dir: args.dir.clone().filter(|s| !s.is_empty()),
            tests: args.test.clone(),
        }
    }
}

impl ConfigSource for CommandLineConfig {
    fn lookup(&self, key: ConfigKey) -> Option<ConfigValue> {
        match key {
            ConfigKey::TestRunner => self.runner.clone().map(ConfigValue::Str),
            ConfigKey::Config => self.config.clone().map(ConfigValue::Str),
            ConfigKey::WatchDir => self.watch_dir.clone().map(ConfigValue::Str),
            ConfigKey::Tests if !self.tests.is_empty() => {
                Some(ConfigValue::List(self.tests.clone()))
            }
            _ => None,
        }
    }
}

/// A value that may be written as a single item or a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

/// The local configuration file (TOML, upper-case keys).
///
/// ```toml
/// TEST_RUNNER = "pytest"
/// TEST_RUNNER_OPTIONS = "-x"
/// TESTS = ["tests/test_x.py"]
/// EVENTS_EXCLUDE = ["access", "open"]
/// EXCLUDE_FILTER = ['.*\.tmp$']
/// RUNNER_DELAY = 2.0
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalConfig {
    #[serde(rename = "TEST_RUNNER")]
    pub test_runner: Option<String>,
    #[serde(rename = "TEST_RUNNER_OPTIONS")]
    pub test_runner_options: Option<String>,
    #[serde(rename = "TESTS")]
    pub tests: Option<OneOrMany<String>>,
    #[serde(rename = "TESTS_OPTIONS")]
    pub tests_options: Option<String>,
    #[serde(rename = "TEST_SUITE")]
    pub test_suite: Option<OneOrMany<String>>,
    #[serde(rename = "TEST_SUITE_OPTIONS")]
    pub test_suite_options: Option<String>,
    #[serde(rename = "WATCH_DIR")]
    pub watch_dir: Option<String>,
    /// Forbidden: a local config may not point at another config file.
    /// Scrubbed with a warning at load time.
    #[serde(rename = "CONFIG")]
    pub config: Option<String>,
    #[serde(rename = "EVENTS_INCLUDE")]
    pub events_include: Option<OneOrMany<EventMask>>,
    #[serde(rename = "EVENTS_EXCLUDE")]
    pub events_exclude: Option<OneOrMany<EventMask>>,
    #[serde(rename = "EXCLUDE_FILTER")]
    pub exclude_filter: Option<Vec<String>>,
    #[serde(rename = "RUNNER_DELAY")]
    pub runner_delay: Option<f64>,
}

fn str_or_list(value: &OneOrMany<String>) -> ConfigValue {
    match value {
        OneOrMany::One(s) => ConfigValue::Str(s.clone()),
        OneOrMany::Many(l) => ConfigValue::List(l.clone()),
    }
}

fn mask_or_masks(value: &OneOrMany<EventMask>) -> ConfigValue {
    match value {
        OneOrMany::One(m) => ConfigValue::Mask(*m),
        OneOrMany::Many(l) => ConfigValue::Masks(l.clone()),
    }
}

impl ConfigSource for LocalConfig {
    fn lookup(&self, key: ConfigKey) -> Option<ConfigValue> {
        match key {
            ConfigKey::TestRunner => self.test_runner.clone().map(ConfigValue::Str),
            ConfigKey::TestRunnerOptions => {
                self.test_runner_options.clone().map(ConfigValue::Str)
            }
            ConfigKey::Tests => self.tests.as_ref().map(str_or_list),
            ConfigKey::TestsOptions => self.tests_options.clone().map(ConfigValue::Str),
            ConfigKey::TestSuite => self.test_suite.as_ref().map(str_or_list),
            ConfigKey::TestSuiteOptions => {
                self.test_suite_options.clone().map(ConfigValue::Str)
            }
            ConfigKey::WatchDir => self.watch_dir.clone().map(ConfigValue::Str),
            ConfigKey::Config => self.config.clone().map(ConfigValue::Str),
            ConfigKey::EventsInclude => self.events_include.as_ref().map(mask_or_masks),
            ConfigKey::EventsExclude => self.events_exclude.as_ref().map(mask_or_masks),
            ConfigKey::ExcludeFilter => {
                self.exclude_filter.clone().map(ConfigValue::List)
            }
            ConfigKey::RunnerDelay => self.runner_delay.map(ConfigValue::Seconds),
        }
    }
}
