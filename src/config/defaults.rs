// src/config/defaults.rs

//! Built-in defaults, the lowest-priority configuration source.
//!
//! Constructed once and passed into the resolver as a plain value; there is
//! no ambient global lookup. Every recognized key is defined here, so
//! resolution of a recognized key can never fall through all three tiers
//! (`TEST_SUITE` is defined as the explicit absent marker, meaning the suite
//! chain is disabled until configured).

use crate::config::model::{ConfigKey, ConfigSource, ConfigValue};
use crate::watch::mask::{EventClass, EventMask};

#[derive(Debug, Clone)]
pub struct Defaults {
    pub config: String,
    pub watch_dir: String,
    pub exclude_filter: Vec<String>,
    pub events_include: EventMask,
    pub events_exclude: Vec<EventMask>,
    pub runner_delay: f64,
    pub test_runner: String,
    pub test_runner_options: String,
    pub tests: String,
    pub tests_options: String,
    pub test_suite: Option<String>,
    pub test_suite_options: String,
}

impl Default for Defaults {
    fn default() -> Defaults {
        Defaults {
            config: "testwatch.toml".to_string(),
            watch_dir: ".".to_string(),
            exclude_filter: vec![
                r".*\.tmp$".to_string(),
                r".*/\.".to_string(),
                r".*\.swp$".to_string(),
            ],
            events_include: EventMask::ALL,
            events_exclude: vec![
                EventClass::Access.mask(),
                EventClass::Open.mask(),
                EventClass::Close.mask(),
                EventClass::Metadata.mask(),
            ],
            runner_delay: 2.0,
            test_runner: "cargo".to_string(),
            test_runner_options: String::new(),
            tests: "test".to_string(),
            tests_options: String::new(),
            test_suite: None,
            test_suite_options: String::new(),
        }
    }
}

impl ConfigSource for Defaults {
    fn lookup(&self, key: ConfigKey) -> Option<ConfigValue> {
        let value = match key {
            ConfigKey::TestRunner => ConfigValue::Str(self.test_runner.clone()),
            ConfigKey::TestRunnerOptions => {
                ConfigValue::Str(self.test_runner_options.clone())
            }
            ConfigKey::Tests => ConfigValue::Str(self.tests.clone()),
            ConfigKey::TestsOptions => ConfigValue::Str(self.tests_options.clone()),
            ConfigKey::TestSuite => match &self.test_suite {
                Some(suite) => ConfigValue::Str(suite.clone()),
                None => ConfigValue::Absent,
            },
            ConfigKey::TestSuiteOptions => {
                ConfigValue::Str(self.test_suite_options.clone())
            }
            ConfigKey::WatchDir => ConfigValue::Str(self.watch_dir.clone()),
            ConfigKey::Config => ConfigValue::Str(self.config.clone()),
            ConfigKey::EventsInclude => ConfigValue::Mask(self.events_include),
            ConfigKey::EventsExclude => ConfigValue::Masks(self.events_exclude.clone()),
            ConfigKey::ExcludeFilter => ConfigValue::List(self.exclude_filter.clone()),
            ConfigKey::RunnerDelay => ConfigValue::Seconds(self.runner_delay),
        };
        Some(value)
    }
}
