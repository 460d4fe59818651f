// src/config/resolver.rs

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::defaults::Defaults;
use crate::config::model::{
    CommandLineConfig, ConfigKey, ConfigSource, ConfigTier, ConfigValue, LocalConfig,
};
use crate::errors::{Result, TestwatchError};
use crate::watch::backend::{WatchBackend, WatchDescriptor, WatchSpec};
use crate::watch::filter::ExcludeFilter;
use crate::watch::mask::EventMask;

/// Which command to build from the resolved configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Tests,
    Suite,
}

/// The active watch descriptor pair: the recursive source-tree watch and,
/// when the config file exists, a non-recursive watch on just that file.
/// Either side can be absent when its registration failed; the other side
/// keeps the loop responsive.
#[derive(Debug)]
struct WatchPair {
    source: Option<WatchDescriptor>,
    config: Option<WatchDescriptor>,
}

/// Resolves configuration from three prioritized sources and owns the
/// watch-target lifecycle.
///
/// Watch descriptors and the loaded local config are mutated only inside
/// `reload` / `rebuild_watch`, which run on the event-dispatch path; the
/// resolver is single-writer by construction.
pub struct ConfigResolver {
    command_line: CommandLineConfig,
    local: Option<LocalConfig>,
    defaults: Defaults,

    backend: Box<dyn WatchBackend>,
    descriptors: Option<WatchPair>,
    exclude: Option<ExcludeFilter>,

    config_loaded_at: Option<Instant>,
    watcher_added_at: Option<Instant>,
}

impl ConfigResolver {
    pub fn new(
        command_line: CommandLineConfig,
        defaults: Defaults,
        backend: Box<dyn WatchBackend>,
    ) -> ConfigResolver {
        ConfigResolver {
            command_line,
            local: None,
            defaults,
            backend,
            descriptors: None,
            exclude: None,
            config_loaded_at: None,
            watcher_added_at: None,
        }
    }

    /// Resolve `key` against the sources in strict priority order.
    pub fn resolve(&self, key: ConfigKey) -> Result<ConfigValue> {
        self.resolve_with_tier(key).map(|(value, _)| value)
    }

    /// Resolve `key` and report which source defined it.
    pub fn resolve_with_tier(&self, key: ConfigKey) -> Result<(ConfigValue, ConfigTier)> {
        if let Some(value) = self.command_line.lookup(key) {
            return Ok((value, ConfigTier::CommandLine));
        }
        if let Some(local) = &self.local {
            if let Some(value) = local.lookup(key) {
                return Ok((value, ConfigTier::Local));
            }
        }
        if let Some(value) = self.defaults.lookup(key) {
            return Ok((value, ConfigTier::Default));
        }
        Err(TestwatchError::UnknownConfigKey(key.name()))
    }

    pub fn resolve_many(&self, keys: &[ConfigKey]) -> Result<Vec<ConfigValue>> {
        keys.iter().map(|key| self.resolve(*key)).collect()
    }

    /// Build the command string for `kind`.
    ///
    /// Components, in order: runner, runner options, then either (tests
    /// options, tests) or (suite options, suite). Returns `None` when the
    /// runner or the final positional component is falsy, so a malformed
    /// command is never launched. A list-valued final component is flattened;
    /// falsy components are dropped and the survivors joined with a single
    /// space.
    pub fn build_test_command(&self, kind: CommandKind) -> Result<Option<String>> {
        let keys = match kind {
            CommandKind::Tests => [
                ConfigKey::TestRunner,
                ConfigKey::TestRunnerOptions,
                ConfigKey::TestsOptions,
                ConfigKey::Tests,
            ],
            CommandKind::Suite => [
                ConfigKey::TestRunner,
                ConfigKey::TestRunnerOptions,
                ConfigKey::TestSuiteOptions,
                ConfigKey::TestSuite,
            ],
        };

        let values = self.resolve_many(&keys)?;
        if values[0].is_falsy() || values[values.len() - 1].is_falsy() {
            return Ok(None);
        }

        let mut parts: Vec<String> = Vec::new();
        for value in values {
            match value {
                ConfigValue::Str(s) if !s.is_empty() => parts.push(s),
                ConfigValue::List(items) => {
                    parts.extend(items.into_iter().filter(|s| !s.is_empty()));
                }
                _ => {}
            }
        }

        let command = parts.join(" ");
        debug!(command = %command, "built test command");
        Ok(Some(command))
    }

    /// The currently effective config-file path.
    pub fn config_path(&self) -> Result<PathBuf> {
        let (value, _) = self.resolve_with_tier(ConfigKey::Config)?;
        match value.as_str() {
            Some(path) => Ok(PathBuf::from(path)),
            None => Err(TestwatchError::InvalidConfigValue {
                key: ConfigKey::Config.name(),
                reason: "expected a path string".to_string(),
            }),
        }
    }

    /// The configured rerun grace window.
    pub fn runner_delay(&self) -> Duration {
        match self.resolve(ConfigKey::RunnerDelay) {
            Ok(ConfigValue::Seconds(secs)) if secs >= 0.0 => Duration::from_secs_f64(secs),
            _ => Duration::from_secs(2),
        }
    }

    /// (Re)load the local config file and refresh the watch targets.
    ///
    /// A failed reload returns before touching the loaded config, so the
    /// prior effective configuration stays active. A missing config file is
    /// fatal only when its path came from the command line.
    pub fn reload(&mut self) -> Result<()> {
        // A previously loaded config must not redirect where the config
        // itself is looked up.
        if let Some(local) = &mut self.local {
            if local.config.take().is_some() {
                warn!("local config file can not specify itself, dropping CONFIG");
            }
        }

        let (value, tier) = self.resolve_with_tier(ConfigKey::Config)?;
        let config_path = PathBuf::from(value.as_str().unwrap_or_default());
        debug!(path = ?config_path, "config file");

        if !config_path.exists() {
            if tier == ConfigTier::CommandLine {
                return Err(TestwatchError::MissingConfigFile(config_path));
            }
            info!(path = ?config_path, "config file does not exist");
        } else {
            if config_path.extension().and_then(|e| e.to_str()) != Some("toml") {
                return Err(TestwatchError::InvalidConfigExtension(config_path));
            }

            let contents = fs::read_to_string(&config_path)?;
            let mut local: LocalConfig = toml::from_str(&contents)?;
            if local.config.take().is_some() {
                warn!("local config file can not specify itself, ignoring CONFIG");
            }
            self.local = Some(local);
            info!(path = ?config_path, "config reloaded");
        }

        self.config_loaded_at = Some(Instant::now());
        self.rebuild_watch()
    }

    /// Replace the watch descriptor pair from the current configuration.
    ///
    /// No-op while the watch targets are at least as fresh as the loaded
    /// config.
    pub fn rebuild_watch(&mut self) -> Result<()> {
        if let (Some(added), Some(loaded)) = (self.watcher_added_at, self.config_loaded_at) {
            if added > loaded {
                debug!("watcher up to date with config");
                return Ok(());
            }
        }

        let include = mask_reduce(self.resolve(ConfigKey::EventsInclude)?)?;
        let exclude = mask_reduce(self.resolve(ConfigKey::EventsExclude)?)?;
        let mask = include.difference(exclude);

        let watch_dir = self.resolve(ConfigKey::WatchDir)?;
        let watch_dir = PathBuf::from(watch_dir.as_str().unwrap_or("."));
        let config_path = self.config_path()?;
        debug!(dir = ?watch_dir, config = ?config_path, mask = ?mask, "rebuilding watch");

        // Everything fallible resolves before the old pair is touched: a
        // bad config value, such as an invalid exclude pattern, must leave
        // the active watches in place.
        let patterns = match self.resolve(ConfigKey::ExcludeFilter)? {
            ConfigValue::List(patterns) if !patterns.is_empty() => patterns,
            _ => Vec::new(),
        };
        let exclude = if patterns.is_empty() {
            None
        } else {
            Some(ExcludeFilter::new(&patterns)?)
        };

        let source_spec = WatchSpec {
            path: watch_dir,
            mask,
            recursive: true,
            auto_extend: true,
            exclude: exclude.clone(),
        };
        let config_spec = config_path.exists().then(|| WatchSpec {
            path: config_path,
            mask,
            recursive: false,
            auto_extend: false,
            exclude: None,
        });

        // The backend keys watches by path, so the old pair has to go away
        // before the new one is registered. Removal failures only mean the
        // descriptor was already gone.
        if let Some(pair) = self.descriptors.take() {
            for descriptor in [pair.source, pair.config].into_iter().flatten() {
                if let Err(err) = self.backend.remove_watch(descriptor) {
                    warn!(error = %err, "stale watch could not be removed");
                }
            }
        }

        // The exclude predicate is replaced even when the new pattern set is
        // empty.
        self.exclude = exclude;

        // A failed source registration still installs whatever did register,
        // so a later config fix can reach us; the error propagates after the
        // state is consistent.
        let source = self.backend.add_watch(source_spec);
        let config = config_spec.and_then(|spec| match self.backend.add_watch(spec) {
            Ok(descriptor) => Some(descriptor),
            Err(err) => {
                warn!(error = %err, "could not watch config file");
                None
            }
        });

        self.descriptors = Some(WatchPair {
            source: source.as_ref().ok().cloned(),
            config,
        });
        self.watcher_added_at = Some(Instant::now());

        source?;
        info!("watcher updated");
        Ok(())
    }

    /// True iff an exclude predicate is installed and matches `path`.
    pub fn filter(&self, path: &str) -> bool {
        self.exclude
            .as_ref()
            .map(|filter| filter.matches(path))
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for ConfigResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigResolver")
            .field("command_line", &self.command_line)
            .field("local", &self.local)
            .field("config_loaded_at", &self.config_loaded_at)
            .field("watcher_added_at", &self.watcher_added_at)
            .finish_non_exhaustive()
    }
}

/// Reduce a mask-valued config entry: a single flag is used as-is, a
/// collection reduces via union.
fn mask_reduce(value: ConfigValue) -> Result<EventMask> {
    match value {
        ConfigValue::Mask(mask) => Ok(mask),
        ConfigValue::Masks(masks) => Ok(masks
            .into_iter()
            .fold(EventMask::EMPTY, EventMask::union)),
        other => Err(TestwatchError::InvalidConfigValue {
            key: "EVENTS_INCLUDE/EVENTS_EXCLUDE",
            reason: format!("expected event kinds, got {other:?}"),
        }),
    }
}
