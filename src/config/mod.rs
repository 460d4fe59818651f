// src/config/mod.rs

//! Hierarchical configuration.
//!
//! Three prioritized sources (command line, local TOML file, built-in
//! defaults) feed a single resolver which also owns the watch-target
//! lifecycle, since watch registration is derived entirely from resolved
//! configuration.

pub mod defaults;
pub mod model;
pub mod resolver;

pub use defaults::Defaults;
pub use model::{
    CommandLineConfig, ConfigKey, ConfigSource, ConfigTier, ConfigValue, LocalConfig,
    OneOrMany,
};
pub use resolver::{CommandKind, ConfigResolver};
