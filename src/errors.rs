// src/errors.rs

//! Crate-wide error types.
//!
//! Configuration errors are fatal to the operation that triggered them
//! (startup or a live reload) but never to the watch loop itself; run
//! failures surface as `(false, message)` results and are never raised
//! through this type.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TestwatchError {
    #[error("config file {0:?} does not exist")]
    MissingConfigFile(PathBuf),

    #[error("config file {0:?} is invalid: .toml file expected")]
    InvalidConfigExtension(PathBuf),

    #[error("config does not support {0:?}")]
    UnknownConfigKey(&'static str),

    #[error("invalid config value for {key}: {reason}")]
    InvalidConfigValue { key: &'static str, reason: String },

    #[error("invalid exclude pattern: {0}")]
    InvalidExcludePattern(#[from] regex::Error),

    #[error("watch backend error: {0}")]
    Watch(#[from] notify::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TestwatchError>;
