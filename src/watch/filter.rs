// src/watch/filter.rs

//! Regex-based exclude predicate for watched paths.

use regex::RegexSet;

use crate::errors::Result;

/// Compiled exclude patterns.
///
/// A path matching any pattern is excluded from event delivery. An empty
/// pattern list compiles to a predicate that excludes nothing.
#[derive(Debug, Clone)]
pub struct ExcludeFilter {
    set: RegexSet,
}

impl ExcludeFilter {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<ExcludeFilter> {
        let set = RegexSet::new(patterns.iter().map(|p| p.as_ref()))?;
        Ok(ExcludeFilter { set })
    }

    /// Returns true if `path` should be excluded.
    pub fn matches(&self, path: &str) -> bool {
        self.set.is_match(path)
    }
}
