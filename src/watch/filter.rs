// src/watch/filter.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

/// Compiled include/exclude glob patterns for the files of one folder.
///
/// Patterns are matched against the file name (the watch is non-recursive),
/// e.g. `"*.xml"` or `".*"`. An empty include list accepts every name.
#[derive(Clone, Default)]
pub struct FileFilter {
    include_set: Option<GlobSet>,
    exclude_set: Option<GlobSet>,
    include: Vec<String>,
    exclude: Vec<String>,
}

impl fmt::Debug for FileFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileFilter")
            .field("include", &self.include)
            .field("exclude", &self.exclude)
            .finish()
    }
}

impl FileFilter {
    /// A filter that lets every file through.
    pub fn accept_all() -> Self {
        Self::default()
    }

    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        let include_set = if include.is_empty() {
            None
        } else {
            Some(build_globset(include).context("building include globset")?)
        };

        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(build_globset(exclude).context("building exclude globset")?)
        };

        Ok(Self {
            include_set,
            exclude_set,
            include: include.to_vec(),
            exclude: exclude.to_vec(),
        })
    }

    /// Returns true if a file with this name should be handed to the client.
    pub fn matches(&self, file_name: &str) -> bool {
        if let Some(include) = &self.include_set {
            if !include.is_match(file_name) {
                return false;
            }
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(file_name) {
                return false;
            }
        }
        true
    }
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat)
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
