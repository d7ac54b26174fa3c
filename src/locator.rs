//! Candidate plugin directories for the operator to choose from.
//!
//! Locating an Eclipse installation is platform-specific and kept out of the
//! cleanup pipeline. The pipeline only ever receives a path; a [`DirectoryLocator`]
//! is how a front end gathers suggestions for that path.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

/// Number of entries inspected when deciding whether a directory holds plugins.
const INSPECT_LIMIT: usize = 10;

/// Suggests directories that may contain plugins.
pub trait DirectoryLocator {
    fn suggest_candidates(&self) -> Vec<PathBuf>;
}

/// A locator with nothing to suggest.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocator;

impl DirectoryLocator for NoLocator {
    fn suggest_candidates(&self) -> Vec<PathBuf> {
        Vec::new()
    }
}

/// Yields the `plugins` and `dropins` directories of explicitly given install roots.
#[derive(Debug, Clone, Default)]
pub struct InstallRootLocator {
    roots: Vec<PathBuf>,
}

impl InstallRootLocator {
    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        InstallRootLocator {
            roots: roots.into_iter().collect(),
        }
    }
}

impl DirectoryLocator for InstallRootLocator {
    fn suggest_candidates(&self) -> Vec<PathBuf> {
        let mut found = Vec::new();
        for root in &self.roots {
            let plugins = root.join("plugins");
            match looks_like_plugin_dir(&plugins) {
                Ok(true) => found.push(plugins),
                Ok(false) => debug!(path = %plugins.display(), "no plugins found"),
                Err(e) => debug!(path = %plugins.display(), "skipping: {e:#}"),
            }

            let dropins = root.join("dropins");
            if dropins.is_dir() {
                found.push(dropins);
            }
        }
        normalize_candidates(found)
    }
}

/// True if one of the first few entries is a jar or a directory.
fn looks_like_plugin_dir(dir: &Path) -> Result<bool> {
    if !dir.is_dir() {
        return Ok(false);
    }
    let entries = fs::read_dir(dir).context(format!("Failed to read directory: {:?}", dir))?;
    for entry in entries.take(INSPECT_LIMIT) {
        let path = entry?.path();
        let is_jar = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("jar"));
        if is_jar || path.is_dir() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// A few plugin-looking entry names, shown next to a candidate directory.
pub fn sample_entries(dir: &Path, limit: usize) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .flatten()
        .filter(|entry| {
            let path = entry.path();
            path.is_dir() || path.extension().is_some_and(|ext| ext == "jar")
        })
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names.truncate(limit);
    names
}

/// Collapse duplicate paths and sort them. Windows paths compare case-insensitively
/// but keep the spelling first seen.
pub fn normalize_candidates(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut unique: Vec<PathBuf> = paths
        .into_iter()
        .map(|path| path.components().collect::<PathBuf>())
        .filter(|path| seen.insert(comparison_key(path)))
        .collect();
    unique.sort();
    unique
}

fn comparison_key(path: &Path) -> String {
    let key = path.to_string_lossy().into_owned();
    if cfg!(windows) {
        key.to_lowercase()
    } else {
        key
    }
}
