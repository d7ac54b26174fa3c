//! Plugin directory scanning and duplicate analysis.
//!
//! A scan turns the directory listing into [`PluginEntry`] values. Analysis groups
//! them by base name and keeps the highest version of each group; everything else
//! in a group becomes a deletion candidate.
//!
//! # Ordering
//!
//! Entries are visited in file-name order. Analysis sorts each group with a
//! stable sort, so when two variants carry the same version key the one that
//! sorts first by name is kept.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::ScanOptions;
use crate::error::CleanupError;
use crate::version::parse_entry_name;
use crate::PluginEntry;

/// Result of scanning one plugin directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedDirectory {
    /// The directory as an absolute, canonical path.
    pub root: PathBuf,
    pub entries: Vec<PluginEntry>,
}

/// Scans `dir` and returns every entry that carries a parsable version.
///
/// Backup directories, ignored names and unversioned entries are left out; they
/// are never candidates for deletion.
pub fn scan(dir: &Path, options: &ScanOptions) -> Result<ScannedDirectory, CleanupError> {
    if !dir.is_dir() {
        return Err(CleanupError::DirectoryNotFound(dir.to_path_buf()));
    }

    let root = dir.canonicalize().map_err(|source| CleanupError::Io {
        context: format!("failed to resolve {}", dir.display()),
        source,
    })?;

    let mut listing = Vec::new();
    let read_dir = fs::read_dir(&root).map_err(|source| CleanupError::Io {
        context: format!("failed to read directory {}", root.display()),
        source,
    })?;
    for entry in read_dir {
        let entry = entry.map_err(|source| CleanupError::Io {
            context: format!("failed to read entry in {}", root.display()),
            source,
        })?;
        listing.push(entry);
    }
    listing.sort_by_key(|entry| entry.file_name());

    let mut plugins = Vec::new();
    for entry in listing {
        let path = entry.path();
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            let err = CleanupError::UnparsableEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                reason: "name is not valid UTF-8",
            };
            debug!("{err}");
            continue;
        };

        if options.is_ignored(&name) {
            debug!(entry = %name, "ignored");
            continue;
        }

        match classify(name, path, options) {
            Ok(plugin) => plugins.push(plugin),
            Err(err) => debug!("{err}"),
        }
    }

    debug!(
        directory = %root.display(),
        versioned = plugins.len(),
        "scan finished"
    );
    Ok(ScannedDirectory {
        root,
        entries: plugins,
    })
}

fn classify(
    name: String,
    path: PathBuf,
    options: &ScanOptions,
) -> Result<PluginEntry, CleanupError> {
    let parsed = parse_entry_name(&name, &options.packaged_suffixes).ok_or_else(|| {
        CleanupError::UnparsableEntry {
            name: name.clone(),
            reason: "no <name>_<version> pattern",
        }
    })?;
    let is_directory = path.is_dir();
    Ok(PluginEntry::new(name, parsed, is_directory, path))
}

/// The keep/delete partition of one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupPlan {
    keep: Vec<PluginEntry>,
    delete: Vec<PluginEntry>,
}

/// A plugin with more than one installed variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup<'a> {
    pub base_name: &'a str,
    pub keep: &'a PluginEntry,
    pub delete: Vec<&'a PluginEntry>,
}

impl CleanupPlan {
    pub fn keep(&self) -> &[PluginEntry] {
        &self.keep
    }

    pub fn delete(&self) -> &[PluginEntry] {
        &self.delete
    }

    /// True when there is nothing to remove.
    pub fn is_empty(&self) -> bool {
        self.delete.is_empty()
    }

    /// Number of distinct plugins seen by the scan.
    pub fn plugin_count(&self) -> usize {
        self.keep.len()
    }

    /// Groups that lose at least one variant, ordered by base name.
    pub fn duplicate_groups(&self) -> Vec<DuplicateGroup<'_>> {
        let kept: BTreeMap<&str, &PluginEntry> = self
            .keep
            .iter()
            .map(|entry| (entry.base_name.as_str(), entry))
            .collect();

        let mut groups: BTreeMap<&str, Vec<&PluginEntry>> = BTreeMap::new();
        for entry in &self.delete {
            groups.entry(entry.base_name.as_str()).or_default().push(entry);
        }

        groups
            .into_iter()
            .filter_map(|(base_name, delete)| {
                kept.get(base_name).map(|keep| DuplicateGroup {
                    base_name,
                    keep,
                    delete,
                })
            })
            .collect()
    }
}

/// Partition scanned entries into the newest variant per plugin and the rest.
pub fn analyze(entries: Vec<PluginEntry>) -> CleanupPlan {
    let mut groups: BTreeMap<String, Vec<PluginEntry>> = BTreeMap::new();
    for entry in entries {
        groups.entry(entry.base_name.clone()).or_default().push(entry);
    }

    let mut plan = CleanupPlan::default();
    for (_, mut members) in groups {
        // Stable: equal keys keep scan order, so the first one seen wins.
        members.sort_by(|a, b| b.version_key.cmp(&a.version_key));
        let mut members = members.into_iter();
        if let Some(newest) = members.next() {
            plan.keep.push(newest);
        }
        plan.delete.extend(members);
    }

    debug!(
        keep = plan.keep.len(),
        delete = plan.delete.len(),
        "analysis finished"
    );
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::ParsedName;

    fn entry(name: &str) -> PluginEntry {
        let parsed = parse_entry_name(name, &[".jar".to_string()]).expect("must parse");
        PluginEntry::new(name.to_string(), parsed, false, PathBuf::from("/p").join(name))
    }

    fn names(entries: &[PluginEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.original_name.as_str()).collect()
    }

    fn options() -> ScanOptions {
        ScanOptions {
            packaged_suffixes: vec![".jar".to_string()],
            ignored_prefixes: vec!["backup_".to_string()],
            ignored_names: vec!["plugindedup".to_string()],
        }
    }

    #[test]
    fn keeps_highest_numeric_version() {
        let plan = analyze(vec![entry("baz_2.0"), entry("baz_10.0")]);
        assert_eq!(names(plan.keep()), vec!["baz_10.0"]);
        assert_eq!(names(plan.delete()), vec!["baz_2.0"]);
    }

    #[test]
    fn qualifier_does_not_affect_ranking() {
        let plan = analyze(vec![
            entry("foo_1.2.3.v20200101-1000"),
            entry("foo_1.3.0.v20190101-0900.jar"),
        ]);
        assert_eq!(names(plan.keep()), vec!["foo_1.3.0.v20190101-0900.jar"]);
        assert_eq!(names(plan.delete()), vec!["foo_1.2.3.v20200101-1000"]);
    }

    #[test]
    fn ties_keep_first_seen() {
        let plan = analyze(vec![
            entry("dup_1.0.0.v1"),
            entry("dup_1.0.0.v2"),
            entry("dup_1.0"),
        ]);
        assert_eq!(names(plan.keep()), vec!["dup_1.0.0.v1"]);
        assert_eq!(names(plan.delete()), vec!["dup_1.0.0.v2", "dup_1.0"]);
    }

    #[test]
    fn every_entry_lands_in_exactly_one_set() {
        let input = vec![
            entry("a_1.0"),
            entry("a_1.1"),
            entry("a_0.9"),
            entry("b_3"),
            entry("c_2.0.jar"),
            entry("c_2.0.1"),
        ];
        let total = input.len();
        let plan = analyze(input);

        assert_eq!(plan.keep().len() + plan.delete().len(), total);
        assert_eq!(plan.plugin_count(), 3);
        for base in ["a", "b", "c"] {
            let kept = plan.keep().iter().filter(|e| e.base_name == base).count();
            assert_eq!(kept, 1, "group {base}");
        }
        assert_eq!(names(plan.keep()), vec!["a_1.1", "b_3", "c_2.0.1"]);
    }

    #[test]
    fn duplicate_groups_pair_keep_with_deletions() {
        let plan = analyze(vec![
            entry("solo_1.0"),
            entry("x_1"),
            entry("x_3"),
            entry("x_2"),
        ]);
        let groups = plan.duplicate_groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].base_name, "x");
        assert_eq!(groups[0].keep.original_name, "x_3");
        let deleted: Vec<_> = groups[0].delete.iter().map(|e| e.original_name.as_str()).collect();
        assert_eq!(deleted, vec!["x_2", "x_1"]);
    }

    #[test]
    fn empty_input_gives_empty_plan() {
        let plan = analyze(Vec::new());
        assert!(plan.is_empty());
        assert!(plan.keep().is_empty());
        assert!(plan.duplicate_groups().is_empty());
    }

    #[test]
    fn scan_missing_directory_fails() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let err = scan(&tmp.path().join("nope"), &options()).expect_err("must fail");
        assert!(matches!(err, CleanupError::DirectoryNotFound(_)));
    }

    #[test]
    fn scan_skips_unversioned_backups_and_self() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let dir = tmp.path();
        fs::create_dir(dir.join("foo_1.2.3.v20200101-1000")).expect("dir");
        fs::write(dir.join("foo_1.3.0.v20190101-0900.jar"), b"jar").expect("file");
        fs::write(dir.join("bar.jar"), b"jar").expect("file");
        fs::create_dir(dir.join("backup_20240101_000000")).expect("dir");
        fs::write(dir.join("plugindedup"), b"bin").expect("file");

        let scanned = scan(dir, &options()).expect("scan");
        let entries = scanned.entries;
        assert_eq!(scanned.root, dir.canonicalize().expect("canonical"));
        assert_eq!(
            names(&entries),
            vec!["foo_1.2.3.v20200101-1000", "foo_1.3.0.v20190101-0900.jar"]
        );
        assert!(entries[0].is_directory);
        assert!(!entries[1].is_directory);
        assert!(entries.iter().all(|e| e.path.is_absolute()));
    }

    #[test]
    fn entry_new_derives_key() {
        let parsed = ParsedName {
            base_name: "n".to_string(),
            raw_version: "1.10".to_string(),
            qualifier: None,
        };
        let plugin = PluginEntry::new("n_1.10".to_string(), parsed, true, PathBuf::from("/n_1.10"));
        assert_eq!(plugin.version_key.components(), [1, 10, 0, 0]);
        assert_eq!(plugin.display_version(), "1.10");
    }
}
