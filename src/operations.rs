//! Filesystem operations for a cleanup run (backup, delete).
//!
//! - Backup: copy every entry planned for deletion into a fresh directory and
//!   record a manifest once all copies are in place
//! - Delete: remove the planned entries, collecting per-entry failures

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use filetime::FileTime;
use tracing::{info, warn};

use crate::config::{BACKUP_DIR_PREFIX, MANIFEST_FILE_NAME};
use crate::error::CleanupError;
use crate::plugin::{BackupManifest, ManifestEntry};
use crate::PluginEntry;

/// Pick an unused `backup_<YYYYMMDD_HHMMSS>` directory inside `plugin_dir`.
pub fn fresh_backup_dir(plugin_dir: &Path, now: DateTime<Local>) -> PathBuf {
    let stem = format!("{}{}", BACKUP_DIR_PREFIX, now.format("%Y%m%d_%H%M%S"));
    let mut candidate = plugin_dir.join(&stem);
    let mut attempt = 1;
    while candidate.exists() {
        candidate = plugin_dir.join(format!("{stem}_{attempt}"));
        attempt += 1;
    }
    candidate
}

/// Copy every entry into `backup_root` and write the manifest.
///
/// Stops at the first failed copy. The manifest is only written when every copy
/// succeeded, so a backup directory without one is incomplete.
pub fn backup(
    entries: &[PluginEntry],
    backup_root: &Path,
    source_dir: &Path,
) -> Result<BackupManifest, CleanupError> {
    if backup_root.exists() {
        return Err(CleanupError::BackupExists(backup_root.to_path_buf()));
    }

    fs::create_dir_all(backup_root).map_err(|source| CleanupError::BackupFailed {
        entry: backup_root.display().to_string(),
        source,
    })?;
    info!(backup = %backup_root.display(), count = entries.len(), "creating backup");

    for entry in entries {
        let dest = backup_root.join(&entry.original_name);
        copy_entry(entry, &dest).map_err(|source| CleanupError::BackupFailed {
            entry: entry.original_name.clone(),
            source,
        })?;
        info!(entry = %entry.original_name, "backed up");
    }

    let manifest = BackupManifest {
        timestamp: Local::now().to_rfc3339(),
        source_directory: source_dir.display().to_string(),
        deleted_plugins: entries.iter().map(ManifestEntry::from).collect(),
    };
    write_manifest(&manifest, backup_root).map_err(|source| CleanupError::BackupFailed {
        entry: MANIFEST_FILE_NAME.to_string(),
        source,
    })?;

    Ok(manifest)
}

/// Outcome of the delete phase.
#[derive(Debug, Default)]
pub struct DeleteReport {
    deleted: Vec<String>,
    failures: Vec<CleanupError>,
}

impl DeleteReport {
    pub fn deleted(&self) -> &[String] {
        &self.deleted
    }

    pub fn failures(&self) -> &[CleanupError] {
        &self.failures
    }

    pub fn success_count(&self) -> usize {
        self.deleted.len()
    }

    pub fn total(&self) -> usize {
        self.deleted.len() + self.failures.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Remove every entry, carrying on past failures.
pub fn delete_entries(entries: &[PluginEntry]) -> DeleteReport {
    let mut report = DeleteReport::default();

    for entry in entries {
        match delete_path(&entry.path, entry.is_directory) {
            Ok(()) => {
                info!(entry = %entry.original_name, "deleted");
                report.deleted.push(entry.original_name.clone());
            }
            Err(source) => {
                let err = CleanupError::DeleteFailed {
                    entry: entry.original_name.clone(),
                    source,
                };
                warn!("{err}");
                report.failures.push(err);
            }
        }
    }

    report
}

// Helper functions

/// Copy a plugin file or directory tree to `dest`.
fn copy_entry(entry: &PluginEntry, dest: &Path) -> io::Result<()> {
    if entry.is_directory {
        copy_directory_recursive(&entry.path, dest)
    } else {
        copy_file(&entry.path, dest)
    }
}

/// Copy a single file, keeping permissions and access/modification times.
fn copy_file(source: &Path, dest: &Path) -> io::Result<()> {
    fs::copy(source, dest)?;
    copy_times(source, dest)
}

/// Recursively copy a directory.
fn copy_directory_recursive(source: &Path, dest: &Path) -> io::Result<()> {
    fs::create_dir(dest)?;

    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let path = entry.path();
        let dest_path = dest.join(entry.file_name());

        if path.is_dir() {
            copy_directory_recursive(&path, &dest_path)?;
        } else {
            copy_file(&path, &dest_path)?;
        }
    }

    fs::set_permissions(dest, fs::metadata(source)?.permissions())?;
    copy_times(source, dest)
}

fn copy_times(source: &Path, dest: &Path) -> io::Result<()> {
    let metadata = fs::metadata(source)?;
    filetime::set_file_times(
        dest,
        FileTime::from_last_access_time(&metadata),
        FileTime::from_last_modification_time(&metadata),
    )
}

/// Delete a file or directory. A missing path is an error.
fn delete_path(path: &Path, is_directory: bool) -> io::Result<()> {
    if is_directory {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Create the manifest file describing the backed-up plugins.
fn write_manifest(manifest: &BackupManifest, backup_dir: &Path) -> io::Result<()> {
    let manifest_path = backup_dir.join(MANIFEST_FILE_NAME);
    let content = serde_json::to_string_pretty(manifest)?;
    fs::write(manifest_path, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::parse_entry_name;
    use chrono::TimeZone;

    fn entry_at(dir: &Path, name: &str) -> PluginEntry {
        let path = dir.join(name);
        let parsed = parse_entry_name(name, &[".jar".to_string()]).expect("must parse");
        PluginEntry::new(name.to_string(), parsed, path.is_dir(), path)
    }

    #[test]
    fn fresh_backup_dir_avoids_existing() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let now = Local.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).single().expect("time");

        let first = fresh_backup_dir(tmp.path(), now);
        assert_eq!(first, tmp.path().join("backup_20240305_070809"));

        fs::create_dir(&first).expect("dir");
        let second = fresh_backup_dir(tmp.path(), now);
        assert_eq!(second, tmp.path().join("backup_20240305_070809_1"));
    }

    #[test]
    fn backup_copies_tree_and_writes_manifest() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let plugins = tmp.path().join("plugins");
        fs::create_dir_all(plugins.join("foo_1.0/META-INF")).expect("dir");
        fs::write(plugins.join("foo_1.0/META-INF/MANIFEST.MF"), b"Bundle: foo").expect("file");
        fs::write(plugins.join("bar_2.0.jar"), b"jar bytes").expect("file");

        let entries = vec![entry_at(&plugins, "foo_1.0"), entry_at(&plugins, "bar_2.0.jar")];
        let root = tmp.path().join("bk");
        let manifest = backup(&entries, &root, &plugins).expect("backup");

        assert_eq!(
            fs::read(root.join("foo_1.0/META-INF/MANIFEST.MF")).expect("copied"),
            b"Bundle: foo"
        );
        assert_eq!(fs::read(root.join("bar_2.0.jar")).expect("copied"), b"jar bytes");

        let raw = fs::read_to_string(root.join(MANIFEST_FILE_NAME)).expect("manifest");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(value["sourceDirectory"], plugins.display().to_string());
        assert_eq!(value["deletedPlugins"][0]["originalName"], "foo_1.0");
        assert_eq!(value["deletedPlugins"][0]["baseName"], "foo");
        assert_eq!(value["deletedPlugins"][0]["isDirectory"], true);
        assert_eq!(value["deletedPlugins"][1]["version"], "2.0");
        assert!(value["timestamp"].is_string());
        assert_eq!(manifest.deleted_plugins.len(), 2);
    }

    #[test]
    fn backup_preserves_modification_time() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let source = tmp.path().join("old_1.0.jar");
        fs::write(&source, b"x").expect("file");
        let past = FileTime::from_unix_time(1_000_000_000, 0);
        filetime::set_file_mtime(&source, past).expect("mtime");

        let root = tmp.path().join("bk");
        backup(&[entry_at(tmp.path(), "old_1.0.jar")], &root, tmp.path()).expect("backup");

        let copied = fs::metadata(root.join("old_1.0.jar")).expect("meta");
        assert_eq!(FileTime::from_last_modification_time(&copied), past);
    }

    #[test]
    fn backup_refuses_existing_root() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let root = tmp.path().join("bk");
        fs::create_dir(&root).expect("dir");

        let err = backup(&[], &root, tmp.path()).expect_err("must refuse");
        assert!(matches!(err, CleanupError::BackupExists(_)));
        assert!(err.is_backup_failure());
    }

    #[test]
    fn backup_stops_at_first_failure_without_manifest() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let plugins = tmp.path().join("plugins");
        fs::create_dir(&plugins).expect("dir");
        for name in ["a_1.0.jar", "b_1.0.jar", "c_1.0.jar"] {
            fs::write(plugins.join(name), name).expect("file");
        }
        let entries: Vec<_> = ["a_1.0.jar", "b_1.0.jar", "c_1.0.jar"]
            .iter()
            .map(|name| entry_at(&plugins, name))
            .collect();
        fs::remove_file(plugins.join("b_1.0.jar")).expect("remove");

        let root = tmp.path().join("bk");
        let err = backup(&entries, &root, &plugins).expect_err("must fail");
        match err {
            CleanupError::BackupFailed { entry, .. } => assert_eq!(entry, "b_1.0.jar"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(root.join("a_1.0.jar").exists());
        assert!(!root.join("c_1.0.jar").exists());
        assert!(!root.join(MANIFEST_FILE_NAME).exists());
    }

    #[test]
    fn delete_continues_past_failures() {
        let tmp = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(tmp.path().join("d_1.0/sub")).expect("dir");
        fs::write(tmp.path().join("d_1.0/sub/file"), b"x").expect("file");
        fs::write(tmp.path().join("f_1.0.jar"), b"x").expect("file");

        let entries = vec![
            entry_at(tmp.path(), "d_1.0"),
            entry_at(tmp.path(), "gone_1.0.jar"),
            entry_at(tmp.path(), "f_1.0.jar"),
        ];
        let report = delete_entries(&entries);

        assert_eq!(report.success_count(), 2);
        assert_eq!(report.total(), 3);
        assert!(!report.is_complete());
        assert_eq!(report.deleted(), ["d_1.0", "f_1.0.jar"]);
        assert!(matches!(
            &report.failures()[0],
            CleanupError::DeleteFailed { entry, .. } if entry == "gone_1.0.jar"
        ));
        assert!(!tmp.path().join("d_1.0").exists());
        assert!(!tmp.path().join("f_1.0.jar").exists());
    }
}
