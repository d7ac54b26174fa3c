//! Run configuration for a cleanup pass.

use std::path::{Path, PathBuf};

/// Prefix of the backup directories this tool creates inside the plugin directory.
pub const BACKUP_DIR_PREFIX: &str = "backup_";

/// File name of the manifest written into every backup directory.
pub const MANIFEST_FILE_NAME: &str = "backup_manifest.json";

/// Settings for a single cleanup run.
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    pub plugin_dir: PathBuf,
    /// Where to put the backup. `None` picks a fresh `backup_<timestamp>` directory
    /// inside `plugin_dir`.
    pub backup_dir: Option<PathBuf>,
    /// Report the plan and stop without touching the filesystem.
    pub preview_only: bool,
    pub scan: ScanOptions,
}

impl CleanupConfig {
    pub fn new(plugin_dir: impl Into<PathBuf>) -> Self {
        CleanupConfig {
            plugin_dir: plugin_dir.into(),
            backup_dir: None,
            preview_only: false,
            scan: ScanOptions::default(),
        }
    }

    pub fn with_backup_dir(mut self, backup_dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = Some(backup_dir.into());
        self
    }

    pub fn preview_only(mut self, preview_only: bool) -> Self {
        self.preview_only = preview_only;
        self
    }

    pub fn with_scan_options(mut self, scan: ScanOptions) -> Self {
        self.scan = scan;
        self
    }
}

/// Controls which directory entries take part in deduplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Suffixes stripped from packaged plugins before parsing, e.g. `.jar`.
    pub packaged_suffixes: Vec<String>,
    /// Entries starting with any of these are never considered.
    pub ignored_prefixes: Vec<String>,
    /// Exact entry names that are never considered.
    pub ignored_names: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            packaged_suffixes: vec![".jar".to_string()],
            ignored_prefixes: vec![BACKUP_DIR_PREFIX.to_string()],
            ignored_names: current_exe_name().into_iter().collect(),
        }
    }
}

impl ScanOptions {
    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignored_names.iter().any(|ignored| ignored == name)
            || self
                .ignored_prefixes
                .iter()
                .any(|prefix| name.starts_with(prefix.as_str()))
    }
}

/// The running binary's file name, so a copy dropped into the plugin directory
/// is never treated as a plugin.
fn current_exe_name() -> Option<String> {
    let exe = std::env::current_exe().ok()?;
    file_name_of(&exe)
}

pub(crate) fn file_name_of(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_skip_backups() {
        let options = ScanOptions::default();
        assert!(options.is_ignored("backup_20240101_120000"));
        assert!(!options.is_ignored("org.junit_4.13.2"));
        assert_eq!(options.packaged_suffixes, vec![".jar"]);
    }

    #[test]
    fn ignored_names_match_exactly() {
        let options = ScanOptions {
            packaged_suffixes: Vec::new(),
            ignored_prefixes: Vec::new(),
            ignored_names: vec!["cleaner_1.0".to_string()],
        };
        assert!(options.is_ignored("cleaner_1.0"));
        assert!(!options.is_ignored("cleaner_1.0.jar"));
    }

    #[test]
    fn builder_sets_fields() {
        let config = CleanupConfig::new("/opt/eclipse/plugins")
            .with_backup_dir("/tmp/bk")
            .preview_only(true);
        assert_eq!(config.plugin_dir, PathBuf::from("/opt/eclipse/plugins"));
        assert_eq!(config.backup_dir, Some(PathBuf::from("/tmp/bk")));
        assert!(config.preview_only);
    }
}
