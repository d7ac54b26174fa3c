//! PluginDedup Core Library
//!
//! Removes superseded plugin versions from an Eclipse-style plugin directory.
//! Entries are named `<name>_<version>[.vYYYYMMDD-HHMM]`; for every name only the
//! highest version survives, and everything removed is backed up first.
//!
//! # Pipeline
//!
//! ## Version Parsing (`version` module)
//! - `parse_entry_name()` - Split an entry name into base name, version and qualifier
//! - `VersionKey` - Numeric four-component key used for ordering
//!
//! ## Scanning and Analysis (`registry` module)
//! - `scan()` - List the versioned entries of a plugin directory
//! - `analyze()` - Partition entries into keep and delete sets
//!
//! ## Filesystem Operations (`operations` module)
//! - `backup()` - Copy planned deletions into a backup directory with a manifest
//! - `delete_entries()` - Best-effort removal with a per-entry report
//!
//! ## Orchestration (`cleaner` module)
//! - `CleanupExecutor` - Scan, analyze, confirm, back up, delete
//!
//! ## Directory Suggestions (`locator` module)
//! - `DirectoryLocator` - Candidate plugin directories for a front end to offer

pub mod cleaner;
pub mod config;
pub mod error;
pub mod locator;
pub mod operations;
pub mod plugin;
pub mod registry;
pub mod version;

pub use cleaner::{AssumeNo, AssumeYes, CleanupExecutor, CleanupOutcome, CleanupState, Confirm, Decision};
pub use config::{CleanupConfig, ScanOptions};
pub use error::CleanupError;
pub use plugin::{BackupManifest, ManifestEntry, PluginEntry};
pub use registry::{CleanupPlan, DuplicateGroup, ScannedDirectory};
pub use version::VersionKey;
