use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::version::{ParsedName, VersionKey};

/// A versioned plugin file or directory found in the plugin directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginEntry {
    pub original_name: String,
    pub is_directory: bool,
    pub base_name: String,
    pub raw_version: String,
    pub qualifier: Option<String>,
    pub version_key: VersionKey,
    pub path: PathBuf,
}

impl PluginEntry {
    pub fn new(original_name: String, parsed: ParsedName, is_directory: bool, path: PathBuf) -> Self {
        let version_key = VersionKey::parse(&parsed.raw_version);
        PluginEntry {
            original_name,
            is_directory,
            base_name: parsed.base_name,
            raw_version: parsed.raw_version,
            qualifier: parsed.qualifier,
            version_key,
            path,
        }
    }

    /// Version as shown to the operator, e.g. `1.3.0 (20190101-0900)`.
    pub fn display_version(&self) -> String {
        match &self.qualifier {
            Some(qualifier) => format!("{} ({})", self.raw_version, qualifier),
            None => self.raw_version.clone(),
        }
    }
}

/// One backed-up entry as recorded in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub original_name: String,
    pub base_name: String,
    pub version: String,
    pub is_directory: bool,
}

impl From<&PluginEntry> for ManifestEntry {
    fn from(entry: &PluginEntry) -> Self {
        ManifestEntry {
            original_name: entry.original_name.clone(),
            base_name: entry.base_name.clone(),
            version: entry.raw_version.clone(),
            is_directory: entry.is_directory,
        }
    }
}

/// Audit record written next to the copied plugins before anything is deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupManifest {
    pub timestamp: String,
    pub source_directory: String,
    pub deleted_plugins: Vec<ManifestEntry>,
}
