use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures raised while scanning, backing up or deleting plugin entries.
#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("plugin directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("skipping {name}: {reason}")]
    UnparsableEntry { name: String, reason: &'static str },

    #[error("backup directory already exists: {}", .0.display())]
    BackupExists(PathBuf),

    #[error("failed to back up {entry}: {source}")]
    BackupFailed {
        entry: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to delete {entry}: {source}")]
    DeleteFailed {
        entry: String,
        #[source]
        source: io::Error,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl CleanupError {
    /// True for the errors that must stop the run before anything is deleted.
    pub fn is_backup_failure(&self) -> bool {
        matches!(
            self,
            CleanupError::BackupExists(_) | CleanupError::BackupFailed { .. }
        )
    }
}
