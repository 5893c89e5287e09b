//! Error taxonomy for archive and restore operations.
//!
//! Batch operations (`archive`, `archive_features`) never return these for a
//! single item; they record them per item and carry on. Single-item operations
//! (`restore`, `restore_feature`, `restore_epic`) return them directly.
//!
//! A cascade (move increment, move feature, rewrite links) is not atomic. If a
//! later step fails the earlier moves stand and the failure is recorded; a
//! reconcile pass converges the corpus afterwards.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::{IdError, IncrementStatus, SyncProvider};

pub type Result<T, E = ArchiveError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Raised strictly before any mutation for the item.
    #[error("Identifier {id} already exists in:\n  - {}", format_paths(.paths))]
    DuplicateIdentifier { id: String, paths: Vec<PathBuf> },

    #[error("{0} is already archived")]
    AlreadyArchived(String),

    #[error("{0} already exists in the active zone")]
    AlreadyActive(String),

    #[error("{0} not found in archive")]
    NotFound(String),

    #[error("{id} has an open {provider} sync")]
    ExternalSyncOpen { id: String, provider: SyncProvider },

    #[error("{id} is {}, preserving", .status.as_str())]
    Preserved { id: String, status: IncrementStatus },

    #[error("{0} has uncommitted changes")]
    UncommittedWork(String),

    #[error(transparent)]
    InvalidIdentifier(#[from] IdError),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Filesystem error at {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed JSON at {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ArchiveError {
    pub fn fs(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Filesystem {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Skip-causing conditions: the item is left in place and the batch reports
    /// it as skipped rather than failed.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            Self::AlreadyArchived(_)
                | Self::ExternalSyncOpen { .. }
                | Self::Preserved { .. }
                | Self::UncommittedWork(_)
        )
    }
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join("\n  - ")
}

/// Attach a path to an `io::Result`.
pub(crate) trait IoContext<T> {
    fn at(self, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn at(self, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|e| ArchiveError::fs(path, e))
    }
}
