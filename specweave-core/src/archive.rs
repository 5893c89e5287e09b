use serde::{Deserialize, Serialize};

use crate::IncrementName;

/// Selection policy for archiving active increments.
///
/// Filter precedence: an explicit `increments` list short-circuits every other
/// filter. Otherwise `pattern`, `keep_last` and `older_than_days` all apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveOptions {
    /// Exclude the last N increments (by number) from candidacy.
    pub keep_last: Option<usize>,
    /// Only increments whose last activity is older than N days.
    pub older_than_days: Option<u32>,
    /// Archive completed increments without consulting the uncommitted-work guard.
    #[serde(default)]
    pub archive_completed: bool,
    /// Never archive `active` or `paused` increments. Defaults to true.
    #[serde(default = "default_true")]
    pub preserve_active: bool,
    /// Explicit increments by full name (`0041-foo`) or number (`41`, `0041`).
    #[serde(default)]
    pub increments: Vec<String>,
    /// Case-insensitive regular expression matched against increment names.
    pub pattern: Option<String>,
    /// Evaluate every decision without touching the filesystem.
    #[serde(default)]
    pub dry_run: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            keep_last: None,
            older_than_days: None,
            archive_completed: false,
            preserve_active: true,
            increments: Vec::new(),
            pattern: None,
            dry_run: false,
        }
    }
}

/// An increment that was considered but deliberately left in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkippedIncrement {
    pub name: IncrementName,
    pub reason: String,
}

/// An increment whose archival failed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IncrementFailure {
    pub name: IncrementName,
    pub message: String,
}

/// Outcome of a batch archive run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveResult {
    pub archived: Vec<IncrementName>,
    pub skipped: Vec<SkippedIncrement>,
    pub errors: Vec<IncrementFailure>,
    /// Bytes now held by the archived increments. Zero on dry runs.
    pub total_size: u64,
    /// Errors raised by the feature/epic cascade. The increment moves stand.
    #[serde(default)]
    pub cascade_errors: Vec<String>,
}

impl ArchiveResult {
    pub fn is_archived(&self, name: &str) -> bool {
        self.archived.iter().any(|n| n.as_str() == name)
    }

    pub fn is_skipped(&self, name: &str) -> bool {
        self.skipped.iter().any(|s| s.name.as_str() == name)
    }
}

/// Summary of the increment trees.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IncrementStats {
    pub active: usize,
    pub archived: usize,
    pub abandoned: usize,
    /// Bytes under `_archive/`.
    pub total_size: u64,
    pub oldest_active: Option<IncrementName>,
    pub newest_archived: Option<IncrementName>,
}
