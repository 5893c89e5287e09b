use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{IncrementName, IncrementStatus, Zone};

/// A physical directory holding an increment number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IncrementLocation {
    pub path: PathBuf,
    pub name: IncrementName,
    pub zone: Zone,
    pub status: IncrementStatus,
    pub last_activity: DateTime<Utc>,
    pub file_count: usize,
    pub total_size: u64,
    pub has_reports: bool,
}

/// All copies of one increment number, with the copy worth keeping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateGroup {
    pub number: String,
    pub locations: Vec<IncrementLocation>,
    pub recommended_winner: IncrementLocation,
    pub losing_versions: Vec<IncrementLocation>,
    pub resolution_reason: String,
}

/// Corpus-wide scan for increment numbers held by more than one directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateReport {
    pub duplicates: Vec<DuplicateGroup>,
    pub total_checked: usize,
    pub duplicate_count: usize,
}

/// A physical directory holding a feature or epic id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntityLocation {
    pub path: PathBuf,
    pub zone: Zone,
    /// `None` for the canonical `_features/` or `_epics/` copy.
    pub project: Option<String>,
}
