use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{EpicId, FeatureId, IncrementName, LinkUpdate};

/// Which living-docs tree an archive operation touches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Feature,
    Epic,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feature => "feature",
            Self::Epic => "epic",
        }
    }
}

/// Policy for the feature/epic cascade.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureArchiveOptions {
    #[serde(default)]
    pub dry_run: bool,
    /// Rewrite corpus links to archived features and epics. Defaults to true.
    #[serde(default = "default_true")]
    pub update_links: bool,
    /// Keep features whose project shards still hold open user stories. Defaults to true.
    #[serde(default = "default_true")]
    pub preserve_active_features: bool,
    /// Archive features that no increment links to.
    #[serde(default)]
    pub archive_orphaned_features: bool,
    /// Archive epics that no feature links to.
    #[serde(default)]
    pub archive_orphaned_epics: bool,
    /// Skip the open-user-story check when every linked increment is archived.
    #[serde(default)]
    pub force_archive_when_all_increments_archived: bool,
    /// Recorded in `.archive-metadata.json` instead of the computed reason.
    pub custom_reason: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for FeatureArchiveOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            update_links: true,
            preserve_active_features: true,
            archive_orphaned_features: false,
            archive_orphaned_epics: false,
            force_archive_when_all_increments_archived: false,
            custom_reason: None,
        }
    }
}

/// A feature or epic left active, with why.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkippedEntity {
    pub kind: EntityKind,
    pub id: String,
    pub reason: String,
}

/// Outcome of one cascade run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureArchiveResult {
    pub archived_features: Vec<FeatureId>,
    pub archived_epics: Vec<EpicId>,
    /// Already-archived features whose left-behind project shards this run moved.
    #[serde(default)]
    pub completed_features: Vec<FeatureId>,
    pub updated_links: Vec<LinkUpdate>,
    pub skipped: Vec<SkippedEntity>,
    pub errors: Vec<String>,
}

/// Contents of `.archive-metadata.json`, written next to an archived feature or epic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub archived_at: String,
    pub archived_by: String,
    pub reason: String,
    pub source_path: String,
    #[serde(default)]
    pub linked_increments: Vec<IncrementName>,
}

/// Active/archived counts for one tree.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ZoneCounts {
    pub active: usize,
    pub archived: usize,
}

/// Counts of the living-docs trees, per category and per project.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ArchiveStats {
    pub features: ZoneCounts,
    pub epics: ZoneCounts,
    pub projects: BTreeMap<String, ZoneCounts>,
}

/// Outcome of removing copies that exist in both zones.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CleanupReport {
    /// Removed archive-side paths relative to the specs root, e.g. `_features/_archive/FS-041`.
    pub cleaned: Vec<String>,
    pub errors: Vec<String>,
}

/// Outcome of a reconcile pass: duplicate repair followed by a fresh cascade.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub cleanup: CleanupReport,
    pub cascade: FeatureArchiveResult,
}
