use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::layout::Layout;
use crate::links::DEFAULT_EXCLUDES;
use crate::models::{ArchiveOptions, FeatureArchiveOptions};

const APP_NAME: &str = "specweave";
const USER_CONFIG_FILE: &str = "archive.json";
const PROJECT_SECTION: &str = "archiving";

/// Archive policy defaults. CLI flags override these per run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ArchiveConfig {
    /// Most recent increments never offered for archival.
    pub keep_last: usize,
    pub archive_completed: bool,
    pub preserve_active: bool,
    pub preserve_active_features: bool,
    pub archive_orphaned_features: bool,
    pub archive_orphaned_epics: bool,
    pub force_archive_when_all_increments_archived: bool,
    /// Directory names skipped when scanning for markdown links.
    pub link_scan_excludes: Vec<String>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            keep_last: 10,
            archive_completed: false,
            preserve_active: true,
            preserve_active_features: true,
            archive_orphaned_features: false,
            archive_orphaned_epics: false,
            force_archive_when_all_increments_archived: false,
            link_scan_excludes: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ArchiveConfig {
    /// Project `archiving` section, else the user config, else defaults.
    /// A file that fails to parse is logged and skipped.
    pub fn load(layout: &Layout) -> Self {
        match Self::try_load(layout) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load archive config, using defaults: {:#}", e);
                Self::default()
            }
        }
    }

    pub fn try_load(layout: &Layout) -> Result<Self> {
        if let Some(config) = Self::from_project(&layout.config_file())? {
            tracing::debug!("Archive config from {}", layout.config_file().display());
            return Ok(config);
        }

        let user_path = get_user_config_path()?;
        if user_path.exists() {
            let content = fs::read_to_string(&user_path).context("Failed to read config file")?;
            let config = serde_json::from_str(&content).context("Failed to parse config file")?;
            tracing::debug!("Archive config from {}", user_path.display());
            return Ok(config);
        }

        Ok(Self::default())
    }

    fn from_project(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut project: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        match project.get_mut(PROJECT_SECTION).map(serde_json::Value::take) {
            Some(section) => {
                let config = serde_json::from_value(section)
                    .with_context(|| format!("Invalid '{}' section", PROJECT_SECTION))?;
                Ok(Some(config))
            }
            None => Ok(None),
        }
    }

    /// Increment options seeded from config. Selection fields stay unset.
    pub fn archive_options(&self) -> ArchiveOptions {
        ArchiveOptions {
            keep_last: Some(self.keep_last),
            archive_completed: self.archive_completed,
            preserve_active: self.preserve_active,
            ..ArchiveOptions::default()
        }
    }

    pub fn feature_options(&self) -> FeatureArchiveOptions {
        FeatureArchiveOptions {
            preserve_active_features: self.preserve_active_features,
            archive_orphaned_features: self.archive_orphaned_features,
            archive_orphaned_epics: self.archive_orphaned_epics,
            force_archive_when_all_increments_archived: self
                .force_archive_when_all_increments_archived,
            ..FeatureArchiveOptions::default()
        }
    }
}

fn get_user_config_path() -> Result<PathBuf> {
    let mut path =
        config_dir().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    path.push(APP_NAME);
    path.push(USER_CONFIG_FILE);
    Ok(path)
}
