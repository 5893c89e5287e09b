//! Directory conventions of a SpecWeave repository.
//!
//! ```text
//! .specweave/increments/{NNNN}-{slug}/
//! .specweave/increments/_archive/{NNNN}-{slug}/
//! .specweave/increments/_abandoned/{NNNN}-{slug}/
//! .specweave/docs/internal/specs/_features/FS-{NNN}/
//! .specweave/docs/internal/specs/_features/_archive/FS-{NNN}/
//! .specweave/docs/internal/specs/{project}/FS-{NNN}/
//! .specweave/docs/internal/specs/{project}/_archive/FS-{NNN}/
//! .specweave/docs/internal/specs/_epics/EPIC-{N}/
//! .specweave/docs/internal/specs/_epics/_archive/EPIC-{N}/
//! ```

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::fs_ops;
use crate::models::{EpicId, FeatureId, IncrementName, ProjectId, Zone};

pub const FEATURES_DIR: &str = "_features";
pub const EPICS_DIR: &str = "_epics";
pub const FEATURE_DOC: &str = "FEATURE.md";
pub const SPEC_DOC: &str = "spec.md";
pub const METADATA_FILE: &str = "metadata.json";
pub const ARCHIVE_RECORD_FILE: &str = ".archive-metadata.json";

#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The repository root. Link rewriting scans everything beneath it.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn specweave_dir(&self) -> PathBuf {
        self.root.join(".specweave")
    }

    pub fn config_file(&self) -> PathBuf {
        self.specweave_dir().join("config.json")
    }

    pub fn increments_root(&self) -> PathBuf {
        self.specweave_dir().join("increments")
    }

    pub fn increments_dir(&self, zone: Zone) -> PathBuf {
        zone_dir(self.increments_root(), zone)
    }

    pub fn increment_dir(&self, name: &IncrementName, zone: Zone) -> PathBuf {
        self.increments_dir(zone).join(name.as_str())
    }

    pub fn specs_dir(&self) -> PathBuf {
        self.specweave_dir()
            .join("docs")
            .join("internal")
            .join("specs")
    }

    pub fn features_dir(&self, zone: Zone) -> PathBuf {
        zone_dir(self.specs_dir().join(FEATURES_DIR), zone)
    }

    pub fn feature_dir(&self, id: &FeatureId, zone: Zone) -> PathBuf {
        self.features_dir(zone).join(id.as_str())
    }

    pub fn epics_dir(&self, zone: Zone) -> PathBuf {
        zone_dir(self.specs_dir().join(EPICS_DIR), zone)
    }

    pub fn epic_dir(&self, id: &EpicId, zone: Zone) -> PathBuf {
        self.epics_dir(zone).join(id.as_str())
    }

    pub fn project_dir(&self, project: &ProjectId) -> PathBuf {
        self.specs_dir().join(project.as_str())
    }

    pub fn shard_dir(&self, project: &ProjectId, id: &FeatureId, zone: Zone) -> PathBuf {
        zone_dir(self.project_dir(project), zone).join(id.as_str())
    }

    /// Every project subtree under `specs/`, sorted by name.
    pub fn projects(&self) -> Result<Vec<ProjectId>> {
        let mut projects: Vec<ProjectId> = fs_ops::list_dir_names(&self.specs_dir())?
            .into_iter()
            .filter(|name| ProjectId::is_project_dir(name))
            .map(ProjectId)
            .collect();
        projects.sort();
        Ok(projects)
    }

    /// Path relative to the repository root, for messages and reports.
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}

fn zone_dir(base: PathBuf, zone: Zone) -> PathBuf {
    match zone.dir_name() {
        Some(dir) => base.join(dir),
        None => base,
    }
}
