//! Where does an identifier physically live?
//!
//! Every move consults the registry first: an increment number may occupy at
//! most one directory across the active, archive and abandoned zones, and a
//! feature or epic id at most one zone per tree.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{ArchiveError, Result};
use crate::fs_ops;
use crate::layout::Layout;
use crate::metadata::{FsMetadataReader, MetadataReader};
use crate::models::*;

const INCREMENT_ZONES: [Zone; 3] = [Zone::Active, Zone::Archived, Zone::Abandoned];

#[derive(Debug, Clone)]
pub struct IdentifierRegistry {
    layout: Layout,
}

impl IdentifierRegistry {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }

    // ============================================================
    // Increments
    // ============================================================

    /// Increment directories in `zone`, sorted by number.
    pub fn increments(&self, zone: Zone) -> Result<Vec<IncrementName>> {
        let mut names: Vec<IncrementName> =
            fs_ops::list_dir_names(&self.layout.increments_dir(zone))?
                .iter()
                .filter_map(|dir| IncrementName::parse(dir).ok())
                .collect();
        names.sort();
        Ok(names)
    }

    /// Every directory, in any zone, holding `number`.
    pub fn find_by_number(&self, number: IncrementNumber) -> Result<Vec<IncrementLocation>> {
        let mut found = Vec::new();
        for zone in INCREMENT_ZONES {
            for name in self.increments(zone)? {
                if name.number() == number {
                    found.push(self.locate(name, zone)?);
                }
            }
        }
        Ok(found)
    }

    /// Refuse a move of `name` out of `from` if its number is held by any
    /// directory outside `from`.
    pub fn ensure_unique(&self, name: &IncrementName, from: Zone) -> Result<()> {
        let conflicts: Vec<PathBuf> = self
            .find_by_number(name.number())?
            .into_iter()
            .filter(|loc| loc.zone != from)
            .map(|loc| loc.path)
            .collect();

        if conflicts.is_empty() {
            return Ok(());
        }
        Err(ArchiveError::DuplicateIdentifier {
            id: name.number().to_string(),
            paths: conflicts,
        })
    }

    /// Group every increment directory by number and report the numbers held
    /// more than once, with the copy worth keeping.
    pub fn detect_all_duplicates(&self) -> Result<DuplicateReport> {
        let mut by_number: BTreeMap<IncrementNumber, Vec<IncrementLocation>> = BTreeMap::new();
        let mut total_checked = 0;

        for zone in INCREMENT_ZONES {
            for name in self.increments(zone)? {
                total_checked += 1;
                let location = self.locate(name, zone)?;
                by_number
                    .entry(location.name.number())
                    .or_default()
                    .push(location);
            }
        }

        let duplicates: Vec<DuplicateGroup> = by_number
            .into_iter()
            .filter(|(_, locations)| locations.len() > 1)
            .map(|(number, locations)| {
                let winner = select_winner(&locations);
                let reason = explain_winner(&locations[winner], &locations);
                let recommended_winner = locations[winner].clone();
                let losing_versions = locations
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != winner)
                    .map(|(_, loc)| loc.clone())
                    .collect();
                DuplicateGroup {
                    number: number.to_string(),
                    locations,
                    recommended_winner,
                    losing_versions,
                    resolution_reason: reason,
                }
            })
            .collect();

        Ok(DuplicateReport {
            duplicate_count: duplicates.len(),
            duplicates,
            total_checked,
        })
    }

    fn locate(&self, name: IncrementName, zone: Zone) -> Result<IncrementLocation> {
        let path = self.layout.increment_dir(&name, zone);
        let metadata = FsMetadataReader.read_metadata(&path);
        let status = metadata
            .as_ref()
            .and_then(|m| m.status)
            .unwrap_or(IncrementStatus::Unknown);
        let last_activity = match metadata.as_ref().and_then(|m| m.last_activity_at()) {
            Some(at) => at,
            None => fs_ops::modified_at(&path)?,
        };

        Ok(IncrementLocation {
            file_count: fs_ops::file_count(&path),
            total_size: fs_ops::dir_size(&path)?,
            has_reports: path.join("reports").is_dir(),
            path,
            name,
            zone,
            status,
            last_activity,
        })
    }

    // ============================================================
    // Features and epics
    // ============================================================

    /// Feature directories in `zone` of `_features/`, sorted.
    pub fn features(&self, zone: Zone) -> Result<Vec<FeatureId>> {
        let mut ids: Vec<FeatureId> = fs_ops::list_dir_names(&self.layout.features_dir(zone))?
            .iter()
            .filter_map(|dir| FeatureId::parse(dir).ok())
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Epic directories in `zone` of `_epics/`, sorted.
    pub fn epics(&self, zone: Zone) -> Result<Vec<EpicId>> {
        let mut ids: Vec<EpicId> = fs_ops::list_dir_names(&self.layout.epics_dir(zone))?
            .iter()
            .filter_map(|dir| EpicId::parse(dir).ok())
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Projects holding a shard of `id` in `zone`.
    pub fn shards(&self, id: &FeatureId, zone: Zone) -> Result<Vec<ProjectId>> {
        Ok(self
            .layout
            .projects()?
            .into_iter()
            .filter(|project| self.layout.shard_dir(project, id, zone).is_dir())
            .collect())
    }

    /// Canonical and shard copies of a feature, both zones.
    pub fn find_feature(&self, id: &FeatureId) -> Result<Vec<EntityLocation>> {
        let mut found = Vec::new();
        for zone in [Zone::Active, Zone::Archived] {
            let canonical = self.layout.feature_dir(id, zone);
            if canonical.is_dir() {
                found.push(EntityLocation {
                    path: canonical,
                    zone,
                    project: None,
                });
            }
            for project in self.shards(id, zone)? {
                found.push(EntityLocation {
                    path: self.layout.shard_dir(&project, id, zone),
                    zone,
                    project: Some(project.0),
                });
            }
        }
        Ok(found)
    }

    pub fn find_epic(&self, id: &EpicId) -> Result<Vec<EntityLocation>> {
        Ok([Zone::Active, Zone::Archived]
            .into_iter()
            .map(|zone| (zone, self.layout.epic_dir(id, zone)))
            .filter(|(_, path)| path.is_dir())
            .map(|(zone, path)| EntityLocation {
                path,
                zone,
                project: None,
            })
            .collect())
    }
}

/// Index of the copy to keep: highest status, then latest activity, then most
/// files, then the most active zone.
fn select_winner(locations: &[IncrementLocation]) -> usize {
    let mut best = 0;
    for (i, candidate) in locations.iter().enumerate().skip(1) {
        if rank(candidate) > rank(&locations[best]) {
            best = i;
        }
    }
    best
}

fn rank(loc: &IncrementLocation) -> (u8, chrono::DateTime<chrono::Utc>, usize, u8) {
    (
        loc.status.priority(),
        loc.last_activity,
        loc.file_count,
        loc.zone.preference(),
    )
}

fn explain_winner(winner: &IncrementLocation, all: &[IncrementLocation]) -> String {
    let others = || all.iter().filter(move |loc| loc.path != winner.path);
    let mut reasons = Vec::new();

    if others().any(|loc| loc.status.priority() < winner.status.priority()) {
        reasons.push(format!("Higher status ({})", winner.status.as_str()));
    }
    if others().any(|loc| loc.last_activity < winner.last_activity) {
        reasons.push(format!(
            "Most recent activity ({})",
            winner.last_activity.format("%Y-%m-%d")
        ));
    }
    if others().any(|loc| loc.file_count < winner.file_count) {
        reasons.push(format!("Most complete ({} files)", winner.file_count));
    }
    if others().any(|loc| loc.zone.preference() < winner.zone.preference()) {
        reasons.push(format!("In {} location", winner.zone.as_str()));
    }

    if reasons.is_empty() {
        "Default selection".to_string()
    } else {
        reasons.join(", ")
    }
}
