//! Feature and epic archival: the living-docs half of the cascade.
//!
//! A feature is archivable once every increment linked to it is archived (or,
//! when allowed, when nothing links to it). An epic follows once every feature
//! naming it is archived. Moves carry the feature's per-project shards along
//! and finish with a single link rewrite over the whole batch.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ArchiveError, Result};
use crate::fs_ops;
use crate::layout::{Layout, ARCHIVE_RECORD_FILE, FEATURE_DOC};
use crate::links::LinkRewriter;
use crate::metadata;
use crate::models::*;
use crate::registry::IdentifierRegistry;

static CLOSED_STORY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"status:[ \t]*["']?(completed|cancelled)\b"#).expect("story status pattern")
});

/// What the increment side of the cascade needs from the living-docs side.
pub trait FeatureArchiverPort {
    /// Archive every feature and epic whose closure conditions now hold.
    fn archive_features(&self, options: &FeatureArchiveOptions) -> Result<FeatureArchiveResult>;

    /// Move an archived feature and its shards back and fix links to it.
    fn restore_feature(&self, id: &FeatureId) -> Result<Vec<LinkUpdate>>;

    /// Remove archive-side copies of ids that are also active.
    fn cleanup_duplicates(&self) -> Result<CleanupReport>;
}

/// A planned move of one feature or epic.
#[derive(Debug, Clone)]
struct ArchiveOperation {
    kind: EntityKind,
    id: String,
    reason: String,
    linked_increments: Vec<IncrementName>,
}

#[derive(Debug, Clone)]
pub struct FeatureEpicLifecycleManager {
    layout: Layout,
    registry: IdentifierRegistry,
    links: LinkRewriter,
}

impl FeatureEpicLifecycleManager {
    pub fn new(layout: Layout) -> Self {
        Self {
            registry: IdentifierRegistry::new(layout.clone()),
            links: LinkRewriter::new(layout.root()),
            layout,
        }
    }

    pub fn with_link_rewriter(mut self, links: LinkRewriter) -> Self {
        self.links = links;
        self
    }

    // ============================================================
    // Archive
    // ============================================================

    fn run_archive(&self, options: &FeatureArchiveOptions) -> Result<FeatureArchiveResult> {
        let mut result = FeatureArchiveResult::default();

        self.finish_stranded_shards(options, &mut result)?;

        let links = self.increment_links()?;
        tracing::debug!(
            "Checking features against {} linked increments",
            links.values().map(Vec::len).sum::<usize>()
        );

        for op in self.features_to_archive(&links, options, &mut result)? {
            self.execute(op, options, &mut result);
        }

        for op in self.epics_to_archive(options, &mut result)? {
            self.execute(op, options, &mut result);
        }

        if options.update_links && !options.dry_run {
            let features: Vec<FeatureId> = result
                .archived_features
                .iter()
                .chain(&result.completed_features)
                .cloned()
                .collect();
            match self.links.update_all_links(&features, &result.archived_epics) {
                Ok(updates) => result.updated_links = updates,
                Err(e) => {
                    tracing::error!("Link update failed: {}", e);
                    result.errors.push(format!("Link update failed: {}", e));
                }
            }
        }

        Ok(result)
    }

    /// Every increment in the active and archive zones, keyed by the feature it links to.
    fn increment_links(&self) -> Result<BTreeMap<FeatureId, Vec<(IncrementName, Zone)>>> {
        let mut links: BTreeMap<FeatureId, Vec<(IncrementName, Zone)>> = BTreeMap::new();
        for zone in [Zone::Active, Zone::Archived] {
            for name in self.registry.increments(zone)? {
                let dir = self.layout.increment_dir(&name, zone);
                let link = metadata::read_feature_link(&name, &dir);
                if !link.explicit {
                    tracing::debug!("{} has no feature link, assuming {}", name, link.feature);
                }
                links.entry(link.feature).or_default().push((name, zone));
            }
        }
        Ok(links)
    }

    /// Move active shards left behind by an earlier run whose canonical move
    /// landed but whose shard moves did not.
    fn finish_stranded_shards(
        &self,
        options: &FeatureArchiveOptions,
        result: &mut FeatureArchiveResult,
    ) -> Result<()> {
        for id in self.registry.features(Zone::Archived)? {
            let locations = self.registry.find_feature(&id)?;
            // A canonical copy in both zones is a duplicate for cleanup, not a straggler.
            if locations.iter().any(|loc| loc.zone == Zone::Active && loc.project.is_none()) {
                continue;
            }
            let stranded = shards_in(&locations, Zone::Active);
            if stranded.is_empty() {
                continue;
            }

            let taken = collisions(&locations, Zone::Archived);
            if !taken.is_empty() {
                let err = ArchiveError::DuplicateIdentifier {
                    id: id.to_string(),
                    paths: taken,
                };
                tracing::error!("Cannot finish archiving {}: {}", id, err);
                result.errors.push(err.to_string());
                continue;
            }

            if options.dry_run {
                tracing::info!(
                    "[DRY RUN] Would finish archiving {} shards of {}",
                    stranded.len(),
                    id
                );
            } else {
                tracing::info!("Finishing archive of {}: {} shards left active", id, stranded.len());
                for e in self.archive_shards(&id, stranded) {
                    push_shard_failure(result, id.as_str(), &e);
                }
            }
            result.completed_features.push(id);
        }
        Ok(())
    }

    fn features_to_archive(
        &self,
        links: &BTreeMap<FeatureId, Vec<(IncrementName, Zone)>>,
        options: &FeatureArchiveOptions,
        result: &mut FeatureArchiveResult,
    ) -> Result<Vec<ArchiveOperation>> {
        let mut operations = Vec::new();

        for id in self.registry.features(Zone::Active)? {
            let taken = collisions(&self.registry.find_feature(&id)?, Zone::Archived);
            if !taken.is_empty() {
                let err = ArchiveError::DuplicateIdentifier {
                    id: id.to_string(),
                    paths: taken,
                };
                tracing::error!("Refusing to archive {}: {}", id, err);
                result.errors.push(err.to_string());
                continue;
            }

            let linked = links.get(&id).map(Vec::as_slice).unwrap_or_default();
            let active: Vec<&IncrementName> = linked
                .iter()
                .filter(|(_, zone)| *zone == Zone::Active)
                .map(|(name, _)| name)
                .collect();

            // An empty link set is unknown, not closed.
            let all_archived = !linked.is_empty() && active.is_empty();
            let orphaned = linked.is_empty() && options.archive_orphaned_features;

            if !all_archived && !orphaned {
                let reason = if linked.is_empty() {
                    "no linked increments (orphan archiving disabled)".to_string()
                } else {
                    format!("{}/{} increments still active", active.len(), linked.len())
                };
                tracing::debug!("Skipping {}: {}", id, reason);
                result.skipped.push(skipped(EntityKind::Feature, id.as_str(), reason));
                continue;
            }

            let forced = options.force_archive_when_all_increments_archived && all_archived;
            if options.preserve_active_features && !forced && self.has_open_user_stories(&id)? {
                let reason = format!("open user stories ({} increments)", linked.len());
                tracing::debug!("Skipping {}: {}", id, reason);
                result.skipped.push(skipped(EntityKind::Feature, id.as_str(), reason));
                continue;
            }

            let default_reason = if orphaned {
                "orphaned"
            } else {
                "all-increments-archived"
            };
            let reason = options
                .custom_reason
                .clone()
                .unwrap_or_else(|| default_reason.to_string());
            tracing::info!(
                "{}: {} ({} increments){}",
                id,
                reason,
                linked.len(),
                if forced { " [FORCE]" } else { "" }
            );

            operations.push(ArchiveOperation {
                kind: EntityKind::Feature,
                id: id.to_string(),
                reason,
                linked_increments: linked.iter().map(|(name, _)| name.clone()).collect(),
            });
        }

        Ok(operations)
    }

    fn epics_to_archive(
        &self,
        options: &FeatureArchiveOptions,
        result: &mut FeatureArchiveResult,
    ) -> Result<Vec<ArchiveOperation>> {
        let epics = self.registry.epics(Zone::Active)?;
        if epics.is_empty() {
            return Ok(Vec::new());
        }

        let feature_docs = self.feature_docs()?;
        // Dry runs moved nothing, so features planned this run count as archived.
        let planned: BTreeSet<&FeatureId> = result.archived_features.iter().collect();
        let active: BTreeSet<FeatureId> = self
            .registry
            .features(Zone::Active)?
            .into_iter()
            .filter(|id| !planned.contains(id))
            .collect();

        let mut operations = Vec::new();
        for id in epics {
            let taken = collisions(&self.registry.find_epic(&id)?, Zone::Archived);
            if !taken.is_empty() {
                let err = ArchiveError::DuplicateIdentifier {
                    id: id.to_string(),
                    paths: taken,
                };
                tracing::error!("Refusing to archive {}: {}", id, err);
                result.errors.push(err.to_string());
                continue;
            }

            let mention = epic_mention(&id)?;
            let linked: BTreeSet<&FeatureId> = feature_docs
                .iter()
                .filter(|(_, doc)| mention.is_match(doc))
                .map(|(feature, _)| feature)
                .collect();

            let still_active = linked.iter().filter(|f| active.contains(**f)).count();
            let all_archived = !linked.is_empty() && still_active == 0;
            let orphaned = linked.is_empty() && options.archive_orphaned_epics;

            if !all_archived && !orphaned {
                let reason = if linked.is_empty() {
                    "no linked features (orphan archiving disabled)".to_string()
                } else {
                    format!("{}/{} features still active", still_active, linked.len())
                };
                tracing::debug!("Skipping {}: {}", id, reason);
                result.skipped.push(skipped(EntityKind::Epic, id.as_str(), reason));
                continue;
            }

            let default_reason = if orphaned {
                "orphaned"
            } else {
                "all-features-archived"
            };
            operations.push(ArchiveOperation {
                kind: EntityKind::Epic,
                id: id.to_string(),
                reason: options
                    .custom_reason
                    .clone()
                    .unwrap_or_else(|| default_reason.to_string()),
                linked_increments: Vec::new(),
            });
        }

        Ok(operations)
    }

    /// `FEATURE.md` of every feature in either zone.
    fn feature_docs(&self) -> Result<Vec<(FeatureId, String)>> {
        let mut docs = Vec::new();
        for zone in [Zone::Active, Zone::Archived] {
            for id in self.registry.features(zone)? {
                let path = self.layout.feature_dir(&id, zone).join(FEATURE_DOC);
                if let Some(content) = fs_ops::read_optional(&path)? {
                    docs.push((id, content));
                }
            }
        }
        Ok(docs)
    }

    /// Any active shard holding a `us-*.md` story not marked completed or cancelled.
    fn has_open_user_stories(&self, id: &FeatureId) -> Result<bool> {
        for project in self.registry.shards(id, Zone::Active)? {
            let shard = self.layout.shard_dir(&project, id, Zone::Active);
            let entries = std::fs::read_dir(&shard).map_err(|e| ArchiveError::fs(&shard, e))?;
            for entry in entries {
                let path = entry.map_err(|e| ArchiveError::fs(&shard, e))?.path();
                let is_story = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("us-") && n.ends_with(".md"));
                if !is_story || !path.is_file() {
                    continue;
                }
                let content = fs_ops::read_optional(&path)?.unwrap_or_default();
                if !CLOSED_STORY.is_match(&content) {
                    tracing::debug!("{} has open story {}", id, path.display());
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn execute(
        &self,
        op: ArchiveOperation,
        options: &FeatureArchiveOptions,
        result: &mut FeatureArchiveResult,
    ) {
        if options.dry_run {
            tracing::info!("[DRY RUN] Would archive {} {} ({})", op.kind.as_str(), op.id, op.reason);
            push_archived(result, &op);
            return;
        }

        let outcome = match op.kind {
            EntityKind::Feature => self.archive_feature(&op),
            EntityKind::Epic => self.archive_epic(&op).map(|()| Vec::new()),
        };

        match outcome {
            Ok(shard_failures) => {
                tracing::info!("Archived {} {} ({})", op.kind.as_str(), op.id, op.reason);
                push_archived(result, &op);
                for e in shard_failures {
                    push_shard_failure(result, &op.id, &e);
                }
            }
            Err(e) => {
                tracing::error!("Failed to archive {} {}: {}", op.kind.as_str(), op.id, e);
                result
                    .errors
                    .push(format!("Failed to archive {} {}: {}", op.kind.as_str(), op.id, e));
            }
        }
    }

    /// Moves the canonical directory, then each shard. Collisions were ruled
    /// out while planning. Once the canonical move lands the feature counts as
    /// archived; shard failures are returned and the next run finishes them.
    fn archive_feature(&self, op: &ArchiveOperation) -> Result<Vec<ArchiveError>> {
        let id = FeatureId::parse(&op.id)?;
        let source = self.layout.feature_dir(&id, Zone::Active);
        let target = self.layout.feature_dir(&id, Zone::Archived);
        let shards = self.registry.shards(&id, Zone::Active)?;

        fs_ops::move_dir(&source, &target)?;
        self.write_record(op, &source, &target);

        Ok(self.archive_shards(&id, shards))
    }

    fn archive_shards(&self, id: &FeatureId, projects: Vec<ProjectId>) -> Vec<ArchiveError> {
        let mut failures = Vec::new();
        for project in projects {
            let from = self.layout.shard_dir(&project, id, Zone::Active);
            let to = self.layout.shard_dir(&project, id, Zone::Archived);
            match fs_ops::move_dir(&from, &to) {
                Ok(()) => tracing::info!("  Archived {}/{}", project, id),
                Err(e) => failures.push(e),
            }
        }
        failures
    }

    fn archive_epic(&self, op: &ArchiveOperation) -> Result<()> {
        let id = EpicId::parse(&op.id)?;
        let source = self.layout.epic_dir(&id, Zone::Active);
        let target = self.layout.epic_dir(&id, Zone::Archived);
        fs_ops::move_dir(&source, &target)?;
        self.write_record(op, &source, &target);
        Ok(())
    }

    /// Best effort: a missing record never undoes a completed move.
    fn write_record(&self, op: &ArchiveOperation, source: &Path, target: &Path) {
        let record = ArchiveRecord {
            id: op.id.clone(),
            kind: op.kind,
            archived_at: Utc::now().to_rfc3339(),
            archived_by: std::env::var("USER")
                .or_else(|_| std::env::var("USERNAME"))
                .unwrap_or_else(|_| "unknown".to_string()),
            reason: op.reason.clone(),
            source_path: self.layout.relative(source).display().to_string(),
            linked_increments: op.linked_increments.clone(),
        };
        if let Err(e) = fs_ops::write_json(&target.join(ARCHIVE_RECORD_FILE), &record) {
            tracing::warn!("Could not write archive record for {}: {}", op.id, e);
        }
    }

    // ============================================================
    // Restore
    // ============================================================

    fn run_restore_feature(&self, id: &FeatureId) -> Result<Vec<LinkUpdate>> {
        let locations = self.registry.find_feature(id)?;
        let canonical_in =
            |zone: Zone| locations.iter().any(|loc| loc.zone == zone && loc.project.is_none());
        if !canonical_in(Zone::Archived) {
            return Err(ArchiveError::NotFound(id.to_string()));
        }
        if canonical_in(Zone::Active) {
            return Err(ArchiveError::AlreadyActive(id.to_string()));
        }

        let blocked = collisions(&locations, Zone::Active);
        if !blocked.is_empty() {
            return Err(ArchiveError::DuplicateIdentifier {
                id: id.to_string(),
                paths: blocked,
            });
        }

        let source = self.layout.feature_dir(id, Zone::Archived);
        let target = self.layout.feature_dir(id, Zone::Active);
        fs_ops::move_dir(&source, &target)?;
        remove_record(&target);
        for project in shards_in(&locations, Zone::Archived) {
            let from = self.layout.shard_dir(&project, id, Zone::Archived);
            let to = self.layout.shard_dir(&project, id, Zone::Active);
            fs_ops::move_dir(&from, &to)?;
            tracing::info!("  Restored {}/{}", project, id);
        }
        tracing::info!("Restored feature {} from archive", id);

        self.links.restore_feature_links(id)
    }

    /// Move an archived epic back and fix links to it.
    pub fn restore_epic(&self, id: &EpicId) -> Result<Vec<LinkUpdate>> {
        let locations = self.registry.find_epic(id)?;
        if !locations.iter().any(|loc| loc.zone == Zone::Archived) {
            return Err(ArchiveError::NotFound(id.to_string()));
        }
        if locations.iter().any(|loc| loc.zone == Zone::Active) {
            return Err(ArchiveError::AlreadyActive(id.to_string()));
        }

        let source = self.layout.epic_dir(id, Zone::Archived);
        let target = self.layout.epic_dir(id, Zone::Active);
        fs_ops::move_dir(&source, &target)?;
        remove_record(&target);
        tracing::info!("Restored epic {} from archive", id);

        self.links.restore_epic_links(id)
    }

    // ============================================================
    // Repair and reporting
    // ============================================================

    fn run_cleanup(&self) -> Result<CleanupReport> {
        let mut report = CleanupReport::default();
        let specs = self.layout.specs_dir();

        for id in self.registry.features(Zone::Archived)? {
            let canonical = self.layout.feature_dir(&id, Zone::Archived);
            if self.layout.feature_dir(&id, Zone::Active).exists() {
                remove_duplicate(&canonical, &specs, &mut report);
            }
        }

        // Shards are checked independently of the canonical copy.
        for project in self.layout.projects()? {
            let archive = self.layout.project_dir(&project).join(ARCHIVE_DIR);
            for dir in fs_ops::list_dir_names(&archive)? {
                let Ok(id) = FeatureId::parse(&dir) else {
                    continue;
                };
                if self.layout.shard_dir(&project, &id, Zone::Active).exists() {
                    remove_duplicate(&archive.join(&dir), &specs, &mut report);
                }
            }
        }

        for id in self.registry.epics(Zone::Archived)? {
            if self.layout.epic_dir(&id, Zone::Active).exists() {
                remove_duplicate(&self.layout.epic_dir(&id, Zone::Archived), &specs, &mut report);
            }
        }

        tracing::info!(
            "Cleanup complete: {} duplicates removed, {} failures",
            report.cleaned.len(),
            report.errors.len()
        );
        Ok(report)
    }

    /// Converge a corpus left half-cascaded: drop duplicate copies, then
    /// re-derive links and archive whatever is now closed. Safe to re-run.
    pub fn reconcile(&self, options: &FeatureArchiveOptions) -> Result<ReconcileReport> {
        let cleanup = if options.dry_run {
            CleanupReport::default()
        } else {
            self.run_cleanup()?
        };
        let cascade = self.run_archive(options)?;
        Ok(ReconcileReport { cleanup, cascade })
    }

    pub fn get_archive_stats(&self) -> Result<ArchiveStats> {
        let mut stats = ArchiveStats {
            features: ZoneCounts {
                active: self.registry.features(Zone::Active)?.len(),
                archived: self.registry.features(Zone::Archived)?.len(),
            },
            epics: ZoneCounts {
                active: self.registry.epics(Zone::Active)?.len(),
                archived: self.registry.epics(Zone::Archived)?.len(),
            },
            ..ArchiveStats::default()
        };

        for project in self.layout.projects()? {
            let dir = self.layout.project_dir(&project);
            let count = |path: &Path| -> Result<usize> {
                Ok(fs_ops::list_dir_names(path)?
                    .iter()
                    .filter(|name| FeatureId::parse(name).is_ok())
                    .count())
            };
            stats.projects.insert(
                project.0.clone(),
                ZoneCounts {
                    active: count(&dir)?,
                    archived: count(&dir.join(ARCHIVE_DIR))?,
                },
            );
        }

        Ok(stats)
    }
}

impl FeatureArchiverPort for FeatureEpicLifecycleManager {
    fn archive_features(&self, options: &FeatureArchiveOptions) -> Result<FeatureArchiveResult> {
        self.run_archive(options)
    }

    fn restore_feature(&self, id: &FeatureId) -> Result<Vec<LinkUpdate>> {
        self.run_restore_feature(id)
    }

    fn cleanup_duplicates(&self) -> Result<CleanupReport> {
        self.run_cleanup()
    }
}

fn skipped(kind: EntityKind, id: &str, reason: String) -> SkippedEntity {
    SkippedEntity {
        kind,
        id: id.to_string(),
        reason,
    }
}

fn push_archived(result: &mut FeatureArchiveResult, op: &ArchiveOperation) {
    match op.kind {
        EntityKind::Feature => {
            if let Ok(id) = FeatureId::parse(&op.id) {
                result.archived_features.push(id);
            }
        }
        EntityKind::Epic => {
            if let Ok(id) = EpicId::parse(&op.id) {
                result.archived_epics.push(id);
            }
        }
    }
}

fn push_shard_failure(result: &mut FeatureArchiveResult, id: &str, e: &ArchiveError) {
    tracing::error!("Failed to archive a shard of feature {}: {}", id, e);
    result
        .errors
        .push(format!("Failed to archive shard of feature {}: {}", id, e));
}

/// Copies in `into` that a move from the other zone would land on: same tree,
/// same project (or both canonical).
fn collisions(locations: &[EntityLocation], into: Zone) -> Vec<PathBuf> {
    locations
        .iter()
        .filter(|loc| loc.zone == into)
        .filter(|loc| {
            locations
                .iter()
                .any(|other| other.zone != into && other.project == loc.project)
        })
        .map(|loc| loc.path.clone())
        .collect()
}

/// Projects holding a shard of the feature in `zone`.
fn shards_in(locations: &[EntityLocation], zone: Zone) -> Vec<ProjectId> {
    locations
        .iter()
        .filter(|loc| loc.zone == zone)
        .filter_map(|loc| loc.project.clone().map(ProjectId))
        .collect()
}

/// Whole-token match of an epic id, so `EPIC-1` matches neither `EPIC-10`
/// nor `EPIC-1-auth`.
fn epic_mention(id: &EpicId) -> Result<Regex> {
    Ok(Regex::new(&format!(
        r"(?:^|[^A-Za-z0-9_-]){}(?:$|[^A-Za-z0-9_-])",
        regex::escape(id.as_str())
    ))?)
}

fn remove_record(dir: &Path) {
    let record = dir.join(ARCHIVE_RECORD_FILE);
    if record.exists() {
        if let Err(e) = std::fs::remove_file(&record) {
            tracing::warn!("Could not remove {}: {}", record.display(), e);
        }
    }
}

fn remove_duplicate(path: &Path, specs: &Path, report: &mut CleanupReport) {
    let label = path.strip_prefix(specs).unwrap_or(path).display().to_string();
    tracing::warn!("Duplicate detected, removing archived copy {}", label);
    match fs_ops::remove_dir(path) {
        Ok(()) => report.cleaned.push(label),
        Err(e) => report.errors.push(format!("Failed to clean {}: {}", label, e)),
    }
}
