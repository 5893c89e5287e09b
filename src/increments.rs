//! Increment archival and restore.
//!
//! `archive` is a batch: every candidate gets a decision, and a failure on one
//! increment is recorded without stopping the rest. `restore` is a single-item
//! operation and returns its precondition failures directly.

use chrono::{Duration, Utc};
use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::error::{ArchiveError, Result};
use crate::features::FeatureArchiverPort;
use crate::fs_ops;
use crate::guard::{NoUncommittedWork, UncommittedWorkGuard};
use crate::layout::Layout;
use crate::metadata::{self, FsMetadataReader, MetadataReader};
use crate::models::*;
use crate::numbering::IncrementNumberCache;
use crate::registry::IdentifierRegistry;

/// What happened to the increment's feature after a restore.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FeatureSync {
    /// No feature cascade is attached to the manager.
    Disabled,
    /// The feature was never archived.
    AlreadyActive { feature: FeatureId },
    /// Neither zone holds the feature.
    Missing { feature: FeatureId },
    Restored {
        feature: FeatureId,
        links: Vec<LinkUpdate>,
    },
    /// The feature was in both zones; the archived copies were removed instead.
    DuplicatesCleaned {
        feature: FeatureId,
        report: CleanupReport,
    },
}

/// A completed increment restore. The feature step runs after the move and
/// its failure does not undo it.
#[derive(Debug)]
pub struct RestoreOutcome {
    pub increment: IncrementName,
    pub feature_sync: Result<FeatureSync>,
}

struct Cascade {
    port: Box<dyn FeatureArchiverPort>,
    options: FeatureArchiveOptions,
}

pub struct IncrementLifecycleManager {
    layout: Layout,
    registry: IdentifierRegistry,
    cache: IncrementNumberCache,
    metadata: Box<dyn MetadataReader>,
    guard: Box<dyn UncommittedWorkGuard>,
    cascade: Option<Cascade>,
}

impl IncrementLifecycleManager {
    pub fn new(layout: Layout, cache: IncrementNumberCache) -> Self {
        Self {
            registry: IdentifierRegistry::new(layout.clone()),
            layout,
            cache,
            metadata: Box::new(FsMetadataReader),
            guard: Box::new(NoUncommittedWork),
            cascade: None,
        }
    }

    pub fn with_metadata_reader(mut self, reader: impl MetadataReader + 'static) -> Self {
        self.metadata = Box::new(reader);
        self
    }

    pub fn with_guard(mut self, guard: impl UncommittedWorkGuard + 'static) -> Self {
        self.guard = Box::new(guard);
        self
    }

    /// Run the feature/epic cascade after each batch that archived something,
    /// and restore linked features on increment restore.
    pub fn with_cascade(
        mut self,
        port: impl FeatureArchiverPort + 'static,
        options: FeatureArchiveOptions,
    ) -> Self {
        self.cascade = Some(Cascade {
            port: Box::new(port),
            options,
        });
        self
    }

    // ============================================================
    // Archive
    // ============================================================

    /// Archive every active increment the options select and the guards allow.
    ///
    /// Only an invalid `pattern` or an unreadable increments tree fails the
    /// call; everything else lands in the result.
    pub fn archive(&self, options: &ArchiveOptions) -> Result<ArchiveResult> {
        let pattern = options
            .pattern
            .as_deref()
            .map(|p| RegexBuilder::new(p).case_insensitive(true).build())
            .transpose()?;

        let active = self.registry.increments(Zone::Active)?;
        let candidates = self.select(&active, options, pattern.as_ref())?;
        tracing::debug!(
            "{} of {} active increments are candidates",
            candidates.len(),
            active.len()
        );

        let mut result = ArchiveResult::default();
        for name in candidates {
            match self.archive_one(&name, options) {
                Ok(()) => result.archived.push(name),
                Err(e) if e.is_soft() => {
                    if matches!(e, ArchiveError::ExternalSyncOpen { .. }) {
                        tracing::warn!("{}, skipping", e);
                    } else {
                        tracing::debug!("Skipping {}: {}", name, e);
                    }
                    result.skipped.push(SkippedIncrement {
                        name,
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to archive {}: {}", name, e);
                    result.errors.push(IncrementFailure {
                        name,
                        message: e.to_string(),
                    });
                }
            }
        }

        if options.dry_run {
            tracing::info!("[DRY RUN] Would archive {} increments", result.archived.len());
            return Ok(result);
        }

        for name in &result.archived {
            let dir = self.layout.increment_dir(name, Zone::Archived);
            match fs_ops::dir_size(&dir) {
                Ok(size) => result.total_size += size,
                Err(e) => tracing::debug!("Could not size {}: {}", dir.display(), e),
            }
        }

        if !result.archived.is_empty() {
            tracing::info!("Archived {} increments", result.archived.len());
            result.cascade_errors = self.run_cascade();
        }

        Ok(result)
    }

    /// Candidate selection. An explicit list overrides every other filter;
    /// otherwise pattern, keep-last and age all apply.
    fn select(
        &self,
        active: &[IncrementName],
        options: &ArchiveOptions,
        pattern: Option<&Regex>,
    ) -> Result<Vec<IncrementName>> {
        if !options.increments.is_empty() {
            let selected: Vec<IncrementName> = active
                .iter()
                .filter(|name| options.increments.iter().any(|target| names(name, target)))
                .cloned()
                .collect();
            for target in &options.increments {
                if !active.iter().any(|name| names(name, target)) {
                    tracing::debug!("{} is not an active increment", target);
                }
            }
            return Ok(selected);
        }

        let kept = options
            .keep_last
            .map(|n| &active[active.len().saturating_sub(n)..])
            .unwrap_or_default();
        let cutoff = options
            .older_than_days
            .map(|days| Utc::now() - Duration::days(i64::from(days)));

        let mut selected = Vec::new();
        for name in active {
            if pattern.is_some_and(|re| !re.is_match(name.as_str())) {
                continue;
            }
            if kept.contains(name) {
                continue;
            }
            if let Some(cutoff) = cutoff {
                let dir = self.layout.increment_dir(name, Zone::Active);
                let last_activity = match self
                    .metadata
                    .read_metadata(&dir)
                    .and_then(|m| m.last_activity_at())
                {
                    Some(at) => at,
                    None => fs_ops::modified_at(&dir)?,
                };
                if last_activity >= cutoff {
                    continue;
                }
            }
            selected.push(name.clone());
        }
        Ok(selected)
    }

    fn archive_one(&self, name: &IncrementName, options: &ArchiveOptions) -> Result<()> {
        let source = self.layout.increment_dir(name, Zone::Active);
        let target = self.layout.increment_dir(name, Zone::Archived);

        self.check_archivable(name, options)?;
        self.registry.ensure_unique(name, Zone::Active)?;

        if options.dry_run {
            tracing::info!("[DRY RUN] Would archive {}", name);
            return Ok(());
        }

        fs_ops::move_dir(&source, &target)?;
        self.cache.invalidate();
        tracing::info!("Archived {}", name);
        Ok(())
    }

    /// The guard chain, first failing guard wins. An open external sync is
    /// checked before the completed shortcut so it can never be bypassed.
    fn check_archivable(&self, name: &IncrementName, options: &ArchiveOptions) -> Result<()> {
        if self.layout.increment_dir(name, Zone::Archived).exists() {
            return Err(ArchiveError::AlreadyArchived(name.to_string()));
        }

        let dir = self.layout.increment_dir(name, Zone::Active);
        let metadata = self.metadata.read_metadata(&dir);
        let status = metadata.as_ref().and_then(|m| m.status);

        if let Some(status) = status {
            if options.preserve_active && status.is_in_progress() {
                return Err(ArchiveError::Preserved {
                    id: name.to_string(),
                    status,
                });
            }
        }

        if let Some(provider) = metadata.as_ref().and_then(|m| m.open_external_sync()) {
            return Err(ArchiveError::ExternalSyncOpen {
                id: name.to_string(),
                provider,
            });
        }

        if options.archive_completed && status == Some(IncrementStatus::Completed) {
            return Ok(());
        }

        if self.guard.has_uncommitted_changes(&dir) {
            return Err(ArchiveError::UncommittedWork(name.to_string()));
        }

        Ok(())
    }

    fn run_cascade(&self) -> Vec<String> {
        let Some(cascade) = &self.cascade else {
            return Vec::new();
        };

        match cascade.port.archive_features(&cascade.options) {
            Ok(result) => {
                if !result.archived_features.is_empty() || !result.archived_epics.is_empty() {
                    tracing::info!(
                        "Cascade archived {} features and {} epics, {} links updated",
                        result.archived_features.len(),
                        result.archived_epics.len(),
                        result.updated_links.len()
                    );
                }
                for error in &result.errors {
                    tracing::warn!("Cascade: {}", error);
                }
                result.errors
            }
            Err(e) => {
                tracing::warn!("Could not update feature archives: {}", e);
                vec![e.to_string()]
            }
        }
    }

    // ============================================================
    // Restore
    // ============================================================

    /// Move an archived increment back, then bring its feature along.
    ///
    /// `increment` is a full name or a bare number.
    pub fn restore(&self, increment: &str) -> Result<RestoreOutcome> {
        let name = self.resolve_archived(increment)?;
        let source = self.layout.increment_dir(&name, Zone::Archived);
        let target = self.layout.increment_dir(&name, Zone::Active);

        if target.exists() {
            return Err(ArchiveError::AlreadyActive(name.to_string()));
        }
        self.registry.ensure_unique(&name, Zone::Archived)?;

        fs_ops::move_dir(&source, &target)?;
        self.cache.invalidate();
        tracing::info!("Restored {} from archive", name);

        let feature_sync = self.sync_feature(&name);
        if let Err(e) = &feature_sync {
            tracing::warn!("Restored {} but its feature was not synced: {}", name, e);
        }

        Ok(RestoreOutcome {
            increment: name,
            feature_sync,
        })
    }

    fn resolve_archived(&self, increment: &str) -> Result<IncrementName> {
        self.registry
            .increments(Zone::Archived)?
            .into_iter()
            .find(|name| names(name, increment))
            .ok_or_else(|| ArchiveError::NotFound(increment.to_string()))
    }

    fn sync_feature(&self, name: &IncrementName) -> Result<FeatureSync> {
        let Some(cascade) = &self.cascade else {
            return Ok(FeatureSync::Disabled);
        };

        let dir = self.layout.increment_dir(name, Zone::Active);
        let feature = metadata::read_feature_link(name, &dir).feature;
        let active = self.layout.feature_dir(&feature, Zone::Active).is_dir();
        let archived = self.layout.feature_dir(&feature, Zone::Archived).is_dir();

        match (active, archived) {
            (false, true) => {
                let links = cascade.port.restore_feature(&feature)?;
                Ok(FeatureSync::Restored { feature, links })
            }
            (true, true) => {
                tracing::warn!("{} exists in both zones, cleaning duplicates", feature);
                let report = cascade.port.cleanup_duplicates()?;
                Ok(FeatureSync::DuplicatesCleaned { feature, report })
            }
            (true, false) => Ok(FeatureSync::AlreadyActive { feature }),
            (false, false) => Ok(FeatureSync::Missing { feature }),
        }
    }

    // ============================================================
    // Reporting
    // ============================================================

    pub fn list_archived(&self) -> Result<Vec<IncrementName>> {
        self.registry.increments(Zone::Archived)
    }

    pub fn get_stats(&self) -> Result<IncrementStats> {
        let active = self.registry.increments(Zone::Active)?;
        let archived = self.registry.increments(Zone::Archived)?;
        let abandoned = self.registry.increments(Zone::Abandoned)?;

        let mut total_size = 0;
        for name in &archived {
            total_size += fs_ops::dir_size(&self.layout.increment_dir(name, Zone::Archived))?;
        }

        Ok(IncrementStats {
            active: active.len(),
            archived: archived.len(),
            abandoned: abandoned.len(),
            total_size,
            oldest_active: active.first().cloned(),
            newest_archived: archived.last().cloned(),
        })
    }

    pub fn next_number(&self) -> Result<IncrementNumber> {
        self.cache.next_number(&self.layout)
    }
}

/// Does `target` (full name, or number with or without padding) name `name`?
fn names(name: &IncrementName, target: &str) -> bool {
    name.as_str() == target
        || target
            .parse::<IncrementNumber>()
            .is_ok_and(|number| number == name.number())
}
