//! Markdown link rewriting for moved features and epics.
//!
//! Archiving inserts an `_archive` segment before the id in every link target
//! shaped like `.../_features/{id}/...`, `.../specs/{project}/{id}/...` or
//! `.../_epics/{id}/...`. Restoring strips it again, scoped to one id.
//!
//! This is a text transform over link targets, not a resolver. A target that
//! already carried an `_archive` segment before the entity was archived is
//! indistinguishable from one this module wrote, and restore will strip it.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use walkdir::{DirEntry, WalkDir};

use crate::error::{IoContext, Result};
use crate::layout::{EPICS_DIR, FEATURES_DIR};
use crate::models::{EpicId, FeatureId, LinkUpdate, ProjectId, ARCHIVE_DIR};

/// The `](target` boundary of an inline link or image. Anchoring on the
/// boundary rather than the text keeps nested brackets in link text
/// (`[![badge](img.png)](target)`, `[see [FS-041]](target)`) matchable.
static INLINE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\]\()([^)\s]+)").expect("inline link pattern"));

/// Reference definitions: `[label]: target`.
static REFERENCE_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([ \t]{0,3}\[[^\]]+\]:[ \t]*)(\S+)").expect("reference link pattern")
});

pub const DEFAULT_EXCLUDES: &[&str] = &["node_modules", "dist", "build", "target", ".git"];

#[derive(Debug, Clone)]
pub struct LinkRewriter {
    root: PathBuf,
    excludes: Vec<String>,
}

impl LinkRewriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            excludes: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Directory names never descended into, replacing the defaults.
    pub fn with_excludes(mut self, excludes: Vec<String>) -> Self {
        self.excludes = excludes;
        self
    }

    /// Point every link at the archived location of the given features and epics.
    pub fn update_all_links(
        &self,
        archived_features: &[FeatureId],
        archived_epics: &[EpicId],
    ) -> Result<Vec<LinkUpdate>> {
        if archived_features.is_empty() && archived_epics.is_empty() {
            return Ok(Vec::new());
        }
        let features: BTreeSet<&str> = archived_features.iter().map(|id| id.as_str()).collect();
        let epics: BTreeSet<&str> = archived_epics.iter().map(|id| id.as_str()).collect();

        let updates =
            self.rewrite_corpus(|target| archive_target(target, &features, &epics))?;
        log_summary("Archived", &updates);
        Ok(updates)
    }

    /// Point links at a restored feature's active location again.
    pub fn restore_feature_links(&self, id: &FeatureId) -> Result<Vec<LinkUpdate>> {
        let updates = self.rewrite_corpus(|target| restore_feature_target(target, id.as_str()))?;
        log_summary("Restored", &updates);
        Ok(updates)
    }

    /// Point links at a restored epic's active location again.
    pub fn restore_epic_links(&self, id: &EpicId) -> Result<Vec<LinkUpdate>> {
        let updates = self.rewrite_corpus(|target| restore_epic_target(target, id.as_str()))?;
        log_summary("Restored", &updates);
        Ok(updates)
    }

    /// Every markdown file under the root, skipping excluded directories.
    pub fn markdown_files(&self) -> Vec<PathBuf> {
        WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_excluded(entry))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::debug!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "md"))
            .map(DirEntry::into_path)
            .collect()
    }

    fn is_excluded(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| self.excludes.iter().any(|ex| ex == name))
    }

    fn rewrite_corpus<F>(&self, rewrite: F) -> Result<Vec<LinkUpdate>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut updates = Vec::new();
        for file in self.markdown_files() {
            updates.extend(self.rewrite_file(&file, &rewrite)?);
        }
        Ok(updates)
    }

    /// Rewrite one file in place. The file is written only if a line changed.
    fn rewrite_file<F>(&self, path: &Path, rewrite: &F) -> Result<Vec<LinkUpdate>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bytes = fs::read(path).at(path)?;
        let Ok(content) = String::from_utf8(bytes) else {
            tracing::debug!("Skipping non-UTF-8 file {}", path.display());
            return Ok(Vec::new());
        };

        let shown = path
            .strip_prefix(&self.root)
            .unwrap_or(path)
            .display()
            .to_string();
        let mut updates = Vec::new();
        let mut lines: Vec<String> = Vec::new();

        for (index, line) in content.split('\n').enumerate() {
            let (rewritten, changes) = rewrite_line(line, rewrite);
            for (old_link, new_link) in changes {
                updates.push(LinkUpdate {
                    file: shown.clone(),
                    old_link,
                    new_link,
                    line_number: index + 1,
                });
            }
            lines.push(rewritten);
        }

        if !updates.is_empty() {
            fs::write(path, lines.join("\n")).at(path)?;
            tracing::debug!("Rewrote {} links in {}", updates.len(), shown);
        }
        Ok(updates)
    }
}

fn log_summary(verb: &str, updates: &[LinkUpdate]) {
    if updates.is_empty() {
        return;
    }
    let files: BTreeSet<&str> = updates.iter().map(|u| u.file.as_str()).collect();
    tracing::info!(
        "{} links: updated {} links in {} files",
        verb,
        updates.len(),
        files.len()
    );
}

/// Apply `rewrite` to every link target on the line. Returns the new line and
/// the `(old, new)` target pairs that changed.
fn rewrite_line<F>(line: &str, rewrite: &F) -> (String, Vec<(String, String)>)
where
    F: Fn(&str) -> Option<String>,
{
    let mut changes = Vec::new();
    let inline = INLINE_LINK
        .replace_all(line, |caps: &Captures| substitute(caps, rewrite, &mut changes))
        .into_owned();
    let full = REFERENCE_LINK
        .replace(&inline, |caps: &Captures| substitute(caps, rewrite, &mut changes))
        .into_owned();
    (full, changes)
}

fn substitute<F>(caps: &Captures, rewrite: &F, changes: &mut Vec<(String, String)>) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let target = &caps[2];
    match rewrite(target) {
        Some(new_target) => {
            let replaced = format!("{}{}", &caps[1], new_target);
            changes.push((target.to_string(), new_target));
            replaced
        }
        None => caps[0].to_string(),
    }
}

/// Split `target` into its path and any `#fragment`/`?query` suffix.
fn split_suffix(target: &str) -> (&str, &str) {
    match target.find(['#', '?']) {
        Some(at) => target.split_at(at),
        None => (target, ""),
    }
}

fn rebuild(segments: &[&str], suffix: &str) -> String {
    let mut out = segments.join("/");
    out.push_str(suffix);
    out
}

/// Is `segments[i]` the id segment of a project shard, `specs/{project}/{id}`?
fn is_shard_position(segments: &[&str], i: usize) -> bool {
    i >= 2 && segments[i - 2] == "specs" && ProjectId::is_project_dir(segments[i - 1])
}

fn archive_target(
    target: &str,
    features: &BTreeSet<&str>,
    epics: &BTreeSet<&str>,
) -> Option<String> {
    let (path, suffix) = split_suffix(target);
    let segments: Vec<&str> = path.split('/').collect();
    let mut out: Vec<&str> = Vec::with_capacity(segments.len() + 1);
    let mut changed = false;

    for (i, &segment) in segments.iter().enumerate() {
        if i > 0 {
            let parent = segments[i - 1];
            let feature_hit = features.contains(segment)
                && (parent == FEATURES_DIR || is_shard_position(&segments, i));
            let epic_hit = epics.contains(segment) && parent == EPICS_DIR;
            if feature_hit || epic_hit {
                out.push(ARCHIVE_DIR);
                changed = true;
            }
        }
        out.push(segment);
    }

    changed.then(|| rebuild(&out, suffix))
}

fn restore_feature_target(target: &str, id: &str) -> Option<String> {
    strip_archive_segment(target, id, |segments, archive_at| {
        (archive_at >= 1 && segments[archive_at - 1] == FEATURES_DIR)
            || is_shard_position(segments, archive_at)
    })
}

fn restore_epic_target(target: &str, id: &str) -> Option<String> {
    strip_archive_segment(target, id, |segments, archive_at| {
        archive_at >= 1 && segments[archive_at - 1] == EPICS_DIR
    })
}

/// Drop `_archive` wherever it directly precedes `id` and `owner` accepts the
/// position of that `_archive` segment.
fn strip_archive_segment<P>(target: &str, id: &str, owner: P) -> Option<String>
where
    P: Fn(&[&str], usize) -> bool,
{
    let (path, suffix) = split_suffix(target);
    let segments: Vec<&str> = path.split('/').collect();
    let mut drop = vec![false; segments.len()];

    for i in 1..segments.len() {
        let archive_at = i - 1;
        if segments[i] == id && segments[archive_at] == ARCHIVE_DIR && owner(&segments, archive_at) {
            drop[archive_at] = true;
        }
    }

    if !drop.contains(&true) {
        return None;
    }
    let kept: Vec<&str> = segments
        .iter()
        .zip(&drop)
        .filter(|(_, dropped)| !**dropped)
        .map(|(segment, _)| *segment)
        .collect();
    Some(rebuild(&kept, suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archive(target: &str, features: &[&str], epics: &[&str]) -> Option<String> {
        let features: BTreeSet<&str> = features.iter().copied().collect();
        let epics: BTreeSet<&str> = epics.iter().copied().collect();
        archive_target(target, &features, &epics)
    }

    #[test]
    fn inserts_archive_before_canonical_feature() {
        assert_eq!(
            archive("../_features/FS-041/FEATURE.md", &["FS-041"], &[]).as_deref(),
            Some("../_features/_archive/FS-041/FEATURE.md")
        );
    }

    #[test]
    fn inserts_archive_before_project_shard() {
        assert_eq!(
            archive("../../specs/backend/FS-041/us-001.md#ac", &["FS-041"], &[]).as_deref(),
            Some("../../specs/backend/_archive/FS-041/us-001.md#ac")
        );
    }

    #[test]
    fn leaves_unrelated_and_already_archived_targets() {
        assert_eq!(archive("../_features/FS-042/FEATURE.md", &["FS-041"], &[]), None);
        assert_eq!(archive("../_features/_archive/FS-041/FEATURE.md", &["FS-041"], &[]), None);
        assert_eq!(archive("../notes/FS-041/x.md", &["FS-041"], &[]), None);
        assert_eq!(archive("https://example.com/FS-041", &["FS-041"], &[]), None);
    }

    #[test]
    fn canonical_feature_under_specs_is_rewritten_once() {
        assert_eq!(
            archive("specs/_features/FS-041/FEATURE.md", &["FS-041"], &[]).as_deref(),
            Some("specs/_features/_archive/FS-041/FEATURE.md")
        );
    }

    #[test]
    fn epics_only_match_the_epics_tree() {
        assert_eq!(
            archive("../_epics/EPIC-1/EPIC.md", &[], &["EPIC-1"]).as_deref(),
            Some("../_epics/_archive/EPIC-1/EPIC.md")
        );
        assert_eq!(archive("../_epics/EPIC-10/EPIC.md", &[], &["EPIC-1"]), None);
        assert_eq!(archive("../_features/EPIC-1/x.md", &[], &["EPIC-1"]), None);
    }

    #[test]
    fn restore_strips_only_the_restored_id() {
        assert_eq!(
            restore_feature_target("../_features/_archive/FS-041/FEATURE.md", "FS-041").as_deref(),
            Some("../_features/FS-041/FEATURE.md")
        );
        assert_eq!(
            restore_feature_target("specs/web/_archive/FS-041/us.md", "FS-041").as_deref(),
            Some("specs/web/FS-041/us.md")
        );
        assert_eq!(
            restore_feature_target("../_features/_archive/FS-042/FEATURE.md", "FS-041"),
            None
        );
        assert_eq!(
            restore_epic_target("../_epics/_archive/EPIC-1/EPIC.md", "EPIC-1").as_deref(),
            Some("../_epics/EPIC-1/EPIC.md")
        );
    }

    #[test]
    fn line_rewrite_reports_each_changed_target() {
        let features: BTreeSet<&str> = ["FS-041"].into_iter().collect();
        let epics = BTreeSet::new();
        let line = "See [x](../_features/FS-041/FEATURE.md) and [y](../_features/FS-050/FEATURE.md).";
        let (out, changes) = rewrite_line(line, &|t: &str| archive_target(t, &features, &epics));
        assert_eq!(
            out,
            "See [x](../_features/_archive/FS-041/FEATURE.md) and [y](../_features/FS-050/FEATURE.md)."
        );
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].0, "../_features/FS-041/FEATURE.md");
    }

    #[test]
    fn bracketed_link_text_is_rewritten() {
        let features: BTreeSet<&str> = ["FS-041"].into_iter().collect();
        let epics = BTreeSet::new();
        let archive = |t: &str| archive_target(t, &features, &epics);

        let (out, changes) =
            rewrite_line("[![badge](img.png)](../_features/FS-041/FEATURE.md)", &archive);
        assert_eq!(out, "[![badge](img.png)](../_features/_archive/FS-041/FEATURE.md)");
        assert_eq!(changes.len(), 1);

        let (out, _) = rewrite_line("[see [FS-041] spec](../_features/FS-041/FEATURE.md)", &archive);
        assert_eq!(out, "[see [FS-041] spec](../_features/_archive/FS-041/FEATURE.md)");

        let restore = |t: &str| restore_feature_target(t, "FS-041");
        let (out, _) = rewrite_line(
            "[![badge](img.png)](../_features/_archive/FS-041/FEATURE.md)",
            &restore,
        );
        assert_eq!(out, "[![badge](img.png)](../_features/FS-041/FEATURE.md)");
    }

    #[test]
    fn reference_definitions_are_rewritten() {
        let features: BTreeSet<&str> = ["FS-041"].into_iter().collect();
        let epics = BTreeSet::new();
        let (out, changes) = rewrite_line("[fs41]: ../_features/FS-041/FEATURE.md", &|t: &str| {
            archive_target(t, &features, &epics)
        });
        assert_eq!(out, "[fs41]: ../_features/_archive/FS-041/FEATURE.md");
        assert_eq!(changes.len(), 1);
    }
}
