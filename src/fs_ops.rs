//! Filesystem primitives shared by the lifecycle managers.

use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use walkdir::WalkDir;

use crate::error::{ArchiveError, IoContext, Result};

/// Names of the immediate subdirectories of `dir`. A missing `dir` is empty.
pub fn list_dir_names(dir: &Path) -> Result<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ArchiveError::fs(dir, e)),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.at(dir)?;
        let file_type = entry.file_type().at(entry.path())?;
        if !file_type.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

/// Rename `from` to `to`, creating `to`'s parent. Never overwrites: an
/// existing `to` is an `AlreadyExists` filesystem error and nothing moves.
pub fn move_dir(from: &Path, to: &Path) -> Result<()> {
    if to.exists() {
        return Err(ArchiveError::fs(
            to,
            io::Error::new(io::ErrorKind::AlreadyExists, "move target already exists"),
        ));
    }
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).at(parent)?;
    }
    fs::rename(from, to).at(from)?;
    tracing::debug!("moved {} -> {}", from.display(), to.display());
    Ok(())
}

pub fn remove_dir(path: &Path) -> Result<()> {
    fs::remove_dir_all(path).at(path)
}

/// Total bytes of regular files beneath `dir`.
pub fn dir_size(dir: &Path) -> Result<u64> {
    let mut size = 0;
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| walk_error(dir, e))?;
        if entry.file_type().is_file() {
            size += entry.metadata().map_err(|e| walk_error(dir, e))?.len();
        }
    }
    Ok(size)
}

/// Number of regular files beneath `dir`. Unreadable entries are skipped.
pub fn file_count(dir: &Path) -> usize {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .count()
}

pub fn modified_at(path: &Path) -> Result<DateTime<Utc>> {
    let modified = fs::metadata(path).and_then(|m| m.modified()).at(path)?;
    Ok(DateTime::<Utc>::from(modified))
}

/// File contents, or `None` if the file does not exist.
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ArchiveError::fs(path, e)),
    }
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value).map_err(|e| ArchiveError::Json {
        path: path.to_path_buf(),
        source: e,
    })?;
    fs::write(path, content).at(path)
}

fn walk_error(root: &Path, err: walkdir::Error) -> ArchiveError {
    let path = err.path().unwrap_or(root).to_path_buf();
    ArchiveError::fs(path, io::Error::other(err))
}
