#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use specweave_archive::models::{EpicId, FeatureId, IncrementName, ProjectId, Zone};
use specweave_archive::Layout;
use tempfile::TempDir;
use walkdir::WalkDir;

/// A throwaway SpecWeave repository.
pub struct Corpus {
    dir: TempDir,
    pub layout: Layout,
}

impl Corpus {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let layout = Layout::new(dir.path());
        fs::create_dir_all(layout.increments_root()).expect("Failed to create increments dir");
        Self { dir, layout }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn increment(&self, zone: Zone, name: &str, metadata: &str) -> PathBuf {
        let name = IncrementName::parse(name).expect("valid increment name");
        let dir = self.layout.increment_dir(&name, zone);
        fs::create_dir_all(&dir).expect("Failed to create increment");
        fs::write(dir.join("metadata.json"), metadata).expect("Failed to write metadata");
        fs::write(dir.join("tasks.md"), format!("# Tasks for {}\n\n- [x] T-001\n", name))
            .expect("Failed to write tasks");
        dir
    }

    pub fn completed(&self, zone: Zone, name: &str) -> PathBuf {
        self.increment(zone, name, r#"{"status": "completed"}"#)
    }

    /// A completed increment whose spec links it to `feature`.
    pub fn linked(&self, zone: Zone, name: &str, feature: &str) -> PathBuf {
        let dir = self.completed(zone, name);
        fs::write(
            dir.join("spec.md"),
            format!("---\nfeature_id: {}\n---\n\n# Spec\n", feature),
        )
        .expect("Failed to write spec");
        dir
    }

    pub fn feature(&self, zone: Zone, id: &str, body: &str) -> PathBuf {
        let id = FeatureId::parse(id).expect("valid feature id");
        let dir = self.layout.feature_dir(&id, zone);
        fs::create_dir_all(&dir).expect("Failed to create feature");
        fs::write(dir.join("FEATURE.md"), format!("# {}\n\n{}\n", id, body))
            .expect("Failed to write FEATURE.md");
        dir
    }

    pub fn shard(&self, zone: Zone, project: &str, id: &str) -> PathBuf {
        let id = FeatureId::parse(id).expect("valid feature id");
        let dir = self
            .layout
            .shard_dir(&ProjectId(project.to_string()), &id, zone);
        fs::create_dir_all(&dir).expect("Failed to create shard");
        fs::write(dir.join("README.md"), format!("# {} in {}\n", id, project))
            .expect("Failed to write shard readme");
        dir
    }

    pub fn story(&self, shard: &Path, file: &str, status: &str) {
        fs::write(
            shard.join(file),
            format!("---\nid: {}\nstatus: {}\n---\n\n# Story\n", file, status),
        )
        .expect("Failed to write story");
    }

    pub fn epic(&self, zone: Zone, id: &str) -> PathBuf {
        let id = EpicId::parse(id).expect("valid epic id");
        let dir = self.layout.epic_dir(&id, zone);
        fs::create_dir_all(&dir).expect("Failed to create epic");
        fs::write(dir.join("EPIC.md"), format!("# {}\n", id)).expect("Failed to write EPIC.md");
        dir
    }

    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent");
        }
        fs::write(&path, content).expect("Failed to write file");
        path
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.root().join(rel)).expect("Failed to read file")
    }

    pub fn increment_exists(&self, zone: Zone, name: &str) -> bool {
        let name = IncrementName::parse(name).expect("valid increment name");
        self.layout.increment_dir(&name, zone).is_dir()
    }

    pub fn feature_exists(&self, zone: Zone, id: &str) -> bool {
        let id = FeatureId::parse(id).expect("valid feature id");
        self.layout.feature_dir(&id, zone).is_dir()
    }

    pub fn epic_exists(&self, zone: Zone, id: &str) -> bool {
        let id = EpicId::parse(id).expect("valid epic id");
        self.layout.epic_dir(&id, zone).is_dir()
    }

    /// Every file under the root with its content.
    pub fn snapshot(&self) -> BTreeMap<PathBuf, Vec<u8>> {
        WalkDir::new(self.root())
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| {
                let rel = entry
                    .path()
                    .strip_prefix(self.root())
                    .expect("under root")
                    .to_path_buf();
                let content = fs::read(entry.path()).expect("Failed to read file");
                (rel, content)
            })
            .collect()
    }
}

pub fn specs_path(rel: &str) -> String {
    format!(".specweave/docs/internal/specs/{}", rel)
}
