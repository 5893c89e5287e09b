//! Reading the per-increment inputs the engine decides on: `metadata.json`
//! and the feature linkage in `spec.md` frontmatter.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::fs_ops;
use crate::layout::{METADATA_FILE, SPEC_DOC};
use crate::models::{FeatureId, IncrementMetadata, IncrementName};

static FEATURE_ID_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^feature_id:[ \t]*["']?([^"'\r\n]+)["']?[ \t]*\r?$"#)
        .expect("feature_id pattern")
});

static EPIC_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^epic:[ \t]*["']?([^"'\r\n]+)["']?[ \t]*\r?$"#).expect("epic pattern")
});

/// Source of increment metadata, supplied by the surrounding system.
pub trait MetadataReader {
    /// Metadata for the increment stored in `increment_dir`, or `None` when
    /// absent or unreadable.
    fn read_metadata(&self, increment_dir: &Path) -> Option<IncrementMetadata>;
}

/// Reads `metadata.json` from the increment directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsMetadataReader;

impl MetadataReader for FsMetadataReader {
    fn read_metadata(&self, increment_dir: &Path) -> Option<IncrementMetadata> {
        let path = increment_dir.join(METADATA_FILE);
        let content = match fs_ops::read_optional(&path) {
            Ok(Some(content)) => content,
            Ok(None) => return None,
            Err(e) => {
                tracing::debug!("Failed to read {}: {}", path.display(), e);
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                tracing::debug!("Ignoring malformed {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// How an increment is tied to its feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureLink {
    pub feature: FeatureId,
    /// True when named by `feature_id:`/`epic:` frontmatter, false when
    /// inferred from the increment number.
    pub explicit: bool,
}

/// Explicit frontmatter link: `feature_id:` first, then legacy `epic:`.
/// Values that are not feature ids are ignored.
pub fn explicit_feature(spec: &str) -> Option<FeatureId> {
    [&*FEATURE_ID_FIELD, &*EPIC_FIELD]
        .iter()
        .filter_map(|re| re.captures(spec))
        .filter_map(|caps| FeatureId::parse(caps[1].trim()).ok())
        .next()
}

/// The feature an increment belongs to: explicit frontmatter, else `FS-{NNN}`
/// from its numeric prefix.
pub fn feature_link(name: &IncrementName, spec: Option<&str>) -> FeatureLink {
    match spec.and_then(explicit_feature) {
        Some(feature) => FeatureLink {
            feature,
            explicit: true,
        },
        None => FeatureLink {
            feature: name.inferred_feature(),
            explicit: false,
        },
    }
}

/// [`feature_link`] reading `spec.md` from `increment_dir`.
pub fn read_feature_link(name: &IncrementName, increment_dir: &Path) -> FeatureLink {
    let spec = fs_ops::read_optional(&increment_dir.join(SPEC_DOC))
        .unwrap_or_else(|e| {
            tracing::debug!("Failed to read spec for {}: {}", name, e);
            None
        });
    feature_link(name, spec.as_deref())
}
