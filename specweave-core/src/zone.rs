use serde::{Deserialize, Serialize};

/// Name of the archive directory shared by every entity tree.
pub const ARCHIVE_DIR: &str = "_archive";

/// Name of the abandoned-increments directory.
pub const ABANDONED_DIR: &str = "_abandoned";

/// One of the mutually exclusive storage locations an entity may occupy.
///
/// - `Active`: directly under its tree root (e.g. `increments/0041-foo`)
/// - `Archived`: under `_archive/` of that tree
/// - `Abandoned`: under `_abandoned/`, increments only. Read, never written.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Active,
    Archived,
    Abandoned,
}

impl Zone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
            Self::Abandoned => "abandoned",
        }
    }

    /// Subdirectory of the tree root holding this zone, `None` for the root itself.
    pub fn dir_name(&self) -> Option<&'static str> {
        match self {
            Self::Active => None,
            Self::Archived => Some(ARCHIVE_DIR),
            Self::Abandoned => Some(ABANDONED_DIR),
        }
    }

    /// Preference when several copies of one id exist: active wins over archive,
    /// archive over abandoned.
    pub fn preference(&self) -> u8 {
        match self {
            Self::Active => 3,
            Self::Archived => 2,
            Self::Abandoned => 1,
        }
    }
}

impl std::fmt::Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
