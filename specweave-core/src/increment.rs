use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The lifecycle status recorded in an increment's `metadata.json`.
///
/// - `Planned`: created but not started (`planned`, `planning`, `backlog`)
/// - `Active`: work in progress
/// - `Paused`: work suspended, expected to resume
/// - `Completed`: done (`completed`, `complete`)
/// - `Abandoned`: dropped without completion
/// - `Unknown`: any other value
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IncrementStatus {
    #[serde(alias = "planning", alias = "backlog")]
    Planned,
    Active,
    Paused,
    #[serde(alias = "complete")]
    Completed,
    Abandoned,
    #[serde(other)]
    Unknown,
}

impl IncrementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
            Self::Unknown => "unknown",
        }
    }

    /// Work that is still in flight and preserved by default.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::Active | Self::Paused)
    }

    /// Rank used when choosing which duplicate copy to keep.
    pub fn priority(&self) -> u8 {
        match self {
            Self::Active => 5,
            Self::Completed => 4,
            Self::Paused => 3,
            Self::Planned => 2,
            Self::Abandoned => 1,
            Self::Unknown => 0,
        }
    }
}

/// External tracker the increment is mirrored to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncProvider {
    Github,
    Jira,
    Ado,
}

impl SyncProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Jira => "jira",
            Self::Ado => "ado",
        }
    }
}

impl std::fmt::Display for SyncProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// GitHub issue linkage. Open unless `closed` is true.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GithubSync {
    #[serde(default)]
    pub issue: Option<serde_json::Value>,
    #[serde(default)]
    pub closed: Option<bool>,
}

/// Jira issue linkage. Open unless `status` is exactly `Done`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct JiraSync {
    #[serde(default)]
    pub status: Option<String>,
}

/// Azure DevOps work item linkage. Open unless `state` is exactly `Closed`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AdoSync {
    #[serde(default)]
    pub state: Option<String>,
}

/// The subset of `metadata.json` the archive engine consumes.
///
/// Unknown fields are ignored; every field is optional since metadata is
/// written by several collaborators over the life of an increment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IncrementMetadata {
    #[serde(default)]
    pub status: Option<IncrementStatus>,
    #[serde(default)]
    pub last_activity: Option<String>,
    #[serde(default)]
    pub github: Option<GithubSync>,
    #[serde(default)]
    pub jira: Option<JiraSync>,
    #[serde(default)]
    pub ado: Option<AdoSync>,
}

impl IncrementMetadata {
    /// `lastActivity` as a timestamp. Unparseable values are treated as absent.
    pub fn last_activity_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.last_activity.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// The first external provider still reporting the increment as open.
    pub fn open_external_sync(&self) -> Option<SyncProvider> {
        if let Some(github) = &self.github {
            if github.closed != Some(true) {
                return Some(SyncProvider::Github);
            }
        }
        if let Some(jira) = &self.jira {
            if jira.status.as_deref() != Some("Done") {
                return Some(SyncProvider::Jira);
            }
        }
        if let Some(ado) = &self.ado {
            if ado.state.as_deref() != Some("Closed") {
                return Some(SyncProvider::Ado);
            }
        }
        None
    }
}
