use serde::{Deserialize, Serialize};

/// One rewritten markdown link target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LinkUpdate {
    /// Path of the rewritten file, as walked from the repository root.
    pub file: String,
    pub old_link: String,
    pub new_link: String,
    /// 1-based.
    pub line_number: usize,
}
