use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier parsing failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("Invalid increment name '{0}': expected NNNN-slug")]
    IncrementName(String),

    #[error("Invalid increment number '{0}'")]
    IncrementNumber(String),

    #[error("Invalid feature id '{0}': expected FS-NNN")]
    Feature(String),

    #[error("Invalid epic id '{0}': expected EPIC-N")]
    Epic(String),
}

/// The numeric part of an increment name, e.g. `41` for `0041-foo`.
///
/// Displays zero-padded to four digits. Ordering is numeric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IncrementNumber(pub u32);

impl IncrementNumber {
    /// Parse the leading decimal digits of `s`. Accepts `41`, `0041`, and `0041-foo`.
    pub fn parse_prefix(s: &str) -> Option<Self> {
        let digits: &str = &s[..s.bytes().take_while(u8::is_ascii_digit).count()];
        if digits.is_empty() {
            return None;
        }
        digits.parse().ok().map(Self)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for IncrementNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

impl FromStr for IncrementNumber {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(IdError::IncrementNumber(s.to_string()));
        }
        trimmed
            .parse()
            .map(Self)
            .map_err(|_| IdError::IncrementNumber(s.to_string()))
    }
}

/// An increment directory name: `{NNNN}-{slug}`.
///
/// The number is the sort key; the slug is free text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IncrementName {
    raw: String,
    number: IncrementNumber,
}

impl IncrementName {
    pub fn parse(name: &str) -> Result<Self, IdError> {
        let digit_count = name.bytes().take_while(u8::is_ascii_digit).count();
        let rest = &name[digit_count..];
        let valid = digit_count > 0 && rest.starts_with('-') && rest.len() > 1;
        if !valid {
            return Err(IdError::IncrementName(name.to_string()));
        }
        let number = IncrementNumber::parse_prefix(name)
            .ok_or_else(|| IdError::IncrementName(name.to_string()))?;
        Ok(Self {
            raw: name.to_string(),
            number,
        })
    }

    pub fn number(&self) -> IncrementNumber {
        self.number
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The feature id inferred from the numeric prefix, `0041-foo` → `FS-041`.
    pub fn inferred_feature(&self) -> FeatureId {
        FeatureId::for_increment(self.number)
    }
}

impl Ord for IncrementName {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.number
            .cmp(&other.number)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for IncrementName {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for IncrementName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for IncrementName {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for IncrementName {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<IncrementName> for String {
    fn from(value: IncrementName) -> Self {
        value.raw
    }
}

/// A feature identifier, `FS-` followed by digits (canonically three).
///
/// The string form is kept verbatim since it is matched textually against
/// directory names, frontmatter and links.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FeatureId(String);

impl FeatureId {
    pub const PREFIX: &'static str = "FS-";

    pub fn parse(s: &str) -> Result<Self, IdError> {
        let digits = s
            .strip_prefix(Self::PREFIX)
            .ok_or_else(|| IdError::Feature(s.to_string()))?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(IdError::Feature(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    pub fn for_increment(number: IncrementNumber) -> Self {
        Self(format!("{}{:03}", Self::PREFIX, number.value()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for FeatureId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FeatureId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FeatureId> for String {
    fn from(value: FeatureId) -> Self {
        value.0
    }
}

/// An epic identifier, `EPIC-` followed by a non-empty suffix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EpicId(String);

impl EpicId {
    pub const PREFIX: &'static str = "EPIC-";

    pub fn parse(s: &str) -> Result<Self, IdError> {
        let suffix = s
            .strip_prefix(Self::PREFIX)
            .ok_or_else(|| IdError::Epic(s.to_string()))?;
        let valid = !suffix.is_empty()
            && suffix
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if !valid {
            return Err(IdError::Epic(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EpicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EpicId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for EpicId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EpicId> for String {
    fn from(value: EpicId) -> Self {
        value.0
    }
}

/// A project subtree under `specs/` (any directory not starting with `_`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub String);

impl ProjectId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Directories under `specs/` starting with `_` are shared trees, not projects.
    pub fn is_project_dir(name: &str) -> bool {
        !name.is_empty() && !name.starts_with('_') && !name.starts_with('.')
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
