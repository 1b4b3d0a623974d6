use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Stable identifier of a rule, unique across a corpus.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleIdError {
    #[error("Rule id is empty")]
    Empty,
    #[error("Rule id contains whitespace or a separator: {0:?}")]
    InvalidCharacter(String),
    #[error("Source path has no usable file stem")]
    NoFileStem,
    #[error("Path involves invalid UTF-8")]
    InvalidUtf8,
}

impl RuleId {
    /// Parse a rule id as written in a header or dependency list.
    pub fn parse(raw: &str) -> Result<Self, RuleIdError> {
        let normalized = normalize_id(raw);

        if normalized.is_empty() {
            return Err(RuleIdError::Empty);
        }
        if normalized
            .chars()
            .any(|c| c.is_whitespace() || c == ',' || c == ';')
        {
            return Err(RuleIdError::InvalidCharacter(normalized));
        }

        Ok(RuleId(normalized))
    }

    /// Derive an id from a document source path (its file stem).
    pub fn from_source(source: &Path) -> Result<Self, RuleIdError> {
        let stem = source.file_stem().ok_or(RuleIdError::NoFileStem)?;
        let stem = stem.to_str().ok_or(RuleIdError::InvalidUtf8)?;
        Self::parse(stem)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize an id: trim, drop backticks, drop a trailing `.md`, lowercase.
fn normalize_id(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('`').trim();
    let lowered = trimmed.to_lowercase();

    match lowered.strip_suffix(".md") {
        Some(stripped) => stripped.to_string(),
        None => lowered,
    }
}

/// Content hash of a raw rule document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn from_content(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);

        let hash = hasher.finalize();
        let hex = hex::encode(hash);

        ContentHash(format!("sha256:{hex}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
