use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::identifiers::ContentHash;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Content must be valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Raw rule text as handed over by a content source, before header parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDocument {
    pub source: String,
    pub hash: ContentHash,
    pub content: String,
}

impl RuleDocument {
    /// Ingest raw bytes into a RuleDocument.
    ///
    /// Validates UTF-8 and computes the content hash over the verified text.
    pub fn ingest(source: impl Into<String>, raw_content: Vec<u8>) -> Result<Self, DocumentError> {
        let content = String::from_utf8(raw_content)?;
        Ok(Self::from_text(source, content))
    }

    pub fn from_text(source: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        let hash = ContentHash::from_content(content.as_bytes());

        RuleDocument {
            source: source.into(),
            hash,
            content,
        }
    }
}
