use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::CorpusConfig;
use crate::rule::{ContextTier, RuleDocument, RuleRecord};
use crate::types::identifiers::{ContentHash, RuleId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRuleEntry {
    pub id: RuleId,
    pub content_hash: ContentHash,
    pub token_budget: usize,
    pub context_tier: ContextTier,
    pub depends_on: Vec<RuleId>,
}

impl ManifestRuleEntry {
    pub fn from_record(record: &RuleRecord) -> Self {
        Self {
            id: record.id.clone(),
            content_hash: record.content_hash.clone(),
            token_budget: record.token_budget,
            context_tier: record.context_tier,
            depends_on: record.depends_on.clone(),
        }
    }
}

/// Describes one corpus snapshot. Everything except `built_at` is a pure
/// function of the config and the ingested documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusManifest {
    pub corpus_version: String,
    pub build_config: CorpusConfig,
    pub built_at: DateTime<Utc>, // informational only
    pub generation: u64,
    pub rule_count: usize,
    pub rules: Vec<ManifestRuleEntry>,
}

/// `sha256` over the config JSON followed by sorted `source:content_hash`
/// lines, one per ingested document.
pub fn corpus_version(config: &CorpusConfig, documents: &[RuleDocument]) -> String {
    let mut hasher = Sha256::new();

    // CorpusConfig holds only strings and unit enums; serialization cannot fail
    let config_json = serde_json::to_vec(config).unwrap_or_default();
    hasher.update(&config_json);

    let mut lines: Vec<String> = documents
        .iter()
        .map(|doc| format!("{}:{}", doc.source, doc.hash.as_str()))
        .collect();
    lines.sort();

    for line in lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }

    format!("sha256:{}", hex::encode(hasher.finalize()))
}
