use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::metadata::Metadata;
use crate::types::identifiers::{ContentHash, RuleId};

/// Priority label used to break relevance ties.
///
/// Declaration order gives the total ordering: `High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum ContextTier {
    Low,
    #[default]
    Medium,
    High,
}

impl ContextTier {
    /// Reads the first word of a tier value, case-insensitively.
    /// `"High (always load)"` is `High`.
    pub fn parse(raw: &str) -> Option<Self> {
        let word: String = raw
            .trim()
            .chars()
            .take_while(|c| c.is_alphabetic())
            .collect::<String>()
            .to_lowercase();

        match word.as_str() {
            "high" => Some(ContextTier::High),
            "medium" => Some(ContextTier::Medium),
            "low" => Some(ContextTier::Low),
            _ => None,
        }
    }
}

impl fmt::Display for ContextTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ContextTier::High => "High",
            ContextTier::Medium => "Medium",
            ContextTier::Low => "Low",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Closely,
    Sometimes,
    Complementary,
}

/// A soft link between rules. Never force-loaded and never part of ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Relation {
    pub kind: RelationKind,
    pub target: RuleId,
}

/// One parsed rule document. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub id: RuleId,
    pub version: Option<String>,
    pub last_updated: Option<NaiveDate>,
    pub token_budget: usize,
    pub context_tier: ContextTier,
    pub keywords: BTreeSet<String>,
    /// Hard dependencies, in declaration order.
    pub depends_on: Vec<RuleId>,
    pub related: Vec<Relation>,
    pub extra: Metadata,
    pub body: String,
    pub content_hash: ContentHash,
    pub source: Option<String>,
}

impl RuleRecord {
    pub fn related_of(&self, kind: RelationKind) -> impl Iterator<Item = &RuleId> {
        self.related
            .iter()
            .filter(move |r| r.kind == kind)
            .map(|r| &r.target)
    }

    /// A rule with no `lastUpdated` date is never reported stale.
    pub fn is_stale(&self, today: NaiveDate, max_age_days: i64) -> bool {
        match self.last_updated {
            Some(updated) => (today - updated).num_days() > max_age_days,
            None => false,
        }
    }
}
