use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::rule::{ContextTier, RuleRecord};
use crate::types::identifiers::RuleId;

/// The sole externally-facing request shape.
///
/// Normalization rules:
/// - Keywords are lowercased and trimmed; empty keywords are dropped
/// - Explicit ids go through `RuleId` normalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRequest {
    pub keywords: BTreeSet<String>,
    pub explicit_ids: BTreeSet<RuleId>,
    pub max_budget: usize,
}

impl SelectionRequest {
    pub fn new(max_budget: usize) -> Self {
        Self {
            keywords: BTreeSet::new(),
            explicit_ids: BTreeSet::new(),
            max_budget,
        }
    }

    /// Build a keyword request from free text: lowercase, split on whitespace.
    /// Multi-word rule keywords match when all of their words are present.
    pub fn from_query(raw: &str, max_budget: usize) -> Self {
        Self::new(max_budget).with_keywords(raw.split_whitespace())
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for keyword in keywords {
            let keyword = keyword.as_ref().trim().to_lowercase();
            if !keyword.is_empty() {
                self.keywords.insert(keyword);
            }
        }
        self
    }

    pub fn with_explicit_id(mut self, id: RuleId) -> Self {
        self.explicit_ids.insert(id);
        self
    }

    /// True when the request names neither keywords nor explicit ids.
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty() && self.explicit_ids.is_empty()
    }
}

/// Why a rule ended up in the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InclusionReason {
    Explicit,
    Dependency { required_by: RuleId },
    Relevance,
}

/// A selected rule returned in the output.
/// Fully self-contained and serializable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedRule {
    pub id: RuleId,
    pub version: Option<String>,
    /// Owned because it is part of the final output payload
    pub body: String,

    pub tokens: usize,
    pub score: usize,
    pub tier: ContextTier,

    pub reason: InclusionReason,
    pub why: SelectionWhy,
}

/// Explanation for why a rule received its score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionWhy {
    pub matched_keywords: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// Adding the rule and its unmet dependencies would exceed the budget.
    BudgetExhausted,
    /// Explicitly requested, but unknown or quarantined in this snapshot.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludedRule {
    pub id: RuleId,
    pub reason: ExclusionReason,
    /// Tokens the rule would have added, unmet dependencies included.
    pub required_tokens: usize,
    /// Dependencies that were not loaded yet and were dropped with it.
    pub unmet_dependencies: Vec<RuleId>,
}

/// Non-fatal conditions attached to a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectionWarning {
    BudgetExceededByMandatory {
        id: RuleId,
        closure_tokens: usize,
        max_budget: usize,
    },
    UnavailableRule {
        id: RuleId,
    },
}

/// Metadata describing the outcome of the selection process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionMetadata {
    pub generation: u64,
    pub keywords: Vec<String>,
    pub explicit_ids: Vec<RuleId>,
    pub max_budget: usize,

    pub tokens_used: usize,

    pub rules_considered: usize,
    pub rules_selected: usize,
    pub rules_excluded_by_budget: usize,
}

/// The final result of a selection. Rules are in load order: every rule
/// appears after all of its dependencies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult {
    pub rules: Vec<SelectedRule>,
    pub excluded: Vec<ExcludedRule>,
    pub warnings: Vec<SelectionWarning>,
    pub selection: SelectionMetadata,
}

impl SelectionResult {
    pub fn ids(&self) -> Vec<&RuleId> {
        self.rules.iter().map(|r| &r.id).collect()
    }

    pub fn excluded_ids(&self) -> Vec<&RuleId> {
        self.excluded.iter().map(|r| &r.id).collect()
    }

    pub fn has_budget_overage(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, SelectionWarning::BudgetExceededByMandatory { .. }))
    }
}

/// Internal: a rule that has been scored but not yet selected.
/// Holds a reference to the record to avoid cloning bodies prematurely.
#[derive(Debug, Clone)]
pub struct ScoredRule<'a> {
    pub record: &'a RuleRecord,
    pub score: usize,
    pub details: ScoreDetails,
}

/// Internal: scoring components before serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreDetails {
    pub matched_keywords: Vec<String>,
}
