use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::rule::RuleRecord;
use crate::types::selection::{ScoreDetails, ScoredRule, SelectionRequest};

pub trait RelevanceScorer {
    fn score(&self, rule: &RuleRecord, request: &SelectionRequest) -> ScoreDetails;

    fn score_value(&self, details: &ScoreDetails) -> usize {
        details.matched_keywords.len()
    }
}

/// v0: number of rule keywords the request matches.
///
/// A multi-word rule keyword (`naming hygiene`) matches when every one of
/// its words is a request keyword, so whitespace-split queries still reach it.
#[derive(Default)]
pub struct KeywordOverlapScorer;

impl RelevanceScorer for KeywordOverlapScorer {
    fn score(&self, rule: &RuleRecord, request: &SelectionRequest) -> ScoreDetails {
        // Both sets are lowercased at construction; BTreeSet iteration keeps
        // matched_keywords sorted.
        let matched_keywords = rule
            .keywords
            .iter()
            .filter(|k| keyword_matches(k, &request.keywords))
            .cloned()
            .collect();

        ScoreDetails { matched_keywords }
    }
}

fn keyword_matches(keyword: &str, requested: &BTreeSet<String>) -> bool {
    requested.contains(keyword)
        || (keyword.contains(char::is_whitespace)
            && keyword.split_whitespace().all(|word| requested.contains(word)))
}

/// Relevance order: score desc, then tier (High first), then id asc.
pub fn relevance_order(a: &ScoredRule<'_>, b: &ScoredRule<'_>) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| b.record.context_tier.cmp(&a.record.context_tier))
        .then_with(|| a.record.id.cmp(&b.record.id))
}

pub trait TokenCounter {
    fn count_tokens(&self, content: &str) -> usize;
}

/// v0: Approximate GPT-style tokenization
/// tokens(content) := ceil(len(content) / 4)
#[derive(Default)]
pub struct ApproxTokenCounter;

impl TokenCounter for ApproxTokenCounter {
    fn count_tokens(&self, content: &str) -> usize {
        content.len().div_ceil(4)
    }
}
