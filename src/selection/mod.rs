pub mod budgeting;
pub mod ranking;

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::SelectorConfig;
use crate::graph::RuleGraph;
use crate::types::identifiers::RuleId;
use crate::types::selection::{
	ExclusionReason, ScoreDetails, ScoredRule, SelectedRule, SelectionMetadata, SelectionRequest,
	SelectionResult, SelectionWhy,
};
pub use budgeting::{BudgetPlan, BudgetResult};
pub use ranking::{
	relevance_order, ApproxTokenCounter, KeywordOverlapScorer, RelevanceScorer, TokenCounter,
};

pub struct RuleSelector<S> {
	scorer: S,
	config: SelectorConfig,
}

impl Default for RuleSelector<KeywordOverlapScorer> {
	fn default() -> Self {
		Self {
			scorer: KeywordOverlapScorer,
			config: SelectorConfig::v0(),
		}
	}
}

impl<S> RuleSelector<S>
where
	S: RelevanceScorer,
{
	pub fn new(scorer: S, config: SelectorConfig) -> Self {
		Self { scorer, config }
	}

	pub fn config(&self) -> &SelectorConfig {
		&self.config
	}

	/// Select an ordered, deduplicated set of rules for `request`.
	///
	/// Never fails: unknown ids and budget overruns are reported through
	/// `excluded` and `warnings`.
	#[tracing::instrument(
		skip_all,
		fields(
			keywords = request.keywords.len(),
			explicit = request.explicit_ids.len(),
			max_budget = request.max_budget,
		)
	)]
	pub fn select(&self, graph: &RuleGraph, request: &SelectionRequest) -> SelectionResult {
		if request.is_empty() {
			return empty_result(graph, request);
		}

		// 1. Scoring Phase
		let mut scored: Vec<ScoredRule> = graph
			.rules()
			.map(|record| {
				let details = self.scorer.score(record, request);
				let score = self.scorer.score_value(&details);
				ScoredRule {
					record,
					score,
					details,
				}
			})
			.collect();

		// 2. Ordering Phase
		scored.sort_by(relevance_order);

		debug_assert!(scored
			.windows(2)
			.all(|w| relevance_order(&w[0], &w[1]).is_lt()));

		// 3. Budgeting Phase: explicit closures first, in id order
		let mut plan = BudgetPlan::new(graph, request.max_budget);
		for id in &request.explicit_ids {
			plan.admit_explicit(id);
		}

		for candidate in &scored {
			if candidate.score == 0 && !self.config.include_unmatched {
				continue;
			}
			plan.admit_candidate(&candidate.record.id);
		}

		let BudgetResult {
			accepted,
			excluded,
			warnings,
			tokens_used,
		} = plan.finish();

		// 4. Assemble in load order
		let details: BTreeMap<&RuleId, &ScoredRule> =
			scored.iter().map(|s| (&s.record.id, s)).collect();

		let rules: Vec<SelectedRule> = accepted
			.into_iter()
			.filter_map(|(id, reason)| {
				let entry = details.get(&id)?;
				let record = entry.record;
				Some(SelectedRule {
					id,
					version: record.version.clone(),
					body: record.body.clone(),
					tokens: record.token_budget,
					score: entry.score,
					tier: record.context_tier,
					reason,
					why: why_of(&entry.details),
				})
			})
			.collect();

		let rules_excluded_by_budget = excluded
			.iter()
			.filter(|e| e.reason == ExclusionReason::BudgetExhausted)
			.count();

		debug!(
			selected = rules.len(),
			excluded = excluded.len(),
			tokens_used,
			"selection complete"
		);

		SelectionResult {
			selection: SelectionMetadata {
				generation: 0,
				keywords: request.keywords.iter().cloned().collect(),
				explicit_ids: request.explicit_ids.iter().cloned().collect(),
				max_budget: request.max_budget,
				tokens_used,
				rules_considered: graph.len(),
				rules_selected: rules.len(),
				rules_excluded_by_budget,
			},
			rules,
			excluded,
			warnings,
		}
	}
}

fn why_of(details: &ScoreDetails) -> SelectionWhy {
	SelectionWhy {
		matched_keywords: details.matched_keywords.clone(),
	}
}

fn empty_result(graph: &RuleGraph, request: &SelectionRequest) -> SelectionResult {
	SelectionResult {
		rules: Vec::new(),
		excluded: Vec::new(),
		warnings: Vec::new(),
		selection: SelectionMetadata {
			generation: 0,
			keywords: Vec::new(),
			explicit_ids: Vec::new(),
			max_budget: request.max_budget,
			tokens_used: 0,
			rules_considered: graph.len(),
			rules_selected: 0,
			rules_excluded_by_budget: 0,
		},
	}
}
