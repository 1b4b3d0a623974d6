use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::graph::RuleGraph;
use crate::types::identifiers::RuleId;
use crate::types::selection::{ExcludedRule, ExclusionReason, InclusionReason, SelectionWarning};

pub struct BudgetResult {
    /// Accepted rules in load order.
    pub accepted: Vec<(RuleId, InclusionReason)>,
    pub excluded: Vec<ExcludedRule>,
    pub warnings: Vec<SelectionWarning>,
    pub tokens_used: usize,
}

/// Greedy, closure-aware budget accounting.
///
/// A rule is only ever accepted together with every dependency not yet
/// loaded, appended in its closure's topological order, so the accepted
/// sequence is a valid global load order at every step.
pub struct BudgetPlan<'g> {
    graph: &'g RuleGraph,
    max_budget: usize,
    tokens_used: usize,
    accepted: Vec<(RuleId, InclusionReason)>,
    position: BTreeMap<RuleId, usize>,
    excluded: Vec<ExcludedRule>,
    /// Heads already excluded by budget; each is reported once.
    rejected: BTreeSet<RuleId>,
    warnings: Vec<SelectionWarning>,
    overage_granted: bool,
}

impl<'g> BudgetPlan<'g> {
    pub fn new(graph: &'g RuleGraph, max_budget: usize) -> Self {
        Self {
            graph,
            max_budget,
            tokens_used: 0,
            accepted: Vec::new(),
            position: BTreeMap::new(),
            excluded: Vec::new(),
            rejected: BTreeSet::new(),
            warnings: Vec::new(),
            overage_granted: false,
        }
    }

    pub fn is_accepted(&self, id: &RuleId) -> bool {
        self.position.contains_key(id)
    }

    /// Mandatory admission. The first explicit closure that cannot fit even
    /// into an empty budget is loaded in full with a warning; any other chain
    /// that does not fit is excluded as a whole.
    pub fn admit_explicit(&mut self, id: &RuleId) {
        if let Some(&pos) = self.position.get(id) {
            // Already pulled in as a dependency of an earlier explicit rule
            self.accepted[pos].1 = InclusionReason::Explicit;
            return;
        }

        let Some((unmet, cost)) = self.unmet(id) else {
            self.excluded.push(ExcludedRule {
                id: id.clone(),
                reason: ExclusionReason::Unavailable,
                required_tokens: 0,
                unmet_dependencies: Vec::new(),
            });
            self.warnings
                .push(SelectionWarning::UnavailableRule { id: id.clone() });
            return;
        };

        if self.fits(cost) {
            self.accept(id, unmet, cost, InclusionReason::Explicit);
            return;
        }

        let closure_tokens = self.graph.closure_tokens(id).unwrap_or(cost);
        if !self.overage_granted && closure_tokens > self.max_budget {
            debug!(
                rule = %id,
                closure_tokens,
                max_budget = self.max_budget,
                "explicit closure exceeds budget, loading in full"
            );
            self.overage_granted = true;
            self.warnings.push(SelectionWarning::BudgetExceededByMandatory {
                id: id.clone(),
                closure_tokens,
                max_budget: self.max_budget,
            });
            self.accept(id, unmet, cost, InclusionReason::Explicit);
            return;
        }

        self.exclude(id, unmet, cost);
    }

    /// Optional admission, used for relevance-ranked candidates.
    pub fn admit_candidate(&mut self, id: &RuleId) {
        if self.is_accepted(id) || self.rejected.contains(id) {
            return;
        }
        let Some((unmet, cost)) = self.unmet(id) else {
            return;
        };

        if self.fits(cost) {
            self.accept(id, unmet, cost, InclusionReason::Relevance);
        } else {
            self.exclude(id, unmet, cost);
        }
    }

    pub fn finish(self) -> BudgetResult {
        BudgetResult {
            accepted: self.accepted,
            excluded: self.excluded,
            warnings: self.warnings,
            tokens_used: self.tokens_used,
        }
    }

    fn fits(&self, cost: usize) -> bool {
        self.tokens_used
            .checked_add(cost)
            .map_or(false, |total| total <= self.max_budget)
    }

    /// Closure members not yet accepted, in load order, and their summed cost.
    fn unmet(&self, id: &RuleId) -> Option<(Vec<RuleId>, usize)> {
        let closure = self.graph.transitive_closure(id).ok()?;
        let unmet: Vec<RuleId> = closure
            .into_iter()
            .filter(|dep| !self.is_accepted(dep))
            .collect();
        let cost: usize = unmet
            .iter()
            .filter_map(|dep| self.graph.get(dep))
            .map(|r| r.token_budget)
            .fold(0, usize::saturating_add);
        Some((unmet, cost))
    }

    fn accept(&mut self, head: &RuleId, unmet: Vec<RuleId>, cost: usize, reason: InclusionReason) {
        for dep in unmet {
            let dep_reason = if &dep == head {
                reason.clone()
            } else {
                InclusionReason::Dependency {
                    required_by: head.clone(),
                }
            };
            self.position.insert(dep.clone(), self.accepted.len());
            self.accepted.push((dep, dep_reason));
        }
        self.tokens_used = self.tokens_used.saturating_add(cost);
    }

    fn exclude(&mut self, head: &RuleId, unmet: Vec<RuleId>, cost: usize) {
        self.rejected.insert(head.clone());
        let unmet_dependencies = unmet.into_iter().filter(|dep| dep != head).collect();
        self.excluded.push(ExcludedRule {
            id: head.clone(),
            reason: ExclusionReason::BudgetExhausted,
            required_tokens: cost,
            unmet_dependencies,
        });
    }
}
