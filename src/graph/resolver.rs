use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tracing::{debug, warn};

use super::cycles::find_cycles;
use super::order::{closure_set, topological};
use crate::rule::RuleRecord;
use crate::types::identifiers::RuleId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("Rule {0} depends on unknown rule {1}")]
    UnknownDependency(RuleId, RuleId),
    #[error("Cyclic dependency: {}", join_path(.0))]
    CyclicDependency(Vec<RuleId>),
    #[error("Duplicate rule id: {0}")]
    DuplicateRule(RuleId),
    #[error("Unknown rule: {0}")]
    UnknownRule(RuleId),
}

fn join_path(path: &[RuleId]) -> String {
    let mut parts: Vec<&str> = path.iter().map(RuleId::as_str).collect();
    if let Some(first) = path.first() {
        parts.push(first.as_str());
    }
    parts.join(" -> ")
}

/// Outcome of a tolerant graph build.
#[derive(Debug, Clone)]
pub struct GraphBuild {
    /// Usable part of the corpus.
    pub graph: RuleGraph,
    /// Root causes, in a deterministic order.
    pub errors: Vec<ResolveError>,
    /// Defective rules and every rule that transitively depends on one.
    pub quarantined: BTreeSet<RuleId>,
}

/// The corpus as a directed acyclic graph over `dependsOn` edges.
///
/// Built once per corpus snapshot and never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct RuleGraph {
    rules: BTreeMap<RuleId, RuleRecord>,
    dependents: BTreeMap<RuleId, BTreeSet<RuleId>>,
}

impl RuleGraph {
    /// Strict build: any duplicate, unknown dependency, or cycle fails the
    /// whole graph. A cycle is reported ahead of any other defect.
    pub fn build(records: impl IntoIterator<Item = RuleRecord>) -> Result<Self, ResolveError> {
        let GraphBuild { graph, mut errors, .. } = Self::build_partial(records);
        if errors.is_empty() {
            return Ok(graph);
        }
        let first = errors
            .iter()
            .position(|err| matches!(err, ResolveError::CyclicDependency(_)))
            .unwrap_or(0);
        Err(errors.swap_remove(first))
    }

    /// Tolerant build: defective rules are quarantined together with their
    /// dependents, the rest of the corpus stays usable.
    pub fn build_partial(records: impl IntoIterator<Item = RuleRecord>) -> GraphBuild {
        let mut errors = Vec::new();

        // 1. Index by id, first occurrence wins
        let mut rules: BTreeMap<RuleId, RuleRecord> = BTreeMap::new();
        for record in records {
            if rules.contains_key(&record.id) {
                warn!(rule = %record.id, "duplicate rule id, keeping first occurrence");
                errors.push(ResolveError::DuplicateRule(record.id.clone()));
                continue;
            }
            rules.insert(record.id.clone(), record);
        }

        // 2. Unknown dependencies
        let mut defective: BTreeSet<RuleId> = BTreeSet::new();
        for (id, record) in &rules {
            for dep in &record.depends_on {
                if !rules.contains_key(dep) {
                    errors.push(ResolveError::UnknownDependency(id.clone(), dep.clone()));
                    defective.insert(id.clone());
                }
            }
        }

        // 3. Cycles
        for cycle in find_cycles(&rules) {
            defective.extend(cycle.iter().cloned());
            errors.push(ResolveError::CyclicDependency(cycle));
        }

        // 4. Quarantine defects and everything above them
        let reverse = reverse_edges(&rules);
        let mut quarantined: BTreeSet<RuleId> = BTreeSet::new();
        let mut stack: Vec<RuleId> = defective.into_iter().collect();
        while let Some(cur) = stack.pop() {
            if !quarantined.insert(cur.clone()) {
                continue;
            }
            if let Some(above) = reverse.get(&cur) {
                stack.extend(above.iter().filter(|id| !quarantined.contains(*id)).cloned());
            }
        }

        for id in &quarantined {
            rules.remove(id);
        }

        if !quarantined.is_empty() {
            warn!(
                quarantined = quarantined.len(),
                errors = errors.len(),
                "rule graph built with quarantined rules"
            );
        }

        let dependents = reverse_edges(&rules);
        debug!(rules = rules.len(), "rule graph built");

        GraphBuild {
            graph: RuleGraph { rules, dependents },
            errors,
            quarantined,
        }
    }

    pub fn get(&self, id: &RuleId) -> Option<&RuleRecord> {
        self.rules.get(id)
    }

    pub fn contains(&self, id: &RuleId) -> bool {
        self.rules.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules in id order.
    pub fn rules(&self) -> impl Iterator<Item = &RuleRecord> {
        self.rules.values()
    }

    /// Load order for `id`: its full dependency closure, dependencies before
    /// dependents, `id` itself last.
    pub fn transitive_closure(&self, id: &RuleId) -> Result<Vec<RuleId>, ResolveError> {
        let (root, _) = self
            .rules
            .get_key_value(id)
            .ok_or_else(|| ResolveError::UnknownRule(id.clone()))?;

        let subset = closure_set(&self.rules, root);
        Ok(topological(&self.rules, &subset))
    }

    /// Summed token budget of `id`'s full closure.
    pub fn closure_tokens(&self, id: &RuleId) -> Result<usize, ResolveError> {
        let (root, _) = self
            .rules
            .get_key_value(id)
            .ok_or_else(|| ResolveError::UnknownRule(id.clone()))?;

        Ok(closure_set(&self.rules, root)
            .into_iter()
            .filter_map(|dep| self.rules.get(dep))
            .map(|r| r.token_budget)
            .fold(0, usize::saturating_add))
    }

    /// Rules that directly depend on `id`.
    pub fn dependents(&self, id: &RuleId) -> Result<BTreeSet<RuleId>, ResolveError> {
        if !self.contains(id) {
            return Err(ResolveError::UnknownRule(id.clone()));
        }
        Ok(self.dependents.get(id).cloned().unwrap_or_default())
    }

    /// Every rule affected by a change to `id`.
    pub fn transitive_dependents(&self, id: &RuleId) -> Result<BTreeSet<RuleId>, ResolveError> {
        let mut affected = BTreeSet::new();
        let mut stack: Vec<&RuleId> = self.dependents(id).map(|_| vec![id])?;

        while let Some(cur) = stack.pop() {
            let Some(above) = self.dependents.get(cur) else {
                continue;
            };
            for dependent in above {
                if affected.insert(dependent.clone()) {
                    stack.push(dependent);
                }
            }
        }

        Ok(affected)
    }

    /// Load order for the whole corpus.
    pub fn load_order(&self) -> Vec<RuleId> {
        let all: BTreeSet<&RuleId> = self.rules.keys().collect();
        topological(&self.rules, &all)
    }
}

fn reverse_edges(rules: &BTreeMap<RuleId, RuleRecord>) -> BTreeMap<RuleId, BTreeSet<RuleId>> {
    let mut reverse: BTreeMap<RuleId, BTreeSet<RuleId>> = BTreeMap::new();
    for (id, record) in rules {
        for dep in &record.depends_on {
            if rules.contains_key(dep) {
                reverse.entry(dep.clone()).or_default().insert(id.clone());
            }
        }
    }
    reverse
}
