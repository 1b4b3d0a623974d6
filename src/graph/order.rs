use std::collections::{BTreeMap, BTreeSet};

use crate::rule::RuleRecord;
use crate::types::identifiers::RuleId;

/// Every rule reachable from `root` through hard dependencies, `root` included.
pub(crate) fn closure_set<'a>(
    rules: &'a BTreeMap<RuleId, RuleRecord>,
    root: &'a RuleId,
) -> BTreeSet<&'a RuleId> {
    let mut included: BTreeSet<&RuleId> = BTreeSet::new();
    let mut stack = vec![root];

    while let Some(cur) = stack.pop() {
        if !included.insert(cur) {
            continue;
        }
        let Some(record) = rules.get(cur) else {
            continue;
        };
        for dep in &record.depends_on {
            if !included.contains(dep) {
                stack.push(dep);
            }
        }
    }

    included
}

/// Kahn's algorithm over `subset`, dependencies first. Ties are broken by
/// lexical id order. Dependencies outside `subset` are not constraints.
pub(crate) fn topological<'a>(
    rules: &'a BTreeMap<RuleId, RuleRecord>,
    subset: &BTreeSet<&'a RuleId>,
) -> Vec<RuleId> {
    let mut in_degree: BTreeMap<&RuleId, usize> = BTreeMap::new();
    let mut reverse: BTreeMap<&RuleId, BTreeSet<&RuleId>> = BTreeMap::new();

    for &id in subset {
        let deps: BTreeSet<&RuleId> = rules
            .get(id)
            .map(|r| r.depends_on.iter().filter(|d| subset.contains(d)).collect())
            .unwrap_or_default();
        in_degree.insert(id, deps.len());
        for dep in deps {
            reverse.entry(dep).or_default().insert(id);
        }
    }

    let mut queue: BTreeSet<&RuleId> = in_degree
        .iter()
        .filter(|(_, deg)| **deg == 0)
        .map(|(id, _)| *id)
        .collect();

    let mut ordered: Vec<RuleId> = Vec::with_capacity(subset.len());
    while let Some(first) = queue.pop_first() {
        ordered.push(first.clone());
        let Some(dependents) = reverse.get(first) else {
            continue;
        };
        for dependent in dependents {
            let Some(deg) = in_degree.get_mut(dependent) else {
                continue;
            };
            *deg = deg.saturating_sub(1);
            if *deg == 0 {
                queue.insert(*dependent);
            }
        }
    }

    debug_assert_eq!(ordered.len(), subset.len(), "topological order over a cyclic subset");

    ordered
}
