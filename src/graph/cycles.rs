use std::collections::{BTreeMap, BTreeSet};

use crate::rule::RuleRecord;
use crate::types::identifiers::RuleId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

/// Depth-first search with an explicit recursion stack. Every back edge
/// yields the cycle sitting on the stack, rotated to start at its smallest
/// id. Edges to unknown rules are ignored here.
pub(crate) fn find_cycles(rules: &BTreeMap<RuleId, RuleRecord>) -> Vec<Vec<RuleId>> {
    let mut marks: BTreeMap<&RuleId, Mark> = rules.keys().map(|id| (id, Mark::Unvisited)).collect();
    let mut cycles: BTreeSet<Vec<RuleId>> = BTreeSet::new();

    for root in rules.keys() {
        if marks.get(root).copied() != Some(Mark::Unvisited) {
            continue;
        }

        let mut stack: Vec<(&RuleId, usize)> = vec![(root, 0)];
        marks.insert(root, Mark::OnStack);

        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            let deps = &rules[node].depends_on;

            if frame.1 >= deps.len() {
                marks.insert(node, Mark::Done);
                stack.pop();
                continue;
            }

            let dep = &deps[frame.1];
            frame.1 += 1;

            let Some((dep_key, _)) = rules.get_key_value(dep) else {
                continue;
            };

            match marks.get(dep_key).copied().unwrap_or(Mark::Done) {
                Mark::Unvisited => {
                    marks.insert(dep_key, Mark::OnStack);
                    stack.push((dep_key, 0));
                }
                Mark::OnStack => {
                    let start = stack
                        .iter()
                        .position(|(id, _)| *id == dep_key)
                        .unwrap_or(0);
                    let cycle: Vec<RuleId> = stack[start..].iter().map(|(id, _)| (*id).clone()).collect();
                    cycles.insert(rotate_to_min(cycle));
                }
                Mark::Done => {}
            }
        }
    }

    cycles.into_iter().collect()
}

fn rotate_to_min(mut cycle: Vec<RuleId>) -> Vec<RuleId> {
    let min = cycle
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.cmp(b.1))
        .map(|(i, _)| i)
        .unwrap_or(0);
    cycle.rotate_left(min);
    cycle
}
