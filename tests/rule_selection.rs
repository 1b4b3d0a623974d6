use std::collections::BTreeSet;

use rulebook_core::config::SelectorConfig;
use rulebook_core::graph::RuleGraph;
use rulebook_core::rule::{parse, RuleId, RuleRecord};
use rulebook_core::selection::{KeywordOverlapScorer, RuleSelector};
use rulebook_core::types::{
    ExclusionReason, InclusionReason, SelectionRequest, SelectionResult, SelectionWarning,
};

fn id(s: &str) -> RuleId {
    RuleId::parse(s).unwrap()
}

fn make_rule(rule_id: &str, budget: usize, depends: &[&str], keywords: &[&str], tier: &str) -> RuleRecord {
    let depends = if depends.is_empty() {
        "None".to_string()
    } else {
        depends.join(", ")
    };
    let text = format!(
        "**RuleID:** {rule_id}\n**TokenBudget:** {budget}\n**ContextTier:** {tier}\n**Keywords:** {}\n**Depends:** {depends}\n---\nBody of {rule_id}.\n",
        keywords.join(", ")
    );
    parse(&text).unwrap()
}

fn id_strs(result: &SelectionResult) -> Vec<&str> {
    result.rules.iter().map(|r| r.id.as_str()).collect()
}

fn abc_graph() -> RuleGraph {
    RuleGraph::build(vec![
        make_rule("a", 1000, &[], &[], "Medium"),
        make_rule("b", 800, &["a"], &[], "Medium"),
        make_rule("c", 500, &[], &[], "Medium"),
    ])
    .unwrap()
}

fn sql_graph() -> RuleGraph {
    RuleGraph::build(vec![
        make_rule("core", 300, &[], &["sql"], "High"),
        make_rule("dbt", 400, &["core"], &["sql", "dbt"], "Medium"),
        make_rule("streams", 500, &["core"], &["sql", "streams"], "Medium"),
        make_rule("ts", 200, &[], &["typescript"], "Low"),
    ])
    .unwrap()
}

fn unmatched_selector() -> RuleSelector<KeywordOverlapScorer> {
    RuleSelector::new(
        KeywordOverlapScorer,
        SelectorConfig {
            include_unmatched: true,
        },
    )
}

/// Guarantees every result must hold, whatever the request.
fn assert_well_formed(graph: &RuleGraph, result: &SelectionResult) {
    let mut seen: BTreeSet<&RuleId> = BTreeSet::new();
    for rule in &result.rules {
        let record = graph.get(&rule.id).unwrap();
        for dep in &record.depends_on {
            assert!(seen.contains(dep), "{dep} must precede {}", rule.id);
        }
        assert!(seen.insert(&rule.id), "duplicate {}", rule.id);
    }

    let total: usize = result.rules.iter().map(|r| r.tokens).sum();
    assert_eq!(total, result.selection.tokens_used);
    if total > result.selection.max_budget {
        assert!(result.has_budget_overage(), "overage without warning");
    }
    assert_eq!(result.selection.rules_selected, result.rules.len());

    let excluded: BTreeSet<&RuleId> = result.excluded.iter().map(|e| &e.id).collect();
    assert_eq!(excluded.len(), result.excluded.len(), "rule excluded twice");
}

#[test]
fn explicit_rule_loads_its_dependencies_first() {
    let graph = abc_graph();
    let selector = RuleSelector::default();
    let request = SelectionRequest::new(2000).with_explicit_id(id("b"));

    let result = selector.select(&graph, &request);

    assert_eq!(id_strs(&result), vec!["a", "b"]);
    assert_eq!(result.selection.tokens_used, 1800);
    assert!(result.excluded.is_empty());
    assert!(result.warnings.is_empty());
    assert_eq!(
        result.rules[0].reason,
        InclusionReason::Dependency { required_by: id("b") }
    );
    assert_eq!(result.rules[1].reason, InclusionReason::Explicit);
    assert_well_formed(&graph, &result);
}

#[test]
fn unmatched_rule_is_excluded_when_budget_runs_out() {
    let graph = abc_graph();
    let request = SelectionRequest::new(2000).with_explicit_id(id("b"));

    let result = unmatched_selector().select(&graph, &request);

    assert_eq!(id_strs(&result), vec!["a", "b"]);
    let excluded: Vec<&str> = result.excluded_ids().iter().map(|i| i.as_str()).collect();
    assert_eq!(excluded, vec!["c"]);
    assert_eq!(result.excluded[0].reason, ExclusionReason::BudgetExhausted);
    assert_eq!(result.excluded[0].required_tokens, 500);
    assert_eq!(result.selection.rules_excluded_by_budget, 1);
    assert_well_formed(&graph, &result);
}

#[test]
fn oversized_explicit_closure_is_loaded_in_full_with_warning() {
    let graph = abc_graph();
    let selector = RuleSelector::default();
    let request = SelectionRequest::new(500).with_explicit_id(id("b"));

    let result = selector.select(&graph, &request);

    assert_eq!(id_strs(&result), vec!["a", "b"]);
    assert_eq!(result.selection.tokens_used, 1800);
    assert_eq!(
        result.warnings,
        vec![SelectionWarning::BudgetExceededByMandatory {
            id: id("b"),
            closure_tokens: 1800,
            max_budget: 500,
        }]
    );
    assert_well_formed(&graph, &result);
}

#[test]
fn only_one_explicit_closure_may_overflow() {
    let graph = RuleGraph::build(vec![
        make_rule("big1", 1000, &[], &[], "Medium"),
        make_rule("big2", 1000, &[], &[], "Medium"),
    ])
    .unwrap();
    let request = SelectionRequest::new(500)
        .with_explicit_id(id("big2"))
        .with_explicit_id(id("big1"));

    let result = RuleSelector::default().select(&graph, &request);

    assert_eq!(id_strs(&result), vec!["big1"]);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.excluded[0].id, id("big2"));
    assert_eq!(result.excluded[0].reason, ExclusionReason::BudgetExhausted);
    assert_well_formed(&graph, &result);
}

#[test]
fn explicit_chain_that_no_longer_fits_is_excluded_whole() {
    let graph = RuleGraph::build(vec![
        make_rule("first", 400, &[], &[], "Medium"),
        make_rule("shared", 100, &[], &[], "Medium"),
        make_rule("second", 300, &["shared"], &[], "Medium"),
    ])
    .unwrap();
    let request = SelectionRequest::new(600)
        .with_explicit_id(id("first"))
        .with_explicit_id(id("second"));

    let result = RuleSelector::default().select(&graph, &request);

    assert_eq!(id_strs(&result), vec!["first"]);
    assert!(result.warnings.is_empty());
    assert_eq!(result.excluded.len(), 1);
    assert_eq!(result.excluded[0].id, id("second"));
    assert_eq!(result.excluded[0].required_tokens, 400);
    assert_eq!(result.excluded[0].unmet_dependencies, vec![id("shared")]);
    assert_well_formed(&graph, &result);
}

#[test]
fn explicit_dependency_of_earlier_explicit_is_marked_explicit() {
    // "app" sorts before its own dependency, so "zlib" is first pulled in as a dependency
    let graph = RuleGraph::build(vec![
        make_rule("app", 10, &["zlib"], &[], "Medium"),
        make_rule("zlib", 10, &[], &[], "Medium"),
    ])
    .unwrap();
    let request = SelectionRequest::new(5000)
        .with_explicit_id(id("zlib"))
        .with_explicit_id(id("app"));

    let result = RuleSelector::default().select(&graph, &request);

    assert_eq!(id_strs(&result), vec!["zlib", "app"]);
    assert!(result.rules.iter().all(|r| r.reason == InclusionReason::Explicit));
    assert_eq!(result.selection.tokens_used, 20);
}

#[test]
fn greedy_fill_by_relevance() {
    let graph = sql_graph();
    let selector = RuleSelector::default();
    let request = SelectionRequest::from_query("SQL dbt", 1000);

    let result = selector.select(&graph, &request);

    assert_eq!(id_strs(&result), vec!["core", "dbt"]);
    assert_eq!(result.selection.tokens_used, 700);
    assert_eq!(result.excluded_ids(), vec![&id("streams")]);
    assert_eq!(result.rules[0].reason, InclusionReason::Dependency { required_by: id("dbt") });
    assert_eq!(result.rules[1].reason, InclusionReason::Relevance);
    assert_eq!(result.rules[1].score, 2);
    assert_eq!(result.rules[1].why.matched_keywords, vec!["dbt", "sql"]);
    assert_well_formed(&graph, &result);

    let roomy = selector.select(&graph, &SelectionRequest::from_query("sql dbt", 1200));
    assert_eq!(id_strs(&roomy), vec!["core", "dbt", "streams"]);
    assert!(roomy.excluded.is_empty());
    assert_well_formed(&graph, &roomy);
}

#[test]
fn candidate_whose_dependencies_do_not_fit_is_dropped_with_them() {
    let graph = RuleGraph::build(vec![
        make_rule("base", 900, &[], &[], "Medium"),
        make_rule("leaf", 100, &["base"], &["htmx"], "Medium"),
    ])
    .unwrap();

    let result = RuleSelector::default().select(&graph, &SelectionRequest::from_query("htmx", 500));

    assert!(result.rules.is_empty());
    assert_eq!(result.excluded.len(), 1);
    assert_eq!(result.excluded[0].id, id("leaf"));
    assert_eq!(result.excluded[0].required_tokens, 1000);
    assert_eq!(result.excluded[0].unmet_dependencies, vec![id("base")]);
}

#[test]
fn tier_breaks_score_ties() {
    let graph = RuleGraph::build(vec![
        make_rule("alpha", 500, &[], &["naming"], "Low"),
        make_rule("zeta", 500, &[], &["naming"], "High"),
    ])
    .unwrap();

    let result = RuleSelector::default().select(&graph, &SelectionRequest::from_query("naming", 500));

    assert_eq!(id_strs(&result), vec!["zeta"]);
    assert_eq!(result.excluded_ids(), vec![&id("alpha")]);
}

#[test]
fn id_breaks_full_ties() {
    let graph = RuleGraph::build(vec![
        make_rule("zeta", 500, &[], &["naming"], "Medium"),
        make_rule("alpha", 500, &[], &["naming"], "Medium"),
    ])
    .unwrap();

    let result = RuleSelector::default().select(&graph, &SelectionRequest::from_query("naming", 500));

    assert_eq!(id_strs(&result), vec!["alpha"]);
    assert_eq!(result.excluded_ids(), vec![&id("zeta")]);
}

#[test]
fn unknown_explicit_id_is_reported_not_fatal() {
    let graph = abc_graph();
    let request = SelectionRequest::new(2000)
        .with_explicit_id(id("nope"))
        .with_explicit_id(id("c"));

    let result = RuleSelector::default().select(&graph, &request);

    assert_eq!(id_strs(&result), vec!["c"]);
    assert_eq!(result.excluded[0].id, id("nope"));
    assert_eq!(result.excluded[0].reason, ExclusionReason::Unavailable);
    assert_eq!(
        result.warnings,
        vec![SelectionWarning::UnavailableRule { id: id("nope") }]
    );
    assert_eq!(result.selection.rules_excluded_by_budget, 0);
}

#[test]
fn empty_request_or_corpus_yields_empty_result() {
    let selector = RuleSelector::default();

    let result = selector.select(&abc_graph(), &SelectionRequest::new(1000));
    assert!(result.rules.is_empty());
    assert!(result.excluded.is_empty());
    assert!(result.warnings.is_empty());
    assert_eq!(result.selection.rules_considered, 3);

    let empty = RuleGraph::build(Vec::new()).unwrap();
    let result = selector.select(&empty, &SelectionRequest::from_query("sql", 1000));
    assert!(result.rules.is_empty());
    assert!(result.warnings.is_empty());
    assert_eq!(result.selection.rules_considered, 0);
}

#[test]
fn no_keyword_matches_selects_nothing_by_default() {
    let result = RuleSelector::default().select(&sql_graph(), &SelectionRequest::from_query("kotlin", 10_000));
    assert!(result.rules.is_empty());
    assert!(result.excluded.is_empty());
}

#[test]
fn budget_is_respected_across_budgets() {
    let graph = sql_graph();
    let selector = unmatched_selector();

    for budget in [0, 100, 300, 499, 700, 900, 1200, 1400, 5000] {
        let request = SelectionRequest::from_query("sql streams typescript", budget);
        let result = selector.select(&graph, &request);
        assert!(result.selection.tokens_used <= budget, "budget {budget}");
        assert!(result.warnings.is_empty());
        assert_well_formed(&graph, &result);
    }
}

#[test]
fn zero_budget_excludes_everything_matched() {
    let result = RuleSelector::default().select(&sql_graph(), &SelectionRequest::from_query("sql", 0));
    assert!(result.rules.is_empty());
    assert_eq!(result.selection.tokens_used, 0);
    assert_eq!(result.selection.rules_excluded_by_budget, 3);
}

#[test]
fn excluded_explicit_rule_is_not_retried_as_candidate() {
    let graph = RuleGraph::build(vec![
        make_rule("a", 600, &[], &["sql"], "Medium"),
        make_rule("b", 500, &[], &["sql"], "Medium"),
    ])
    .unwrap();
    let request = SelectionRequest::from_query("sql", 1000)
        .with_explicit_id(id("a"))
        .with_explicit_id(id("b"));

    let result = RuleSelector::default().select(&graph, &request);

    assert_eq!(id_strs(&result), vec!["a"]);
    assert_eq!(result.excluded_ids(), vec![&id("b")]);
    assert_eq!(result.selection.rules_excluded_by_budget, 1);
    assert_well_formed(&graph, &result);
}

#[test]
fn huge_token_budget_never_fits_a_finite_budget() {
    let graph = RuleGraph::build(vec![
        make_rule("huge", usize::MAX, &[], &["sql"], "Medium"),
        make_rule("small", 2, &["huge"], &["sql"], "Medium"),
        make_rule("lone", 5, &[], &["sql"], "Low"),
    ])
    .unwrap();

    let result = RuleSelector::default().select(&graph, &SelectionRequest::from_query("sql", 1000));

    assert_eq!(id_strs(&result), vec!["lone"]);
    assert_eq!(result.selection.tokens_used, 5);
    let excluded: Vec<&str> = result.excluded_ids().iter().map(|i| i.as_str()).collect();
    assert_eq!(excluded, vec!["huge", "small"]);
    assert_eq!(result.excluded[1].required_tokens, usize::MAX);
    assert!(result.warnings.is_empty());
}

#[test]
fn huge_explicit_closure_is_flagged_not_wrapped() {
    let graph = RuleGraph::build(vec![
        make_rule("huge", usize::MAX, &[], &[], "Medium"),
        make_rule("small", 2, &["huge"], &[], "Medium"),
    ])
    .unwrap();

    let result = RuleSelector::default().select(&graph, &SelectionRequest::new(1000).with_explicit_id(id("small")));

    assert_eq!(id_strs(&result), vec!["huge", "small"]);
    assert_eq!(result.selection.tokens_used, usize::MAX);
    assert_eq!(
        result.warnings,
        vec![SelectionWarning::BudgetExceededByMandatory {
            id: id("small"),
            closure_tokens: usize::MAX,
            max_budget: 1000,
        }]
    );
}

#[test]
fn multi_word_keyword_matches_whitespace_split_query() {
    let graph = RuleGraph::build(vec![
        make_rule("naming", 100, &[], &["naming hygiene", "style"], "Medium"),
        make_rule("other", 100, &[], &["hygiene"], "Medium"),
    ])
    .unwrap();

    let result = RuleSelector::default().select(&graph, &SelectionRequest::from_query("Naming hygiene tips", 1000));

    assert_eq!(id_strs(&result), vec!["naming", "other"]);
    assert_eq!(result.rules[0].why.matched_keywords, vec!["naming hygiene"]);
    assert_eq!(result.rules[0].score, 1);

    let partial = RuleSelector::default().select(&graph, &SelectionRequest::from_query("naming", 1000));
    assert!(partial.rules.is_empty());
}
