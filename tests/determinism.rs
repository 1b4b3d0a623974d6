use rulebook_core::config::CorpusConfig;
use rulebook_core::corpus::CorpusSnapshot;
use rulebook_core::rule::{RuleDocument, RuleId};
use rulebook_core::selection::RuleSelector;
use rulebook_core::types::{
    ExcludedRule, ExclusionReason, SelectionMetadata, SelectionRequest, SelectionResult,
    SelectionWarning,
};

fn make_doc(source: &str, header: &str, body: &str) -> RuleDocument {
    RuleDocument::from_text(source, format!("{header}\n---\n\n{body}\n"))
}

fn corpus() -> Vec<RuleDocument> {
    vec![
        make_doc(
            "b.md",
            "**RuleID:** b\n**Version:** 2.0\n**TokenBudget:** 20\n**Keywords:** sql, dbt\n**Depends:** a",
            "Body of b.",
        ),
        make_doc(
            "a.md",
            "**RuleID:** a\n**Version:** 1.0\n**TokenBudget:** 10\n**ContextTier:** High\n**Keywords:** sql",
            "Body of a.",
        ),
    ]
}

fn strip_ws(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

#[test]
fn selection_is_idempotent() {
    let snapshot = CorpusSnapshot::build(corpus(), &CorpusConfig::v0(), 1);
    let selector = RuleSelector::default();
    let request = SelectionRequest::from_query("sql dbt", 25).with_explicit_id(RuleId::parse("a").unwrap());

    let first = snapshot.select(&selector, &request);
    let second = snapshot.select(&selector, &request);

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string_pretty(&first).unwrap(),
        serde_json::to_string_pretty(&second).unwrap()
    );
}

#[test]
fn input_order_does_not_change_the_result() {
    let mut reversed = corpus();
    reversed.reverse();

    let selector = RuleSelector::default();
    let request = SelectionRequest::from_query("dbt", 100);

    let one = CorpusSnapshot::build(corpus(), &CorpusConfig::v0(), 1).select(&selector, &request);
    let two = CorpusSnapshot::build(reversed, &CorpusConfig::v0(), 1).select(&selector, &request);

    assert_eq!(
        serde_json::to_string(&one).unwrap(),
        serde_json::to_string(&two).unwrap()
    );
}

#[test]
fn golden_end_to_end_selection() {
    let snapshot = CorpusSnapshot::build(corpus(), &CorpusConfig::v0(), 1);
    let result = snapshot.select(&RuleSelector::default(), &SelectionRequest::from_query("dbt", 100));

    let expected = r#"{
  "rules": [
    {
      "id": "a",
      "version": "1.0",
      "body": "Body of a.",
      "tokens": 10,
      "score": 0,
      "tier": "High",
      "reason": {
        "kind": "dependency",
        "required_by": "b"
      },
      "why": {
        "matched_keywords": []
      }
    },
    {
      "id": "b",
      "version": "2.0",
      "body": "Body of b.",
      "tokens": 20,
      "score": 1,
      "tier": "Medium",
      "reason": {
        "kind": "relevance"
      },
      "why": {
        "matched_keywords": [
          "dbt"
        ]
      }
    }
  ],
  "excluded": [],
  "warnings": [],
  "selection": {
    "generation": 1,
    "keywords": [
      "dbt"
    ],
    "explicit_ids": [],
    "max_budget": 100,
    "tokens_used": 30,
    "rules_considered": 2,
    "rules_selected": 2,
    "rules_excluded_by_budget": 0
  }
}"#;

    let json = serde_json::to_string_pretty(&result).unwrap();
    assert_eq!(strip_ws(&json), strip_ws(expected), "Golden snapshot mismatch");
}

#[test]
fn golden_exclusion_and_warning_serialization() {
    let result = SelectionResult {
        rules: Vec::new(),
        excluded: vec![ExcludedRule {
            id: RuleId::parse("leaf").unwrap(),
            reason: ExclusionReason::BudgetExhausted,
            required_tokens: 1000,
            unmet_dependencies: vec![RuleId::parse("base").unwrap()],
        }],
        warnings: vec![
            SelectionWarning::BudgetExceededByMandatory {
                id: RuleId::parse("big").unwrap(),
                closure_tokens: 1800,
                max_budget: 500,
            },
            SelectionWarning::UnavailableRule {
                id: RuleId::parse("ghost").unwrap(),
            },
        ],
        selection: SelectionMetadata {
            generation: 7,
            keywords: vec!["htmx".to_string()],
            explicit_ids: vec![RuleId::parse("big").unwrap()],
            max_budget: 500,
            tokens_used: 0,
            rules_considered: 12,
            rules_selected: 0,
            rules_excluded_by_budget: 1,
        },
    };

    const EXPECTED_JSON: &str = r#"{
      "rules": [],
      "excluded": [
        {
          "id": "leaf",
          "reason": "budget_exhausted",
          "required_tokens": 1000,
          "unmet_dependencies": ["base"]
        }
      ],
      "warnings": [
        {
          "kind": "budget_exceeded_by_mandatory",
          "id": "big",
          "closure_tokens": 1800,
          "max_budget": 500
        },
        {
          "kind": "unavailable_rule",
          "id": "ghost"
        }
      ],
      "selection": {
        "generation": 7,
        "keywords": ["htmx"],
        "explicit_ids": ["big"],
        "max_budget": 500,
        "tokens_used": 0,
        "rules_considered": 12,
        "rules_selected": 0,
        "rules_excluded_by_budget": 1
      }
    }"#;

    let json = serde_json::to_string_pretty(&result).unwrap();
    assert_eq!(strip_ws(&json), strip_ws(EXPECTED_JSON), "JSON structure mismatch against golden snapshot");

    let roundtrip: SelectionResult = serde_json::from_str(&json).unwrap();
    assert_eq!(roundtrip, result);
}

#[test]
fn corpus_version_is_stable_and_content_sensitive() {
    let config = CorpusConfig::v0();

    let one = CorpusSnapshot::build(corpus(), &config, 1);
    let two = CorpusSnapshot::build(corpus(), &config, 9);
    assert_eq!(one.manifest().corpus_version, two.manifest().corpus_version);

    let mut changed = corpus();
    changed[0] = make_doc(
        "b.md",
        "**RuleID:** b\n**Version:** 2.1\n**TokenBudget:** 20\n**Depends:** a",
        "Body of b.",
    );
    let three = CorpusSnapshot::build(changed, &config, 1);
    assert_ne!(one.manifest().corpus_version, three.manifest().corpus_version);

    assert!(one.manifest().corpus_version.starts_with("sha256:"));
    assert_eq!(one.manifest().rule_count, 2);
    let ids: Vec<&str> = one.manifest().rules.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}
