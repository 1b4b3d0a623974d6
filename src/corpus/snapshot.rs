// An immutable, versioned view of the corpus.
// no mutation
// no "update" methods
// reload builds a new snapshot

use std::collections::BTreeSet;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use super::manifest::{corpus_version, CorpusManifest, ManifestRuleEntry};
use super::source::SourceEntry;
use crate::config::CorpusConfig;
use crate::graph::{GraphBuild, ResolveError, RuleGraph};
use crate::rule::{parse_document, DocumentError, ParseError, RuleDocument};
use crate::selection::{ApproxTokenCounter, RelevanceScorer, RuleSelector, TokenCounter};
use crate::types::identifiers::RuleId;
use crate::types::selection::{SelectionRequest, SelectionResult};

#[derive(Debug, Error)]
pub enum RejectReason {
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// A document that did not become a rule. Skipped, never fatal.
#[derive(Debug)]
pub struct RejectedDocument {
    pub source: String,
    pub reason: RejectReason,
}

/// Declared `tokenBudget` smaller than the body's estimated size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetDrift {
    pub id: RuleId,
    pub declared: usize,
    pub estimated: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    Rejected,
    Resolve,
    Quarantined,
    BudgetDrift,
}

/// Flat, serializable report line: what went wrong and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusDiagnostic {
    pub kind: DiagnosticKind,
    pub source: Option<String>,
    pub rule: Option<RuleId>,
    pub message: String,
}

#[derive(Debug)]
pub struct CorpusSnapshot {
    generation: u64,
    graph: RuleGraph,
    manifest: CorpusManifest,
    rejected: Vec<RejectedDocument>,
    resolve_errors: Vec<ResolveError>,
    quarantined: BTreeSet<RuleId>,
    budget_drift: Vec<BudgetDrift>,
}

impl CorpusSnapshot {
    /// The snapshot a store starts from before its first load.
    pub fn empty(config: &CorpusConfig) -> Self {
        Self::build(Vec::new(), config, 0)
    }

    /// Ingest raw entries, then build. UTF-8 failures are rejected, not fatal.
    pub fn from_entries(entries: Vec<SourceEntry>, config: &CorpusConfig, generation: u64) -> Self {
        let mut documents = Vec::with_capacity(entries.len());
        let mut rejected = Vec::new();

        for entry in entries {
            match RuleDocument::ingest(entry.source.clone(), entry.bytes) {
                Ok(doc) => documents.push(doc),
                Err(err) => rejected.push(RejectedDocument {
                    source: entry.source,
                    reason: err.into(),
                }),
            }
        }

        let mut snapshot = Self::build(documents, config, generation);
        rejected.append(&mut snapshot.rejected);
        rejected.sort_by(|a, b| a.source.cmp(&b.source));
        snapshot.rejected = rejected;
        snapshot
    }

    /// Parse every document, resolve the graph, and freeze the result.
    pub fn build(documents: Vec<RuleDocument>, config: &CorpusConfig, generation: u64) -> Self {
        // 1. Sort by source to ensure determinism
        let mut documents = documents;
        documents.sort_by(|a, b| a.source.cmp(&b.source));

        // 2. Parse; malformed rules are skipped and reported
        let mut records = Vec::with_capacity(documents.len());
        let mut rejected = Vec::new();
        for doc in &documents {
            match parse_document(doc, config.id_fallback) {
                Ok(record) => records.push(record),
                Err(err) => {
                    warn!(source = %doc.source, error = %err, "skipping malformed rule");
                    rejected.push(RejectedDocument {
                        source: doc.source.clone(),
                        reason: err.into(),
                    });
                }
            }
        }

        // 3. Resolve; defective components are quarantined
        let GraphBuild {
            graph,
            errors: resolve_errors,
            quarantined,
        } = RuleGraph::build_partial(records);

        for err in &resolve_errors {
            warn!(error = %err, "corpus dependency defect");
        }

        // 4. Token budget sanity against the body size
        let counter = ApproxTokenCounter;
        let budget_drift: Vec<BudgetDrift> = graph
            .rules()
            .filter_map(|r| {
                let estimated = counter.count_tokens(&r.body);
                (estimated > r.token_budget).then(|| BudgetDrift {
                    id: r.id.clone(),
                    declared: r.token_budget,
                    estimated,
                })
            })
            .collect();

        // 5. Manifest
        let manifest = CorpusManifest {
            corpus_version: corpus_version(config, &documents),
            build_config: config.clone(),
            built_at: Utc::now(),
            generation,
            rule_count: graph.len(),
            rules: graph.rules().map(ManifestRuleEntry::from_record).collect(),
        };

        info!(
            generation,
            rules = graph.len(),
            rejected = rejected.len(),
            quarantined = quarantined.len(),
            corpus_version = %manifest.corpus_version,
            "corpus snapshot built"
        );

        CorpusSnapshot {
            generation,
            graph,
            manifest,
            rejected,
            resolve_errors,
            quarantined,
            budget_drift,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn graph(&self) -> &RuleGraph {
        &self.graph
    }

    pub fn manifest(&self) -> &CorpusManifest {
        &self.manifest
    }

    pub fn rejected(&self) -> &[RejectedDocument] {
        &self.rejected
    }

    pub fn resolve_errors(&self) -> &[ResolveError] {
        &self.resolve_errors
    }

    pub fn quarantined(&self) -> &BTreeSet<RuleId> {
        &self.quarantined
    }

    pub fn budget_drift(&self) -> &[BudgetDrift] {
        &self.budget_drift
    }

    /// Run a selection against this snapshot, stamping its generation.
    pub fn select<S: RelevanceScorer>(
        &self,
        selector: &RuleSelector<S>,
        request: &SelectionRequest,
    ) -> SelectionResult {
        let mut result = selector.select(&self.graph, request);
        result.selection.generation = self.generation;
        result
    }

    /// Rules whose `lastUpdated` is older than `max_age_days`.
    pub fn stale_rules(&self, today: NaiveDate, max_age_days: i64) -> Vec<&RuleId> {
        self.graph
            .rules()
            .filter(|r| r.is_stale(today, max_age_days))
            .map(|r| &r.id)
            .collect()
    }

    /// Every problem found while building, as structured report lines.
    pub fn diagnostics(&self) -> Vec<CorpusDiagnostic> {
        let mut out = Vec::new();

        for rejected in &self.rejected {
            out.push(CorpusDiagnostic {
                kind: DiagnosticKind::Rejected,
                source: Some(rejected.source.clone()),
                rule: None,
                message: rejected.reason.to_string(),
            });
        }

        for err in &self.resolve_errors {
            let rule = match err {
                ResolveError::UnknownDependency(from, _) => Some(from.clone()),
                ResolveError::CyclicDependency(path) => path.first().cloned(),
                ResolveError::DuplicateRule(id) | ResolveError::UnknownRule(id) => Some(id.clone()),
            };
            out.push(CorpusDiagnostic {
                kind: DiagnosticKind::Resolve,
                source: None,
                rule,
                message: err.to_string(),
            });
        }

        for id in &self.quarantined {
            out.push(CorpusDiagnostic {
                kind: DiagnosticKind::Quarantined,
                source: None,
                rule: Some(id.clone()),
                message: "excluded from all selections".to_string(),
            });
        }

        for drift in &self.budget_drift {
            out.push(CorpusDiagnostic {
                kind: DiagnosticKind::BudgetDrift,
                source: None,
                rule: Some(drift.id.clone()),
                message: format!(
                    "declared tokenBudget {} is below the estimated {}",
                    drift.declared, drift.estimated
                ),
            });
        }

        out
    }
}
