use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::info;

use super::snapshot::CorpusSnapshot;
use super::source::{ContentSource, SourceError};
use crate::config::CorpusConfig;
use crate::rule::RuleDocument;
use crate::selection::{RelevanceScorer, RuleSelector};
use crate::types::selection::{SelectionRequest, SelectionResult};

/// Process-wide holder of the current corpus snapshot.
///
/// Readers take an `Arc` to whichever snapshot is current and keep it for as
/// long as they need; a reload never touches a published snapshot. Reloads
/// are serialized, and the write lock is held only for the pointer swap.
#[derive(Debug)]
pub struct CorpusStore {
    config: CorpusConfig,
    current: RwLock<Arc<CorpusSnapshot>>,
    reload_lock: Mutex<()>,
}

impl CorpusStore {
    pub fn new(config: CorpusConfig) -> Self {
        let empty = CorpusSnapshot::empty(&config);
        Self {
            config,
            current: RwLock::new(Arc::new(empty)),
            reload_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &CorpusConfig {
        &self.config
    }

    pub fn snapshot(&self) -> Arc<CorpusSnapshot> {
        self.current.read().clone()
    }

    pub fn generation(&self) -> u64 {
        self.current.read().generation()
    }

    /// Load everything from `source` and publish it as the next generation.
    /// On a source error the current snapshot stays in place.
    #[tracing::instrument(skip_all)]
    pub fn reload(&self, source: &dyn ContentSource) -> Result<Arc<CorpusSnapshot>, SourceError> {
        let _guard = self.reload_lock.lock();
        let entries = source.load()?;
        let generation = self.generation() + 1;
        let snapshot = CorpusSnapshot::from_entries(entries, &self.config, generation);
        Ok(self.publish(snapshot))
    }

    /// Publish already-ingested documents as the next generation.
    pub fn reload_documents(&self, documents: Vec<RuleDocument>) -> Arc<CorpusSnapshot> {
        let _guard = self.reload_lock.lock();
        let generation = self.generation() + 1;
        let snapshot = CorpusSnapshot::build(documents, &self.config, generation);
        self.publish(snapshot)
    }

    /// Select against the snapshot current at call time.
    pub fn select<S: RelevanceScorer>(
        &self,
        selector: &RuleSelector<S>,
        request: &SelectionRequest,
    ) -> SelectionResult {
        self.snapshot().select(selector, request)
    }

    fn publish(&self, snapshot: CorpusSnapshot) -> Arc<CorpusSnapshot> {
        let snapshot = Arc::new(snapshot);
        *self.current.write() = Arc::clone(&snapshot);
        info!(generation = snapshot.generation(), "corpus snapshot published");
        snapshot
    }
}
