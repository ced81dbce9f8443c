use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use crate::analysis::analyzer::Analyzer;
use crate::core::config::EngineConfig;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::stats::{
    EngineStats, HealthCheck, HealthCheckResult, HealthStatus, IndexStats, StatsRecorder,
};
use crate::core::types::{DocId, Document, FieldValue};
use crate::index::inverted::InvertedIndex;
use crate::index::term_vector::TermVector;
use crate::parallel::indexer::ParallelIndexer;
use crate::query::ast::Query;
use crate::scoring::boost::{RecencyBoost, RelevanceBoost};
use crate::scoring::scorer::TfIdfScorer;
use crate::search::executor::{QueryPipeline, SearchContext};
use crate::search::results::SearchResults;
use crate::storage::document_store::DocumentStore;
use crate::storage::layout::StorageLayout;
use crate::storage::snapshot::Snapshot;

/// Store and index always change together under the write lock
struct IndexState {
    store: DocumentStore,
    index: InvertedIndex,
    /// Stored documents that failed analysis on the last restore or rebuild
    unindexable: BTreeSet<DocId>,
}

impl IndexState {
    /// Indexed ids the store no longer holds
    fn dangling_ids(&self) -> BTreeSet<DocId> {
        self.index
            .indexed_ids()
            .cloned()
            .chain(self.index.dangling_postings())
            .filter(|id| !self.store.contains(id))
            .collect()
    }

    fn inspect(&self) -> ConsistencyReport {
        ConsistencyReport {
            dangling_postings: self.dangling_ids(),
            missing_documents: self
                .store
                .ids()
                .filter(|id| self.index.term_vector(id).is_none() && !self.unindexable.contains(id))
                .cloned()
                .collect(),
            unindexable: self.unindexable.clone(),
            inconsistent_terms: self.index.inconsistent_terms(),
        }
    }
}

/// Outcome of a full index rebuild
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebuildReport {
    pub indexed: usize,
    /// Documents skipped because they could not be analyzed
    pub failed: usize,
    /// Ids referenced by the old index but absent from the store
    pub dangling_dropped: usize,
    pub elapsed_ms: u64,
}

/// Differences between the postings and the document store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub dangling_postings: BTreeSet<DocId>,
    /// Stored documents the index knows nothing about
    pub missing_documents: BTreeSet<DocId>,
    /// Stored documents the current configuration cannot analyze. They stay
    /// retrievable by id and do not count as inconsistencies.
    pub unindexable: BTreeSet<DocId>,
    pub inconsistent_terms: Vec<String>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.dangling_postings.is_empty()
            && self.missing_documents.is_empty()
            && self.inconsistent_terms.is_empty()
    }
}

/// In-process search engine over transcribed documents.
///
/// Queries share a read lock on the store and index. Mutations are
/// serialized by a writer mutex and apply under the write lock, after the
/// document has been validated and analyzed. A rebuild analyzes a copy of
/// the documents without holding the state lock and swaps the fresh index
/// in at the end.
pub struct SearchEngine {
    config: EngineConfig,
    analyzer: Analyzer,
    scorer: TfIdfScorer,
    recency: RecencyBoost,
    relevance: RelevanceBoost,
    layout: Option<StorageLayout>,
    state: RwLock<IndexState>,
    writer: Mutex<()>,
    save_lock: Mutex<()>,
    /// Set by every mutation, cleared by a successful snapshot
    dirty: AtomicBool,
    stats: StatsRecorder,
}

impl SearchEngine {
    /// Opens an engine. With a data directory the configuration is written
    /// to `meta/engine.json` and any existing document snapshot is loaded and
    /// indexed.
    pub fn open(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let layout = match &config.storage.data_dir {
            Some(dir) => {
                let layout = StorageLayout::new(dir)?;
                config.save(&layout.config_path())?;
                Some(layout)
            }
            None => None,
        };

        let engine = SearchEngine::assemble(config, layout);
        if let Some(layout) = &engine.layout {
            if let Some(snapshot) = Snapshot::load(layout)? {
                engine.restore(snapshot.documents);
            }
        }
        Ok(engine)
    }

    /// Reopens the engine persisted in `data_dir`, reusing its stored
    /// configuration when there is one
    pub fn open_dir(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let layout = StorageLayout::new(data_dir)?;
        let config_path = layout.config_path();

        let mut config = if config_path.exists() {
            EngineConfig::load(&config_path)?
        } else {
            EngineConfig::default()
        };
        config.storage.data_dir = Some(data_dir.to_path_buf());
        SearchEngine::open(config)
    }

    /// Engine with default settings and no persistence
    pub fn in_memory() -> Self {
        SearchEngine::assemble(EngineConfig::in_memory(), None)
    }

    fn assemble(config: EngineConfig, layout: Option<StorageLayout>) -> Self {
        let analyzer = Analyzer::from_config(&config.analyzer);
        let phonetic = &config.analyzer.phonetic;
        let index = if phonetic.enabled {
            InvertedIndex::with_phonetic(phonetic.algorithm, phonetic.use_bucket_index)
        } else {
            InvertedIndex::new()
        };

        SearchEngine {
            scorer: TfIdfScorer::new(config.schema.clone(), config.scoring.min_idf),
            recency: RecencyBoost::new(config.scoring.recency.clone()),
            relevance: RelevanceBoost::new(config.scoring.relevance.clone()),
            analyzer,
            layout,
            state: RwLock::new(IndexState {
                store: DocumentStore::new(),
                index,
                unindexable: BTreeSet::new(),
            }),
            writer: Mutex::new(()),
            save_lock: Mutex::new(()),
            dirty: AtomicBool::new(false),
            stats: StatsRecorder::default(),
            config,
        }
    }

    fn indexer(&self) -> ParallelIndexer<'_> {
        ParallelIndexer::new(&self.analyzer, &self.config.schema, self.config.analyzer.max_field_bytes)
    }

    /// Loads persisted documents. Documents that no longer analyze under the
    /// current configuration stay stored but unindexed.
    fn restore(&self, documents: Vec<Document>) {
        let batch = self.indexer().index_batch(&documents);
        let failed = batch.failures.len();
        self.stats.record_index_failures(failed);

        let _writer = self.writer.lock();
        let mut state = self.state.write();
        state.index.rebuild(batch.vectors);
        state.unindexable = batch.failures.into_iter().map(|(doc_id, _)| doc_id).collect();
        for doc in documents {
            state.store.restore(doc);
        }
        info!(documents = state.store.len(), failed, "document snapshot loaded");
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    fn term_vector(&self, doc: &Document) -> Result<TermVector> {
        TermVector::build(doc, &self.analyzer, &self.config.schema, self.config.analyzer.max_field_bytes)
    }

    /// Stores and indexes a document, returning its new id
    pub fn index_document(
        &self,
        index_name: &str,
        fields: BTreeMap<String, FieldValue>,
    ) -> Result<DocId> {
        let doc = DocumentStore::draft(index_name, fields)?;
        let vector = self.term_vector(&doc)?;
        let doc_id = doc.id.clone();

        {
            let _writer = self.writer.lock();
            let mut state = self.state.write();
            state.store.insert(doc);
            state.index.add_document(doc_id.clone(), vector);
        }
        self.dirty.store(true, Ordering::SeqCst);
        self.stats.record_indexed(1);
        debug!(doc_id = %doc_id, index = index_name, "document indexed");

        self.persist_on_write();
        Ok(doc_id)
    }

    /// Indexes a batch under one write lock. Any invalid document rejects
    /// the whole batch before anything is stored.
    pub fn index_documents(
        &self,
        index_name: &str,
        batch: Vec<BTreeMap<String, FieldValue>>,
    ) -> Result<Vec<DocId>> {
        let documents = batch
            .into_iter()
            .map(|fields| DocumentStore::draft(index_name, fields))
            .collect::<Result<Vec<_>>>()?;

        let analyzed = self.indexer().index_batch(&documents);
        if let Some((doc_id, err)) = analyzed.failures.into_iter().next() {
            return Err(Error::new(
                err.kind,
                format!("batch rejected, document {}: {}", doc_id, err.context),
            ));
        }

        let ids: Vec<DocId> = documents.iter().map(|doc| doc.id.clone()).collect();
        {
            let _writer = self.writer.lock();
            let mut state = self.state.write();
            for doc in documents {
                state.store.insert(doc);
            }
            for (doc_id, vector) in analyzed.vectors {
                state.index.add_document(doc_id, vector);
            }
        }
        if !ids.is_empty() {
            self.dirty.store(true, Ordering::SeqCst);
            self.stats.record_indexed(ids.len());
            info!(count = ids.len(), index = index_name, "batch indexed");
            self.persist_on_write();
        }
        Ok(ids)
    }

    /// Removes a document from the store and every posting list. Returns
    /// false when the id is unknown.
    pub fn delete_document(&self, doc_id: &DocId) -> bool {
        let removed = {
            let _writer = self.writer.lock();
            let mut state = self.state.write();
            let removed = state.store.remove(doc_id).is_some();
            state.index.remove_document(doc_id);
            state.unindexable.remove(doc_id);
            removed
        };
        if !removed {
            return false;
        }

        self.dirty.store(true, Ordering::SeqCst);
        self.stats.record_deleted();
        debug!(doc_id = %doc_id, "document deleted");
        self.persist_on_write();
        true
    }

    /// Runs a query against the current state. Invalid queries fail with
    /// `ErrorKind::Query` and slow ones with `ErrorKind::TimedOut`.
    pub fn search(&self, query: &Query) -> Result<SearchResults> {
        let started = Instant::now();
        let outcome = {
            let state = self.state.read();
            let ctx = SearchContext {
                store: &state.store,
                index: &state.index,
                analyzer: &self.analyzer,
                schema: &self.config.schema,
                scorer: &self.scorer,
                recency: &self.recency,
                relevance: &self.relevance,
                search: &self.config.search,
                suggest: &self.config.suggest,
            };
            QueryPipeline::new(ctx).execute(query)
        };

        match &outcome {
            Ok(results) => {
                let micros = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
                self.stats.record_query(micros, results.total_hits);
            }
            Err(err) => {
                self.stats.record_failed_query(err.kind == ErrorKind::TimedOut);
                debug!(error = %err, "query failed");
            }
        }
        outcome
    }

    pub fn get_document(&self, doc_id: &DocId) -> Option<Document> {
        self.state.read().store.get(doc_id).cloned()
    }

    pub fn document_count(&self) -> usize {
        self.state.read().store.len()
    }

    pub fn get_index_stats(&self, index_name: &str) -> IndexStats {
        let state = self.state.read();
        let terms: BTreeSet<&str> = state
            .store
            .iter()
            .filter(|doc| doc.index_name == index_name)
            .filter_map(|doc| state.index.term_vector(&doc.id))
            .flat_map(|vector| vector.terms())
            .collect();

        IndexStats {
            index_name: index_name.to_string(),
            document_count: state.store.count_in(index_name),
            term_count: terms.len(),
            last_update: state.store.last_update(index_name),
        }
    }

    /// Rebuilds the whole index from the stored documents, dropping any
    /// posting that references a document the store no longer holds.
    /// Queries keep running against the old index until the swap.
    pub fn rebuild(&self) -> RebuildReport {
        let started = Instant::now();
        let _writer = self.writer.lock();

        let (documents, mut fresh, dangling) = {
            let state = self.state.read();
            (state.store.to_vec(), state.index.empty_like(), state.dangling_ids())
        };

        let batch = self.indexer().index_batch(&documents);
        let failed = batch.failures.len();
        fresh.rebuild(batch.vectors);
        let indexed = fresh.document_count();

        {
            let mut state = self.state.write();
            state.index = fresh;
            state.unindexable = batch.failures.into_iter().map(|(doc_id, _)| doc_id).collect();
        }

        self.stats.record_index_failures(failed);
        self.stats.record_rebuild();
        if !dangling.is_empty() {
            warn!(count = dangling.len(), "dropped postings of documents missing from the store");
        }

        let report = RebuildReport {
            indexed,
            failed,
            dangling_dropped: dangling.len(),
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        info!(
            indexed = report.indexed,
            failed = report.failed,
            dangling_dropped = report.dangling_dropped,
            elapsed_ms = report.elapsed_ms,
            "index rebuilt"
        );
        report
    }

    /// Compares postings against the store without changing either.
    /// Problems are logged and counted; the next rebuild repairs them.
    pub fn check_consistency(&self) -> ConsistencyReport {
        let report = self.state.read().inspect();

        if !report.is_consistent() {
            let warnings = report.dangling_postings.len()
                + report.missing_documents.len()
                + report.inconsistent_terms.len();
            self.stats.record_consistency_warnings(warnings);
            warn!(
                dangling = report.dangling_postings.len(),
                missing = report.missing_documents.len(),
                terms = report.inconsistent_terms.len(),
                "index is out of step with the document store"
            );
        }
        report
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Writes the full document snapshot. On failure the engine stays dirty
    /// so the next save retries.
    pub fn persist(&self) -> Result<()> {
        let Some(layout) = &self.layout else {
            return Ok(());
        };
        let _saving = self.save_lock.lock();

        self.dirty.store(false, Ordering::SeqCst);
        let snapshot = Snapshot::new(self.state.read().store.to_vec());
        match snapshot.save(layout) {
            Ok(()) => {
                self.stats.record_save(true);
                debug!(documents = snapshot.documents.len(), "snapshot saved");
                Ok(())
            }
            Err(err) => {
                self.dirty.store(true, Ordering::SeqCst);
                self.stats.record_save(false);
                warn!(error = %err, "snapshot save failed");
                Err(err)
            }
        }
    }

    /// Saves only when something changed since the last snapshot
    pub fn save_if_dirty(&self) -> Result<bool> {
        if self.layout.is_none() || !self.is_dirty() {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    fn persist_on_write(&self) {
        if self.config.storage.persist_on_write && self.persist().is_err() {
            debug!("snapshot left for the next maintenance save");
        }
    }

    pub fn engine_stats(&self) -> EngineStats {
        let (documents, terms) = {
            let state = self.state.read();
            (state.store.len(), state.index.term_count())
        };
        self.stats.snapshot(documents, terms)
    }

    pub fn health_check(&self) -> HealthCheckResult {
        let mut checks = Vec::new();

        let started = Instant::now();
        let consistency = self.state.read().inspect();
        checks.push(HealthCheck {
            name: "index".to_string(),
            status: if consistency.is_consistent() {
                HealthStatus::Healthy
            } else {
                HealthStatus::Degraded("index disagrees with the document store".to_string())
            },
            message: Some(format!(
                "{} dangling, {} unindexed, {} unindexable",
                consistency.dangling_postings.len(),
                consistency.missing_documents.len(),
                consistency.unindexable.len()
            )),
            latency_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        });

        checks.push(HealthCheck {
            name: "persistence".to_string(),
            status: if self.stats.snapshot_failing() {
                HealthStatus::Degraded("snapshot saves are failing".to_string())
            } else {
                HealthStatus::Healthy
            },
            message: None,
            latency_ms: 0,
        });

        if let Some(layout) = &self.layout {
            let status = if layout.base_dir.is_dir() {
                HealthStatus::Healthy
            } else {
                HealthStatus::Unhealthy(format!("{} is missing", layout.base_dir.display()))
            };
            checks.push(HealthCheck {
                name: "storage".to_string(),
                status,
                message: None,
                latency_ms: 0,
            });
        }

        HealthCheckResult::from_checks(checks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ast::Filter;

    fn fields(pairs: &[(&str, &str)]) -> BTreeMap<String, FieldValue> {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), FieldValue::text(*value)))
            .collect()
    }

    fn title(text: &str) -> BTreeMap<String, FieldValue> {
        fields(&[("title", text)])
    }

    #[test]
    fn index_search_delete() {
        let engine = SearchEngine::in_memory();
        let fox = engine.index_document("calls", title("Quick Brown Fox")).unwrap();
        engine.index_document("calls", title("Lazy dog")).unwrap();

        let results = engine.search(&Query::new("fox")).unwrap();
        assert_eq!(results.ids(), vec![&fox]);

        assert!(engine.delete_document(&fox));
        assert!(!engine.delete_document(&fox));
        assert!(engine.get_document(&fox).is_none());
        assert_eq!(engine.search(&Query::new("fox")).unwrap().total_hits, 0);
        assert!(engine.check_consistency().is_consistent());
    }

    #[test]
    fn invalid_document_leaves_state_untouched() {
        let mut config = EngineConfig::in_memory();
        config.analyzer.max_field_bytes = 8;
        let engine = SearchEngine::open(config).unwrap();

        let err = engine
            .index_document("calls", title("much longer than eight bytes"))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);
        assert_eq!(engine.document_count(), 0);
        assert!(!engine.is_dirty());
    }

    #[test]
    fn batch_is_all_or_nothing() {
        let mut config = EngineConfig::in_memory();
        config.analyzer.max_field_bytes = 16;
        let engine = SearchEngine::open(config).unwrap();

        let ids = engine
            .index_documents("calls", vec![title("one"), title("two")])
            .unwrap();
        assert_eq!(ids.len(), 2);

        let rejected = engine.index_documents(
            "calls",
            vec![title("three"), title("this title is far too long")],
        );
        assert!(rejected.is_err());
        assert_eq!(engine.document_count(), 2);
        assert_eq!(engine.engine_stats().documents_indexed, 2);
    }

    #[test]
    fn query_errors_are_counted() {
        let engine = SearchEngine::in_memory();
        engine.index_document("calls", title("hello")).unwrap();

        let bad = Query::new("hello").filter(Filter::regexp("title", "("));
        let err = engine.search(&bad).unwrap_err();
        assert!(err.is_query_error());

        let stats = engine.engine_stats();
        assert_eq!(stats.failed_queries, 1);
        assert_eq!(stats.queries, 0);
        assert_eq!(engine.document_count(), 1);
    }

    #[test]
    fn rebuild_drops_dangling_postings() {
        let engine = SearchEngine::in_memory();
        let keep = engine.index_document("calls", title("budget review")).unwrap();
        let lost = engine.index_document("calls", title("budget planning")).unwrap();

        // Store loses a document behind the index's back
        engine.state.write().store.remove(&lost);

        let report = engine.check_consistency();
        assert_eq!(report.dangling_postings, BTreeSet::from([lost.clone()]));
        assert!(!engine.health_check().status.is_healthy());
        // Queries skip ids the store cannot resolve
        assert_eq!(engine.search(&Query::new("budget")).unwrap().ids(), vec![&keep]);

        let rebuilt = engine.rebuild();
        assert_eq!(rebuilt.indexed, 1);
        assert_eq!(rebuilt.dangling_dropped, 1);
        assert!(engine.check_consistency().is_consistent());
        assert!(engine.health_check().status.is_healthy());
        assert!(engine.engine_stats().last_rebuild_time.is_some());
    }

    #[test]
    fn unanalyzable_documents_do_not_degrade_health() {
        let dir = tempfile::tempdir().unwrap();
        let (short, long) = {
            let engine = SearchEngine::open(EngineConfig::with_data_dir(dir.path())).unwrap();
            let short = engine.index_document("calls", title("standup")).unwrap();
            let long = engine
                .index_document("calls", title("quarterly planning review"))
                .unwrap();
            (short, long)
        };

        let mut config = EngineConfig::with_data_dir(dir.path());
        config.analyzer.max_field_bytes = 8;
        let engine = SearchEngine::open(config).unwrap();
        assert_eq!(engine.engine_stats().index_failures, 1);
        assert!(engine.get_document(&long).is_some());
        assert_eq!(engine.search(&Query::new("standup")).unwrap().ids(), vec![&short]);

        let report = engine.check_consistency();
        assert!(report.is_consistent(), "{report:?}");
        assert!(report.missing_documents.is_empty());
        assert_eq!(report.unindexable, BTreeSet::from([long.clone()]));

        for _ in 0..3 {
            assert!(engine.health_check().status.is_healthy());
        }
        assert_eq!(engine.engine_stats().consistency_warnings, 0);

        let rebuilt = engine.rebuild();
        assert_eq!(rebuilt.failed, 1);
        assert_eq!(engine.check_consistency().unindexable.len(), 1);

        assert!(engine.delete_document(&long));
        assert!(engine.check_consistency().unindexable.is_empty());
    }

    #[test]
    fn health_checks_do_not_count_warnings() {
        let engine = SearchEngine::in_memory();
        let lost = engine.index_document("calls", title("budget planning")).unwrap();
        engine.state.write().store.remove(&lost);

        for _ in 0..3 {
            assert!(!engine.health_check().status.is_healthy());
        }
        assert_eq!(engine.engine_stats().consistency_warnings, 0);

        engine.check_consistency();
        assert_eq!(engine.engine_stats().consistency_warnings, 1);
    }

    #[test]
    fn plural_documents_match_singular_queries() {
        let engine = SearchEngine::in_memory();
        let archive = engine.index_document("calls", title("weekly meetings archive")).unwrap();
        engine.index_document("calls", title("budget review")).unwrap();

        assert_eq!(engine.search(&Query::new("meeting")).unwrap().ids(), vec![&archive]);
        assert_eq!(engine.search(&Query::new("meetings")).unwrap().ids(), vec![&archive]);
    }

    #[test]
    fn index_stats_are_per_index() {
        let engine = SearchEngine::in_memory();
        engine.index_document("calls", title("alpha beta")).unwrap();
        engine.index_document("calls", title("beta gamma")).unwrap();
        engine.index_document("notes", title("delta")).unwrap();

        let calls = engine.get_index_stats("calls");
        assert_eq!(calls.document_count, 2);
        assert_eq!(calls.term_count, 3);
        assert!(calls.last_update.is_some());

        let empty = engine.get_index_stats("missing");
        assert_eq!(empty.document_count, 0);
        assert_eq!(empty.term_count, 0);
        assert!(empty.last_update.is_none());
    }

    #[test]
    fn persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let engine = SearchEngine::open(EngineConfig::with_data_dir(dir.path())).unwrap();
            let id = engine.index_document("calls", title("weekly sync")).unwrap();
            assert!(!engine.is_dirty());
            id
        };

        let reopened = SearchEngine::open_dir(dir.path()).unwrap();
        assert_eq!(reopened.get_document(&id).map(|doc| doc.id), Some(id.clone()));
        assert_eq!(reopened.search(&Query::new("sync")).unwrap().ids(), vec![&id]);
    }

    #[test]
    fn deferred_persistence_stays_dirty_until_saved() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = EngineConfig::with_data_dir(dir.path());
        config.storage.persist_on_write = false;
        let engine = SearchEngine::open(config).unwrap();

        engine.index_document("calls", title("standup")).unwrap();
        assert!(engine.is_dirty());
        assert!(engine.save_if_dirty().unwrap());
        assert!(!engine.is_dirty());
        assert!(!engine.save_if_dirty().unwrap());
    }
}
