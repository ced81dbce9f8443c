use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::time::{Duration, Instant};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use tracing::debug;
use crate::analysis::analyzer::Analyzer;
use crate::core::config::{SearchConfig, SuggestConfig};
use crate::core::error::{Error, Result};
use crate::core::types::{DocId, Document};
use crate::index::inverted::InvertedIndex;
use crate::index::term_vector::TermVector;
use crate::query::ast::{HighlightRequest, Query};
use crate::query::expander::QueryExpander;
use crate::query::filter::{self, CompiledFilter};
use crate::query::sort::{self, SortView};
use crate::schema::schema::Schema;
use crate::scoring::boost::{RecencyBoost, RelevanceBoost};
use crate::scoring::scorer::{Scorer, TermStats};
use crate::search::facet;
use crate::search::highlight;
use crate::search::results::{ScoredCandidate, ScoredDocument, SearchResults, TopKCollector};
use crate::storage::document_store::DocumentStore;
use crate::suggest::completion;
use crate::suggest::spelling::SpellingCorrector;
use crate::suggest::Suggestions;

/// Steps of one query, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineStage {
    Idle,
    Expanding,
    CandidateLookup,
    Scoring,
    Filtering,
    Sorting,
    Paginating,
    Highlighting,
    FacetBuilding,
    SuggestionBuilding,
    Done,
}

/// Read-only view of the engine a query runs against
pub struct SearchContext<'a> {
    pub store: &'a DocumentStore,
    pub index: &'a InvertedIndex,
    pub analyzer: &'a Analyzer,
    pub schema: &'a Schema,
    pub scorer: &'a dyn Scorer,
    pub recency: &'a RecencyBoost,
    pub relevance: &'a RelevanceBoost,
    pub search: &'a SearchConfig,
    pub suggest: &'a SuggestConfig,
}

/// Wall-clock budget for scoring and filtering
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn new(budget: Duration) -> Self {
        Deadline {
            started: Instant::now(),
            budget,
        }
    }

    pub fn check(&self, stage: PipelineStage) -> Result<()> {
        let elapsed = self.started.elapsed();
        if elapsed > self.budget {
            return Err(Error::timed_out(format!(
                "query exceeded {} ms during {:?}",
                self.budget.as_millis(),
                stage
            )));
        }
        Ok(())
    }
}

/// Query after validation
struct PreparedQuery<'q> {
    query: &'q Query,
    filters: Vec<CompiledFilter>,
    size: usize,
    /// Analyzed, deduplicated query terms; these are what gets scored
    terms: Vec<String>,
    match_all: bool,
}

struct Matched<'a> {
    candidate: ScoredCandidate,
    doc: &'a Document,
}

/// Stateless per call: every run walks the stages from `Idle` to `Done`
/// and never touches the store or the index mutably.
pub struct QueryPipeline<'a> {
    ctx: SearchContext<'a>,
    stage: PipelineStage,
}

impl<'a> QueryPipeline<'a> {
    pub fn new(ctx: SearchContext<'a>) -> Self {
        QueryPipeline {
            ctx,
            stage: PipelineStage::Idle,
        }
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    fn enter(&mut self, next: PipelineStage) {
        debug!(from = ?self.stage, to = ?next, "query stage");
        self.stage = next;
    }

    pub fn execute(&mut self, query: &Query) -> Result<SearchResults> {
        let started = Instant::now();
        let deadline = Deadline::new(self.ctx.search.timeout());
        self.stage = PipelineStage::Idle;

        let prepared = self.prepare(query)?;

        self.enter(PipelineStage::Expanding);
        let expanded = QueryExpander::new(self.ctx.analyzer.query_synonyms())
            .expand(&prepared.terms, self.ctx.index);

        self.enter(PipelineStage::CandidateLookup);
        let candidates = self.candidates(&prepared, &expanded);
        debug!(terms = prepared.terms.len(), expanded = expanded.len(), candidates = candidates.len(), "candidates found");

        self.enter(PipelineStage::Scoring);
        let scored = self.score(&prepared, candidates, &deadline)?;

        self.enter(PipelineStage::Filtering);
        let matched = self.apply_filters(&prepared, scored, &deadline)?;
        let total_hits = matched.len();
        let max_score = matched
            .iter()
            .map(|m| m.candidate.score)
            .reduce(f32::max)
            .unwrap_or(0.0);

        self.enter(PipelineStage::Sorting);
        let ordered = self.order(&prepared, &matched);

        self.enter(PipelineStage::Paginating);
        let page: Vec<&Matched> = ordered.into_iter().skip(query.from).take(prepared.size).collect();

        let mut hits: Vec<ScoredDocument> = page
            .iter()
            .map(|m| ScoredDocument {
                id: m.candidate.id.clone(),
                score: m.candidate.score,
                source: m.doc.clone(),
                highlights: BTreeMap::new(),
            })
            .collect();

        if let Some(request) = &query.highlight {
            self.enter(PipelineStage::Highlighting);
            let terms: HashSet<String> = prepared.terms.iter().cloned().collect();
            for hit in &mut hits {
                hit.highlights = self.highlight_hit(&hit.source, &terms, request);
            }
        }

        let mut aggregations = BTreeMap::new();
        if !query.facets.is_empty() {
            self.enter(PipelineStage::FacetBuilding);
            for request in &query.facets {
                let result = facet::aggregate(request, matched.iter().map(|m| m.doc));
                aggregations.insert(request.name.clone(), result);
            }
        }

        let suggestions = if query.suggest {
            self.enter(PipelineStage::SuggestionBuilding);
            Some(self.suggest(query))
        } else {
            None
        };

        self.enter(PipelineStage::Done);
        Ok(SearchResults {
            total_hits,
            hits,
            max_score,
            aggregations,
            suggestions,
            took_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Checks everything that can be rejected before touching the index
    fn prepare<'q>(&self, query: &'q Query) -> Result<PreparedQuery<'q>> {
        let size = query.size.unwrap_or(self.ctx.search.default_size);
        let window = query.from.saturating_add(size);
        if window > self.ctx.search.max_result_window {
            return Err(Error::query(format!(
                "from + size = {} exceeds the result window of {}",
                window, self.ctx.search.max_result_window
            )));
        }
        if let Some(min_score) = query.min_score {
            if !min_score.is_finite() {
                return Err(Error::query("min_score must be finite"));
            }
        }
        for key in &query.sort {
            if key.field.is_empty() {
                return Err(Error::query("sort key with empty field name"));
            }
        }
        let mut facet_names = HashSet::new();
        for request in &query.facets {
            if request.field.is_empty() {
                return Err(Error::query(format!("facet '{}' has no field", request.name)));
            }
            if !facet_names.insert(request.name.as_str()) {
                return Err(Error::query(format!("duplicate facet name '{}'", request.name)));
            }
        }

        let filters = filter::compile(&query.filters)?;

        let mut seen = HashSet::new();
        let terms: Vec<String> = self
            .ctx
            .analyzer
            .query_terms(&query.text)
            .into_iter()
            .filter(|term| seen.insert(term.clone()))
            .collect();

        Ok(PreparedQuery {
            query,
            filters,
            size,
            terms,
            match_all: query.text.trim().is_empty(),
        })
    }

    fn in_scope(&self, prepared: &PreparedQuery, doc: &Document) -> bool {
        prepared
            .query
            .index_name
            .as_deref()
            .is_none_or(|name| doc.index_name == name)
    }

    /// Union of postings for the expanded terms; a blank query takes every
    /// document in scope
    fn candidates(&self, prepared: &PreparedQuery, expanded: &BTreeSet<String>) -> Vec<&'a Document> {
        let store = self.ctx.store;
        if prepared.match_all {
            return store.iter().filter(|doc| self.in_scope(prepared, doc)).collect();
        }

        self.ctx
            .index
            .candidate_documents(expanded)
            .iter()
            .filter_map(|id| store.get(id))
            .filter(|doc| self.in_scope(prepared, doc))
            .collect()
    }

    fn score(
        &self,
        prepared: &PreparedQuery,
        candidates: Vec<&'a Document>,
        deadline: &Deadline,
    ) -> Result<Vec<Matched<'a>>> {
        let stats = TermStats::collect(&prepared.terms, self.ctx.index, self.ctx.store.len());
        let now: DateTime<Utc> = Utc::now();
        let empty = TermVector::default();

        candidates
            .into_par_iter()
            .map(|doc| {
                deadline.check(PipelineStage::Scoring)?;

                let base = if prepared.match_all {
                    1.0
                } else {
                    let vector = self.ctx.index.term_vector(&doc.id).unwrap_or(&empty);
                    self.ctx.scorer.score(vector, &stats)
                };
                let score = base
                    * self.ctx.recency.factor(doc, now)
                    * self.ctx.relevance.factor(doc, &prepared.query.text);

                Ok(Matched {
                    candidate: ScoredCandidate { id: doc.id.clone(), score },
                    doc,
                })
            })
            .collect()
    }

    fn apply_filters(
        &self,
        prepared: &PreparedQuery,
        scored: Vec<Matched<'a>>,
        deadline: &Deadline,
    ) -> Result<Vec<Matched<'a>>> {
        let mut kept = Vec::with_capacity(scored.len());
        for matched in scored {
            deadline.check(PipelineStage::Filtering)?;
            if prepared.query.min_score.is_some_and(|min| matched.candidate.score < min) {
                continue;
            }
            if filter::matches_all(&prepared.filters, matched.doc) {
                kept.push(matched);
            }
        }
        Ok(kept)
    }

    /// Score order through the top-k collector; explicit sort keys order
    /// every match
    fn order<'m>(&self, prepared: &PreparedQuery, matched: &'m [Matched<'a>]) -> Vec<&'m Matched<'a>> {
        let query = prepared.query;

        if query.sort.is_empty() {
            let by_id: HashMap<&DocId, &Matched> =
                matched.iter().map(|m| (&m.candidate.id, m)).collect();
            let mut collector = TopKCollector::new(query.from.saturating_add(prepared.size));
            for m in matched {
                collector.collect(m.candidate.clone());
            }
            return collector
                .get_results()
                .iter()
                .filter_map(|c| by_id.get(&c.id).copied())
                .collect();
        }

        let mut ordered: Vec<&Matched> = matched.iter().collect();
        sort::sort_by_keys(&mut ordered, &query.sort, |m| SortView {
            id: &m.candidate.id,
            score: m.candidate.score,
            doc: m.doc,
        });
        ordered
    }

    fn highlight_hit(
        &self,
        doc: &Document,
        terms: &HashSet<String>,
        request: &HighlightRequest,
    ) -> BTreeMap<String, Vec<String>> {
        let fields: Vec<&String> = if request.fields.is_empty() {
            doc.fields
                .iter()
                .filter(|(name, value)| self.ctx.schema.is_analyzed(name, value))
                .map(|(name, _)| name)
                .collect()
        } else {
            request.fields.iter().collect()
        };

        let mut highlights = BTreeMap::new();
        for field in fields {
            let fragments: Vec<String> = doc
                .field_strings(field)
                .into_iter()
                .flat_map(|text| highlight::highlight(text, terms, self.ctx.analyzer, request))
                .take(request.number_of_fragments)
                .collect();
            if !fragments.is_empty() {
                highlights.insert(field.clone(), fragments);
            }
        }
        highlights
    }

    fn suggest(&self, query: &Query) -> Suggestions {
        let scope = query.index_name.as_deref();
        let docs = self
            .ctx
            .store
            .iter()
            .filter(|doc| scope.is_none_or(|name| doc.index_name == name));
        let completions = completion::complete(
            &query.text,
            docs,
            &self.ctx.suggest.completion_field,
            self.ctx.suggest.completion_size,
        );

        let spelling = SpellingCorrector::new(self.ctx.index, self.ctx.analyzer, self.ctx.suggest)
            .correct(&query.text);

        Suggestions { completions, spelling }
    }
}
