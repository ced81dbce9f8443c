pub mod core;
pub mod storage;
pub mod analysis;
pub mod schema;
pub mod index;
pub mod scoring;
pub mod search;
pub mod query;
pub mod suggest;
pub mod parallel;

pub use crate::core::config::EngineConfig;
pub use crate::core::engine::{ConsistencyReport, RebuildReport, SearchEngine};
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::core::types::{DocId, Document, FieldValue};
pub use crate::query::ast::{FacetRequest, Filter, HighlightRequest, Query, SortKey};
pub use crate::search::results::SearchResults;

/*
┌──────────────────────────────────────────────────────────────────────────────────┐
│                         TRANSCRIPT SEARCH ARCHITECTURE                           │
└──────────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────────── CORE LAYER ──────────────────────────────────┐
│  ┌────────────────────────────────────────────────────────────────────────────┐ │
│  │                          struct SearchEngine                               │ │
│  │ config: EngineConfig              // Validated, saved to meta/engine.json  │ │
│  │ analyzer: Analyzer                // Tokenizer + filter chain              │ │
│  │ scorer / recency / relevance      // TF-IDF and score multipliers          │ │
│  │ state: RwLock<IndexState>         // DocumentStore + InvertedIndex         │ │
│  │ writer: Mutex<()>                 // Single writer, also held by rebuild   │ │
│  │ dirty: AtomicBool                 // Snapshot pending                      │ │
│  │ stats: StatsRecorder              // Counters for engine_stats()           │ │
│  └────────────────────────────────────────────────────────────────────────────┘ │
│  ┌──────────────────────────┐  ┌───────────────────────────────────────────────┐ │
│  │ maintenance::spawn       │  │ StorageLayout + Snapshot                      │ │
│  │ • save tick (if dirty)   │  │ • documents.json  (atomic tempfile rename)    │ │
│  │ • optimize tick (rebuild)│  │ • meta/engine.json                            │ │
│  └──────────────────────────┘  └───────────────────────────────────────────────┘ │
└──────────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────── INDEXING LAYER ────────────────────────────────┐
│  Document ──► Analyzer ──► TermVector ──► InvertedIndex                          │
│                                           • postings: term → PostingList         │
│                                           • term_vectors: DocId → TermVector     │
│                                           • buckets: phonetic code → terms       │
│  ParallelIndexer (rayon) builds term vectors for batches and rebuilds            │
└──────────────────────────────────────────────────────────────────────────────────┘

┌─────────────────────────────────── SEARCH LAYER ─────────────────────────────────┐
│  QueryPipeline                                                                   │
│  Idle → Expanding → CandidateLookup → Scoring → Filtering → Sorting →            │
│  Paginating → Highlighting → FacetBuilding → SuggestionBuilding → Done           │
│                                                                                  │
│  QueryExpander (synonyms, phonetic)   TfIdfScorer × RecencyBoost × RelevanceBoost│
│  CompiledFilter / sort_by_keys        facet::aggregate   highlight::highlight    │
│  completion::complete                 SpellingCorrector (Levenshtein DFA)        │
└──────────────────────────────────────────────────────────────────────────────────┘
*/
