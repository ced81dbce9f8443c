use tracing::warn;
use crate::analysis::filter::TokenFilter;
use crate::analysis::filters::ngram::EdgeNGramFilter;
use crate::analysis::filters::stemmer::StemmerFilter;
use crate::analysis::filters::stopword::StopWordFilter;
use crate::analysis::filters::synonym::{SynonymFilter, SynonymTable};
use crate::analysis::token::Token;
use crate::analysis::tokenizer::{StandardTokenizer, Tokenizer};
use crate::core::config::AnalyzerConfig;

/// Text analysis pipeline
pub struct Analyzer {
    pub tokenizer: Box<dyn Tokenizer>,
    pub filters: Vec<Box<dyn TokenFilter>>,
    pub name: String,
    query_synonyms: SynonymTable,
}

impl Analyzer {
    pub fn new(name: String, tokenizer: Box<dyn Tokenizer>) -> Self {
        Analyzer {
            tokenizer,
            filters: Vec::new(),
            name,
            query_synonyms: SynonymTable::new(),
        }
    }

    pub fn add_filter(mut self, filter: Box<dyn TokenFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Index-time analysis of field text
    pub fn analyze(&self, text: &str) -> Vec<Token> {
        let mut tokens = self.tokenizer.tokenize(text);

        for filter in &self.filters {
            tokens = filter.filter(tokens);
        }

        tokens
    }

    /// Query-time analysis: skips index-only filters (n-grams, index synonyms)
    pub fn analyze_query(&self, text: &str) -> Vec<Token> {
        let mut tokens = self.tokenizer.tokenize(text);

        for filter in self.filters.iter().filter(|f| !f.index_only()) {
            tokens = filter.filter(tokens);
        }

        tokens
    }

    pub fn terms(&self, text: &str) -> Vec<String> {
        self.analyze(text).into_iter().map(|t| t.text).collect()
    }

    pub fn query_terms(&self, text: &str) -> Vec<String> {
        self.analyze_query(text).into_iter().map(|t| t.text).collect()
    }

    /// Lowercased words with no filtering at all
    pub fn words(&self, text: &str) -> Vec<String> {
        self.tokenizer.tokenize(text).into_iter().map(|t| t.text).collect()
    }

    /// Synonyms consulted when expanding query terms
    pub fn query_synonyms(&self) -> &SynonymTable {
        &self.query_synonyms
    }

    pub fn from_config(config: &AnalyzerConfig) -> Self {
        let mut analyzer = Analyzer::base(config);

        let synonyms = analyzer.normalize_synonyms(config);
        if config.synonyms.direction.expands_index() && !synonyms.is_empty() {
            analyzer = analyzer.add_filter(Box::new(SynonymFilter {
                table: synonyms.clone(),
            }));
        }
        if config.synonyms.direction.expands_query() {
            analyzer.query_synonyms = synonyms;
        }

        if let Some(ngram) = &config.ngram {
            analyzer = analyzer.add_filter(Box::new(EdgeNGramFilter::new(ngram)));
        }

        analyzer
    }

    /// Tokenizer, stop words and stemming: the shared front of both chains
    fn base(config: &AnalyzerConfig) -> Self {
        let mut analyzer = Analyzer::new("transcript".to_string(),
                                         Box::new(StandardTokenizer::default()))
            .add_filter(Box::new(StopWordFilter::new(&config.stop_words)));

        if config.stemming {
            analyzer = analyzer.add_filter(Box::new(StemmerFilter::new(config.stemmer)));
        }

        analyzer
    }

    /// Run synonym table entries through the base chain so lookups happen
    /// on analyzed terms
    fn normalize_synonyms(&self, config: &AnalyzerConfig) -> SynonymTable {
        let mut table = SynonymTable::new();

        for (key, values) in &config.synonyms.table {
            let key_terms = self.terms(key);
            let [term] = key_terms.as_slice() else {
                warn!(entry = %key, "synonym key must analyze to exactly one term, skipping");
                continue;
            };
            let synonyms: Vec<String> = values.iter().flat_map(|v| self.terms(v)).collect();
            table.insert(term.clone(), synonyms);
        }

        table
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Analyzer::from_config(&AnalyzerConfig::default())
    }
}
