use std::collections::HashMap;
use crate::index::inverted::InvertedIndex;
use crate::index::term_vector::TermVector;
use crate::schema::schema::Schema;

/// Scorer trait
pub trait Scorer: Send + Sync {
    fn score(&self, vector: &TermVector, stats: &TermStats) -> f32;
}

/// Collection statistics for the terms of one query
#[derive(Debug, Clone)]
pub struct TermStats {
    pub total_docs: usize,           // Documents in the store
    pub doc_freqs: HashMap<String, u32>,
}

impl TermStats {
    /// Snapshot of the document frequency of every distinct query term
    pub fn collect(terms: &[String], index: &InvertedIndex, total_docs: usize) -> Self {
        let doc_freqs = terms
            .iter()
            .map(|term| (term.clone(), index.doc_freq(term)))
            .collect();
        TermStats { total_docs, doc_freqs }
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.doc_freqs.keys().map(String::as_str)
    }

    /// ln(N / (df + 1)), never below `floor`
    pub fn idf(&self, term: &str, floor: f32) -> f32 {
        let df = self.doc_freqs.get(term).copied().unwrap_or(0) as f32;
        let raw = (self.total_docs as f32 / (df + 1.0)).ln();
        if raw.is_finite() { raw.max(floor) } else { floor }
    }
}

/// Per-field TF-IDF summed over fields, each field weighted by its schema boost.
///
/// The frequency of a query term is measured against the field length minus
/// the occurrences of the other query terms. For a single-term query that is
/// the plain occurrences / token count; with several terms it keeps every
/// term's contribution from shrinking when another matched term repeats.
pub struct TfIdfScorer {
    pub schema: Schema,
    /// Lower bound on idf. Without it a term found in most documents gets a
    /// zero or negative weight and matching it would lower a score.
    pub min_idf: f32,
}

impl TfIdfScorer {
    pub fn new(schema: Schema, min_idf: f32) -> Self {
        TfIdfScorer { schema, min_idf }
    }
}

impl Scorer for TfIdfScorer {
    fn score(&self, vector: &TermVector, stats: &TermStats) -> f32 {
        vector
            .fields
            .iter()
            .map(|(name, field)| {
                let matched: u32 = stats.terms().map(|term| field.occurrences(term)).sum();
                let field_score: f32 = stats
                    .terms()
                    .map(|term| {
                        let others = matched - field.occurrences(term);
                        field.tf(term, others) * stats.idf(term, self.min_idf)
                    })
                    .sum();
                field_score * self.schema.boost(name)
            })
            .sum()
    }
}
