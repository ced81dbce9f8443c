use std::collections::{BTreeMap, BTreeSet, HashMap};
use crate::analysis::analyzer::Analyzer;
use crate::analysis::token::TokenType;
use crate::core::error::{Error, Result};
use crate::core::types::Document;
use crate::schema::schema::Schema;

/// Term occurrences of one analyzed field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldTerms {
    pub term_freqs: HashMap<String, u32>,
    pub token_count: u32,
}

impl FieldTerms {
    pub fn occurrences(&self, term: &str) -> u32 {
        self.term_freqs.get(term).copied().unwrap_or(0)
    }

    /// occurrences / (token count - excluded). Scoring excludes the
    /// occurrences of the other query terms, so the frequency of one term
    /// does not depend on how often the others occur.
    pub fn tf(&self, term: &str, excluded: u32) -> f32 {
        let length = self.token_count.saturating_sub(excluded);
        if length == 0 {
            return 0.0;
        }
        self.occurrences(term) as f32 / length as f32
    }
}

/// Analyzed form of a document, kept beside the postings so scoring does not
/// re-run analysis per query and deletion knows which postings to touch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermVector {
    pub fields: BTreeMap<String, FieldTerms>,
    /// Terms that only came out of n-gram or synonym expansion, never as a
    /// word of the document
    pub derived: BTreeSet<String>,
}

impl TermVector {
    pub fn build(
        doc: &Document,
        analyzer: &Analyzer,
        schema: &Schema,
        max_field_bytes: usize,
    ) -> Result<Self> {
        let mut fields = BTreeMap::new();
        let mut words = BTreeSet::new();
        let mut derived = BTreeSet::new();

        for (name, value) in &doc.fields {
            if !schema.is_analyzed(name, value) {
                continue;
            }

            let mut field_terms = FieldTerms::default();
            for text in value.strings() {
                if text.len() > max_field_bytes {
                    return Err(Error::invalid_input(format!(
                        "field '{}' of document {} is {} bytes, limit is {}",
                        name, doc.id, text.len(), max_field_bytes
                    )));
                }
                for token in analyzer.analyze(text) {
                    match token.token_type {
                        TokenType::Word | TokenType::Number => words.insert(token.text.clone()),
                        TokenType::NGram | TokenType::Synonym => derived.insert(token.text.clone()),
                    };
                    *field_terms.term_freqs.entry(token.text).or_insert(0) += 1;
                    field_terms.token_count += 1;
                }
            }

            if field_terms.token_count > 0 {
                fields.insert(name.clone(), field_terms);
            }
        }

        derived.retain(|term| !words.contains(term));
        Ok(TermVector { fields, derived })
    }

    /// Distinct terms across all fields
    pub fn terms(&self) -> BTreeSet<&str> {
        self.fields
            .values()
            .flat_map(|f| f.term_freqs.keys().map(String::as_str))
            .collect()
    }

    pub fn field(&self, name: &str) -> Option<&FieldTerms> {
        self.fields.get(name)
    }

    pub fn contains(&self, term: &str) -> bool {
        self.fields.values().any(|f| f.term_freqs.contains_key(term))
    }

    /// Distinct terms that appeared as words of the document
    pub fn word_terms(&self) -> impl Iterator<Item = &str> {
        self.terms().into_iter().filter(|term| !self.derived.contains(*term))
    }
}
