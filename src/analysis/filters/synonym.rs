use std::collections::{BTreeSet, HashMap};
use crate::analysis::filter::TokenFilter;
use crate::analysis::token::{Token, TokenType};

/// Synonym table keyed and valued in analyzed form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SynonymTable {
    entries: HashMap<String, Vec<String>>,
}

impl SynonymTable {
    pub fn new() -> Self {
        SynonymTable::default()
    }

    pub fn insert(&mut self, term: String, synonyms: Vec<String>) {
        let slot = self.entries.entry(term.clone()).or_default();
        for synonym in synonyms {
            if synonym != term && !slot.contains(&synonym) {
                slot.push(synonym);
            }
        }
    }

    pub fn get(&self, term: &str) -> &[String] {
        self.entries.get(term).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Terms plus every synonym reachable in one step
    pub fn expand<'a, I>(&self, terms: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut expanded = BTreeSet::new();
        for term in terms {
            expanded.insert(term.clone());
            expanded.extend(self.get(term).iter().cloned());
        }
        expanded
    }
}

/// Index-side synonym injection
pub struct SynonymFilter {
    pub table: SynonymTable,
}

impl TokenFilter for SynonymFilter {
    fn filter(&self, tokens: Vec<Token>) -> Vec<Token> {
        let mut result = Vec::with_capacity(tokens.len());
        for token in tokens {
            let synonyms: Vec<Token> = self
                .table
                .get(&token.text)
                .iter()
                .map(|s| token.derive(s.clone(), TokenType::Synonym))
                .collect();
            result.push(token);
            result.extend(synonyms);
        }
        result
    }

    fn name(&self) -> &str {
        "synonym"
    }

    fn index_only(&self) -> bool {
        true
    }
}
