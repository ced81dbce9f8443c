use std::collections::BTreeSet;
use tracing::trace;
use crate::analysis::filters::synonym::SynonymTable;
use crate::index::inverted::InvertedIndex;

/// Widens analyzed query terms for candidate lookup.
///
/// The expanded set only decides which documents get scored; scores are
/// computed from the original terms.
pub struct QueryExpander<'a> {
    synonyms: &'a SynonymTable,
}

impl<'a> QueryExpander<'a> {
    pub fn new(synonyms: &'a SynonymTable) -> Self {
        QueryExpander { synonyms }
    }

    /// Original terms, their query-side synonyms and every indexed term
    /// sharing their phonetic code (when the index tracks one)
    pub fn expand(&self, terms: &[String], index: &InvertedIndex) -> BTreeSet<String> {
        let mut expanded: BTreeSet<String> = terms.iter().cloned().collect();

        if !self.synonyms.is_empty() {
            expanded.extend(self.synonyms.expand(terms));
        }

        for term in terms {
            let matches = index.phonetic_matches(term);
            if !matches.is_empty() {
                trace!(term = %term, matches = ?matches, "phonetic expansion");
            }
            expanded.extend(matches);
        }

        expanded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::Analyzer;
    use crate::core::config::PhoneticAlgorithm;
    use crate::core::types::{DocId, Document, FieldValue};
    use crate::index::term_vector::TermVector;
    use crate::schema::schema::Schema;

    fn index_with(phonetic: bool, contents: &[&str]) -> InvertedIndex {
        let mut index = if phonetic {
            InvertedIndex::with_phonetic(PhoneticAlgorithm::Soundex, true)
        } else {
            InvertedIndex::new()
        };
        for (i, content) in contents.iter().enumerate() {
            let doc = Document::new(DocId::new(format!("d{}", i)), "idx")
                .with_field("content", FieldValue::text(*content));
            let vector = TermVector::build(&doc, &Analyzer::default(), &Schema::default(), 1024).unwrap();
            index.add_document(doc.id, vector);
        }
        index
    }

    #[test]
    fn synonyms_widen_the_term_set() {
        let mut table = SynonymTable::new();
        table.insert("call".into(), vec!["meeting".into(), "sync".into()]);
        let index = index_with(false, &["meeting notes"]);

        let expanded = QueryExpander::new(&table).expand(&["call".to_string()], &index);
        assert_eq!(
            expanded.into_iter().collect::<Vec<_>>(),
            vec!["call", "meeting", "sync"]
        );
    }

    #[test]
    fn phonetic_matches_come_from_the_vocabulary() {
        let table = SynonymTable::new();
        let index = index_with(true, &["smith reported", "smyth replied"]);
        let expanded = QueryExpander::new(&table).expand(&["smith".to_string()], &index);
        assert!(expanded.contains("smyth"));
        assert!(expanded.contains("smith"));

        let plain = index_with(false, &["smith reported", "smyth replied"]);
        let expanded = QueryExpander::new(&table).expand(&["smith".to_string()], &plain);
        assert_eq!(expanded.len(), 1);
    }
}
