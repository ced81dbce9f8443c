use std::collections::{BTreeSet, HashMap};
use tracing::debug;
use crate::core::config::PhoneticAlgorithm;
use crate::core::types::DocId;
use crate::index::posting::PostingList;
use crate::index::term_vector::TermVector;

/// Phonetic code -> terms sharing it
type PhoneticBuckets = HashMap<String, BTreeSet<String>>;

/// Term -> documents map plus the per-document term vectors it was built from.
///
/// Every posting entry is backed by the term vector of a live document, and
/// a posting list never stays empty: removing the last document for a term
/// removes the term.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    postings: HashMap<String, PostingList>,
    term_vectors: HashMap<DocId, TermVector>,
    /// Term -> documents where it occurs as a word rather than only as an
    /// n-gram or synonym
    word_freqs: HashMap<String, u32>,
    phonetic: Option<PhoneticAlgorithm>,
    buckets: Option<PhoneticBuckets>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        InvertedIndex::default()
    }

    /// Index that can answer phonetic lookups. With `use_buckets` the code
    /// of every term is kept up to date on writes; otherwise lookups scan
    /// the dictionary.
    pub fn with_phonetic(algorithm: PhoneticAlgorithm, use_buckets: bool) -> Self {
        InvertedIndex {
            phonetic: Some(algorithm),
            buckets: use_buckets.then(HashMap::new),
            ..InvertedIndex::default()
        }
    }

    /// Empty copy with the same phonetic settings
    pub fn empty_like(&self) -> Self {
        InvertedIndex {
            phonetic: self.phonetic,
            buckets: self.buckets.as_ref().map(|_| HashMap::new()),
            ..InvertedIndex::default()
        }
    }

    /// Adds or replaces the postings of a document
    pub fn add_document(&mut self, doc_id: DocId, vector: TermVector) {
        self.remove_document(&doc_id);

        for term in vector.terms() {
            if !self.postings.contains_key(term) {
                self.remember_phonetic(term);
            }
            self.postings
                .entry(term.to_string())
                .or_insert_with(PostingList::new)
                .add(&doc_id);
        }
        for term in vector.word_terms() {
            *self.word_freqs.entry(term.to_string()).or_insert(0) += 1;
        }

        self.term_vectors.insert(doc_id, vector);
    }

    /// Drops every posting of the document, returning its term vector
    pub fn remove_document(&mut self, doc_id: &DocId) -> Option<TermVector> {
        let vector = self.term_vectors.remove(doc_id)?;

        for term in vector.terms() {
            let Some(list) = self.postings.get_mut(term) else {
                continue;
            };
            list.remove(doc_id);
            if list.is_empty() {
                self.postings.remove(term);
                self.forget_phonetic(term);
            }
        }
        for term in vector.word_terms() {
            if let Some(count) = self.word_freqs.get_mut(term) {
                *count -= 1;
                if *count == 0 {
                    self.word_freqs.remove(term);
                }
            }
        }

        Some(vector)
    }

    fn remember_phonetic(&mut self, term: &str) {
        let (Some(algorithm), Some(buckets)) = (self.phonetic, self.buckets.as_mut()) else {
            return;
        };
        let code = algorithm.encode(term);
        if !code.is_empty() {
            buckets.entry(code).or_default().insert(term.to_string());
        }
    }

    fn forget_phonetic(&mut self, term: &str) {
        let (Some(algorithm), Some(buckets)) = (self.phonetic, self.buckets.as_mut()) else {
            return;
        };
        let code = algorithm.encode(term);
        if let Some(bucket) = buckets.get_mut(&code) {
            bucket.remove(term);
            if bucket.is_empty() {
                buckets.remove(&code);
            }
        }
    }

    /// Replaces the whole content with the given vectors
    pub fn rebuild<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (DocId, TermVector)>,
    {
        let mut fresh = self.empty_like();
        for (doc_id, vector) in entries {
            fresh.add_document(doc_id, vector);
        }
        debug!(
            documents = fresh.document_count(),
            terms = fresh.term_count(),
            "inverted index rebuilt"
        );
        *self = fresh;
    }

    pub fn postings(&self, term: &str) -> Option<&PostingList> {
        self.postings.get(term)
    }

    pub fn doc_freq(&self, term: &str) -> u32 {
        self.postings.get(term).map(|list| list.doc_freq()).unwrap_or(0)
    }

    pub fn contains_term(&self, term: &str) -> bool {
        self.postings.contains_key(term)
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.postings.keys().map(String::as_str)
    }

    /// Terms that occur as a word in at least one document
    pub fn word_terms(&self) -> impl Iterator<Item = &str> {
        self.word_freqs.keys().map(String::as_str)
    }

    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    pub fn document_count(&self) -> usize {
        self.term_vectors.len()
    }

    pub fn term_vector(&self, doc_id: &DocId) -> Option<&TermVector> {
        self.term_vectors.get(doc_id)
    }

    pub fn indexed_ids(&self) -> impl Iterator<Item = &DocId> {
        self.term_vectors.keys()
    }

    /// Union of the posting lists of `terms`
    pub fn candidate_documents<'a, I>(&self, terms: I) -> BTreeSet<DocId>
    where
        I: IntoIterator<Item = &'a String>,
    {
        terms
            .into_iter()
            .filter_map(|term| self.postings.get(term))
            .flat_map(|list| list.iter().cloned())
            .collect()
    }

    /// Indexed terms sharing the phonetic code of `term`, excluding `term`
    /// itself. Empty when phonetic matching is not configured.
    pub fn phonetic_matches(&self, term: &str) -> Vec<String> {
        let Some(algorithm) = self.phonetic else {
            return Vec::new();
        };
        let code = algorithm.encode(term);
        if code.is_empty() {
            return Vec::new();
        }

        let mut matches: Vec<String> = match &self.buckets {
            Some(buckets) => buckets
                .get(&code)
                .map(|bucket| bucket.iter().cloned().collect())
                .unwrap_or_default(),
            None => self
                .terms()
                .filter(|candidate| algorithm.encode(candidate) == code)
                .map(str::to_string)
                .collect(),
        };
        matches.retain(|candidate| candidate != term);
        matches.sort();
        matches
    }

    /// Ids referenced by a posting list that have no term vector. Non-empty
    /// only after a bug or a partially written state.
    pub fn dangling_postings(&self) -> BTreeSet<DocId> {
        self.postings
            .values()
            .flat_map(|list| list.iter())
            .filter(|id| !self.term_vectors.contains_key(*id))
            .cloned()
            .collect()
    }

    /// Terms whose posting list disagrees with the term vectors
    pub fn inconsistent_terms(&self) -> Vec<String> {
        let mut expected: HashMap<&str, BTreeSet<&DocId>> = HashMap::new();
        for (doc_id, vector) in &self.term_vectors {
            for term in vector.terms() {
                expected.entry(term).or_default().insert(doc_id);
            }
        }

        let mut bad: Vec<String> = self
            .postings
            .iter()
            .filter(|(term, list)| {
                let actual: BTreeSet<&DocId> = list.iter().collect();
                list.is_empty() || expected.get(term.as_str()) != Some(&actual)
            })
            .map(|(term, _)| term.clone())
            .collect();
        bad.extend(
            expected
                .keys()
                .filter(|term| !self.postings.contains_key(**term))
                .map(|term| term.to_string()),
        );
        bad.sort();
        bad
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::Analyzer;
    use crate::core::types::{Document, FieldValue};
    use crate::schema::schema::Schema;

    fn vector(content: &str) -> TermVector {
        let doc = Document::new(DocId::from("x"), "idx")
            .with_field("content", FieldValue::text(content));
        TermVector::build(&doc, &Analyzer::default(), &Schema::default(), 1 << 20).unwrap()
    }

    fn ids(set: &BTreeSet<DocId>) -> Vec<&str> {
        set.iter().map(DocId::as_str).collect()
    }

    #[test]
    fn postings_track_exactly_the_documents_containing_a_term() {
        let mut index = InvertedIndex::new();
        index.add_document(DocId::from("a"), vector("quick brown fox"));
        index.add_document(DocId::from("b"), vector("lazy dog"));
        index.add_document(DocId::from("c"), vector("quick dog"));

        assert_eq!(index.doc_freq("quick"), 2);
        assert_eq!(index.doc_freq("dog"), 2);
        assert_eq!(index.doc_freq("cat"), 0);
        let candidates = index.candidate_documents(&["fox".to_string(), "lazy".to_string()]);
        assert_eq!(ids(&candidates), vec!["a", "b"]);
        assert!(index.inconsistent_terms().is_empty());
    }

    #[test]
    fn removing_last_document_drops_the_term() {
        let mut index = InvertedIndex::new();
        index.add_document(DocId::from("a"), vector("unique words here"));
        index.add_document(DocId::from("b"), vector("words"));

        assert!(index.remove_document(&DocId::from("a")).is_some());
        assert!(!index.contains_term("unique"));
        assert_eq!(index.doc_freq("word"), 1);
        assert!(index.remove_document(&DocId::from("a")).is_none());
        assert!(index.dangling_postings().is_empty());

        index.remove_document(&DocId::from("b"));
        assert_eq!(index.term_count(), 0);
        assert_eq!(index.document_count(), 0);
    }

    #[test]
    fn word_terms_exclude_ngram_only_terms() {
        use crate::core::config::{AnalyzerConfig, NGramConfig, NGramMode};

        let analyzer = Analyzer::from_config(&AnalyzerConfig {
            ngram: Some(NGramConfig {
                min_gram: 3,
                max_gram: 4,
                mode: NGramMode::Append,
                ..NGramConfig::default()
            }),
            ..AnalyzerConfig::default()
        });
        let build = |content: &str| {
            let doc = Document::new(DocId::from("x"), "idx")
                .with_field("content", FieldValue::text(content));
            TermVector::build(&doc, &analyzer, &Schema::default(), 1 << 20).unwrap()
        };

        let mut index = InvertedIndex::new();
        index.add_document(DocId::from("a"), build("budget"));
        index.add_document(DocId::from("b"), build("bud"));
        assert!(index.contains_term("budg"));

        let mut words: Vec<&str> = index.word_terms().collect();
        words.sort();
        assert_eq!(words, vec!["bud", "budget"]);

        // "bud" stays a term through the n-grams of "budget"
        index.remove_document(&DocId::from("b"));
        assert!(index.contains_term("bud"));
        assert_eq!(index.word_terms().collect::<Vec<_>>(), vec!["budget"]);
    }

    #[test]
    fn re_adding_replaces_old_postings() {
        let mut index = InvertedIndex::new();
        index.add_document(DocId::from("a"), vector("alpha"));
        index.add_document(DocId::from("a"), vector("beta"));
        assert!(!index.contains_term("alpha"));
        assert_eq!(index.doc_freq("beta"), 1);
    }

    #[test]
    fn phonetic_lookup_with_and_without_buckets() {
        for use_buckets in [true, false] {
            let mut index = InvertedIndex::with_phonetic(PhoneticAlgorithm::Soundex, use_buckets);
            index.add_document(DocId::from("a"), vector("robert smith"));
            index.add_document(DocId::from("b"), vector("rupert"));

            assert_eq!(index.phonetic_matches("robert"), vec!["rupert".to_string()]);
            assert_eq!(index.phonetic_matches("smyth"), vec!["smith".to_string()]);

            index.remove_document(&DocId::from("b"));
            assert!(index.phonetic_matches("robert").is_empty());
        }
        assert!(InvertedIndex::new().phonetic_matches("robert").is_empty());
    }

    #[test]
    fn rebuild_keeps_phonetic_settings() {
        let mut index = InvertedIndex::with_phonetic(PhoneticAlgorithm::Soundex, true);
        index.add_document(DocId::from("old"), vector("stale"));
        index.rebuild(vec![(DocId::from("n"), vector("rupert"))]);

        assert!(!index.contains_term("stale"));
        assert_eq!(index.phonetic_matches("robert"), vec!["rupert".to_string()]);
    }
}
