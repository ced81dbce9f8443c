use std::collections::BTreeSet;
use levenshtein_automata::{Distance, LevenshteinAutomatonBuilder, DFA};
use serde::{Deserialize, Serialize};
use crate::analysis::analyzer::Analyzer;
use crate::core::config::SuggestConfig;
use crate::index::inverted::InvertedIndex;

/// Largest distance checked with a Levenshtein DFA; above it the DP is used
const MAX_DFA_DISTANCE: u8 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub term: String,
    pub distance: u8,
    /// 1 - distance / longer length
    pub similarity: f64,
    /// Shares the phonetic code of the misspelled word
    pub phonetic: bool,
    pub doc_freq: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordCorrections {
    pub word: String,
    pub corrections: Vec<Correction>,
}

/// Edit distance matcher for one query word
enum Matcher {
    Dfa(DFA),
    Dynamic(Vec<char>),
}

impl Matcher {
    fn new(word: &str, max_distance: u8) -> Self {
        if max_distance <= MAX_DFA_DISTANCE {
            // Plain Levenshtein: a transposition costs two edits
            let builder = LevenshteinAutomatonBuilder::new(max_distance, false);
            Matcher::Dfa(builder.build_dfa(word))
        } else {
            Matcher::Dynamic(word.chars().collect())
        }
    }

    /// Distance to `term` when it is within `max_distance`
    fn distance(&self, term: &str, max_distance: u8) -> Option<u8> {
        match self {
            Matcher::Dfa(dfa) => match dfa.eval(term) {
                Distance::Exact(d) if d <= max_distance => Some(d),
                _ => None,
            },
            Matcher::Dynamic(word) => {
                let d = levenshtein(word, &term.chars().collect::<Vec<_>>());
                (d <= max_distance as usize).then_some(d as u8)
            }
        }
    }
}

/// Levenshtein distance over chars
pub fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev_row: Vec<usize> = (0..=b.len()).collect();
    let mut curr_row = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr_row[0] = i;
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr_row[j] = (prev_row[j] + 1)
                .min(curr_row[j - 1] + 1)
                .min(prev_row[j - 1] + cost);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b.len()]
}

/// Vocabulary-based corrections for misspelled query words
pub struct SpellingCorrector<'a> {
    index: &'a InvertedIndex,
    analyzer: &'a Analyzer,
    config: &'a SuggestConfig,
}

impl<'a> SpellingCorrector<'a> {
    pub fn new(index: &'a InvertedIndex, analyzer: &'a Analyzer, config: &'a SuggestConfig) -> Self {
        SpellingCorrector { index, analyzer, config }
    }

    /// Corrections for every query word that is not already known. Words
    /// that analyze to nothing (stop words) are skipped.
    pub fn correct(&self, query: &str) -> Vec<WordCorrections> {
        let mut seen = BTreeSet::new();
        let mut result = Vec::new();

        for word in self.analyzer.words(query) {
            if !seen.insert(word.clone()) {
                continue;
            }
            let analyzed = self.analyzer.query_terms(&word);
            if analyzed.is_empty() || analyzed.iter().all(|t| self.index.contains_term(t)) {
                continue;
            }

            let corrections = self.corrections_for(&word);
            if !corrections.is_empty() {
                result.push(WordCorrections { word, corrections });
            }
        }

        result
    }

    /// Words of the vocabulary within min(max_edits, len/2) edits and above
    /// the accuracy threshold. Ranked by similarity; ties go to phonetic
    /// matches, then to the more frequent term.
    pub fn corrections_for(&self, word: &str) -> Vec<Correction> {
        let word_len = word.chars().count();
        let max_distance = self.config.max_edits.min((word_len / 2).min(u8::MAX as usize) as u8);
        if max_distance == 0 {
            return Vec::new();
        }

        let matcher = Matcher::new(word, max_distance);
        let sounds_alike: BTreeSet<String> = self.index.phonetic_matches(word).into_iter().collect();
        let mut corrections: Vec<Correction> = self
            .index
            .word_terms()
            .filter(|term| *term != word)
            .filter_map(|term| {
                let distance = matcher.distance(term, max_distance)?;
                let longest = word_len.max(term.chars().count()) as f64;
                let similarity = 1.0 - distance as f64 / longest;
                (similarity >= self.config.accuracy).then(|| Correction {
                    term: term.to_string(),
                    distance,
                    similarity,
                    phonetic: sounds_alike.contains(term),
                    doc_freq: self.index.doc_freq(term),
                })
            })
            .collect();

        corrections.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| b.phonetic.cmp(&a.phonetic))
                .then_with(|| b.doc_freq.cmp(&a.doc_freq))
                .then_with(|| a.term.cmp(&b.term))
        });
        corrections.truncate(self.config.max_per_word);
        corrections
    }
}
