use std::collections::{BTreeMap, BinaryHeap};
use std::cmp::Ordering;
use serde::{Deserialize, Serialize};
use crate::core::types::{DocId, Document};
use crate::search::facet::FacetResult;
use crate::suggest::Suggestions;

/// Search results container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    /// Matches after filtering, before pagination
    pub total_hits: usize,
    pub hits: Vec<ScoredDocument>,
    pub max_score: f32,
    pub aggregations: BTreeMap<String, FacetResult>,
    pub suggestions: Option<Suggestions>,
    pub took_ms: u64,
}

impl SearchResults {
    pub fn ids(&self) -> Vec<&DocId> {
        self.hits.iter().map(|hit| &hit.id).collect()
    }
}

/// Document with relevance score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub id: DocId,
    pub score: f32,
    pub source: Document,
    /// Field name -> highlighted fragments
    pub highlights: BTreeMap<String, Vec<String>>,
}

/// Id and score of a document that passed scoring
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub id: DocId,
    pub score: f32,
}

// Ordered by rank: a candidate that should be listed earlier compares Less.
// Descending score, ties by ascending id.
impl Ord for ScoredCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for ScoredCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScoredCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoredCandidate {}

/// Top-K collector for efficient result collection
pub struct TopKCollector {
    // Max-heap on rank order: the top of the heap is the worst kept candidate
    pub heap: BinaryHeap<ScoredCandidate>,
    pub k: usize,
    pub total_collected: usize,  // Track total documents processed
}

impl TopKCollector {
    pub fn new(k: usize) -> Self {
        TopKCollector {
            heap: BinaryHeap::with_capacity(k.saturating_add(1).min(1024)),
            k,
            total_collected: 0,
        }
    }

    pub fn collect(&mut self, candidate: ScoredCandidate) {
        self.total_collected += 1;

        if self.k == 0 {
            return;
        }
        if self.heap.len() < self.k {
            self.heap.push(candidate);
        } else if let Some(worst) = self.heap.peek() {
            if candidate < *worst {
                self.heap.pop();
                self.heap.push(candidate);
            }
        }
    }

    /// Kept candidates, best first
    pub fn get_results(self) -> Vec<ScoredCandidate> {
        self.heap.into_sorted_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, score: f32) -> ScoredCandidate {
        ScoredCandidate { id: DocId::from(id), score }
    }

    #[test]
    fn keeps_best_k_in_rank_order() {
        let mut collector = TopKCollector::new(3);
        for (id, score) in [("a", 0.5), ("b", 2.0), ("c", 1.0), ("d", 2.0), ("e", 0.1)] {
            collector.collect(candidate(id, score));
        }
        assert_eq!(collector.total_collected, 5);

        let ids: Vec<String> = collector.get_results().into_iter().map(|c| c.id.0).collect();
        assert_eq!(ids, vec!["b", "d", "c"]);
    }

    #[test]
    fn zero_k_only_counts() {
        let mut collector = TopKCollector::new(0);
        collector.collect(candidate("a", 1.0));
        assert_eq!(collector.total_collected, 1);
        assert!(collector.get_results().is_empty());
    }
}
