use rayon::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};
use crate::analysis::analyzer::Analyzer;
use crate::core::error::Error;
use crate::core::types::{DocId, Document};
use crate::index::term_vector::TermVector;
use crate::schema::schema::Schema;

/// Outcome of analyzing a batch of documents
#[derive(Debug, Default)]
pub struct IndexedBatch {
    pub vectors: Vec<(DocId, TermVector)>,
    pub failures: Vec<(DocId, Error)>,
}

/// Parallel document analyzer for rebuilds and batch inserts
pub struct ParallelIndexer<'a> {
    pub analyzer: &'a Analyzer,
    pub schema: &'a Schema,
    pub max_field_bytes: usize,
    pub progress: Arc<AtomicUsize>,
}

impl<'a> ParallelIndexer<'a> {
    pub fn new(analyzer: &'a Analyzer, schema: &'a Schema, max_field_bytes: usize) -> Self {
        ParallelIndexer {
            analyzer,
            schema,
            max_field_bytes,
            progress: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get current progress
    pub fn get_progress(&self) -> usize {
        self.progress.load(Ordering::Relaxed)
    }

    /// Builds term vectors for every document. A document that fails to
    /// analyze is reported in `failures` and does not stop the others.
    pub fn index_batch(&self, documents: &[Document]) -> IndexedBatch {
        self.progress.store(0, Ordering::Relaxed);
        let total_docs = documents.len();

        let results: Vec<(DocId, Result<TermVector, Error>)> = documents
            .par_iter()
            .map(|doc| {
                let result = TermVector::build(doc, self.analyzer, self.schema, self.max_field_bytes);
                let current = self.progress.fetch_add(1, Ordering::Relaxed) + 1;
                if current % 10_000 == 0 {
                    debug!(current, total_docs, "indexing progress");
                }
                (doc.id.clone(), result)
            })
            .collect();

        let mut batch = IndexedBatch::default();
        for (doc_id, result) in results {
            match result {
                Ok(vector) => batch.vectors.push((doc_id, vector)),
                Err(err) => {
                    warn!(doc_id = %doc_id, error = %err, "document skipped during indexing");
                    batch.failures.push((doc_id, err));
                }
            }
        }
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::FieldValue;

    #[test]
    fn failures_do_not_abort_the_batch() {
        let analyzer = Analyzer::default();
        let schema = Schema::default();
        let docs: Vec<Document> = ["short", "this one is far too long", "fine"]
            .iter()
            .enumerate()
            .map(|(i, text)| {
                Document::new(DocId::new(format!("d{}", i)), "idx")
                    .with_field("content", FieldValue::text(*text))
            })
            .collect();

        let indexer = ParallelIndexer::new(&analyzer, &schema, 10);
        let batch = indexer.index_batch(&docs);
        assert_eq!(batch.vectors.len(), 2);
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].0, DocId::from("d1"));
        assert_eq!(indexer.get_progress(), 3);
    }
}
