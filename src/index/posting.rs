use crate::core::types::DocId;

/// Set of documents containing a term.
/// Note: Kept sorted by doc id so membership and removal are binary searches
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostingList {
    pub doc_ids: Vec<DocId>,
}

impl PostingList {
    pub fn new() -> Self {
        PostingList {
            doc_ids: Vec::new(),
        }
    }

    /// Returns false when the id was already present
    pub fn add(&mut self, doc_id: &DocId) -> bool {
        match self.doc_ids.binary_search(doc_id) {
            Ok(_) => false,
            Err(pos) => {
                self.doc_ids.insert(pos, doc_id.clone());
                true
            }
        }
    }

    /// Returns false when the id was not present
    pub fn remove(&mut self, doc_id: &DocId) -> bool {
        match self.doc_ids.binary_search(doc_id) {
            Ok(pos) => {
                self.doc_ids.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    pub fn contains(&self, doc_id: &DocId) -> bool {
        self.doc_ids.binary_search(doc_id).is_ok()
    }

    pub fn len(&self) -> usize {
        self.doc_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_ids.is_empty()
    }

    pub fn doc_freq(&self) -> u32 {
        self.doc_ids.len() as u32
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocId> {
        self.doc_ids.iter()
    }
}
