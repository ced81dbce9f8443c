use std::collections::{BTreeMap, HashMap};
use chrono::{DateTime, Utc};
use crate::core::error::{Error, Result};
use crate::core::types::{DocId, Document, FieldValue};

/// Authoritative copy of every indexed document, keyed by id
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    documents: HashMap<DocId, Document>,
    /// Last insert or delete per index name
    last_updates: HashMap<String, DateTime<Utc>>,
    next_version: u64,
}

impl DocumentStore {
    pub fn new() -> Self {
        DocumentStore {
            next_version: 1,
            ..DocumentStore::default()
        }
    }

    /// Rejects documents that could not be indexed or persisted faithfully
    pub fn validate(index_name: &str, fields: &BTreeMap<String, FieldValue>) -> Result<()> {
        if index_name.trim().is_empty() {
            return Err(Error::invalid_input("index name must not be empty"));
        }
        for (name, value) in fields {
            if name.is_empty() {
                return Err(Error::invalid_input("field name must not be empty"));
            }
            let non_finite = value
                .scalars()
                .into_iter()
                .any(|v| matches!(v, FieldValue::Number(n) if !n.is_finite()));
            if non_finite {
                return Err(Error::invalid_input(format!(
                    "field '{}' holds a non-finite number",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Validated document under a fresh id, not yet stored
    pub fn draft(index_name: &str, fields: BTreeMap<String, FieldValue>) -> Result<Document> {
        Self::validate(index_name, &fields)?;
        let mut doc = Document::new(DocId::generate(), index_name);
        doc.fields = fields;
        Ok(doc)
    }

    /// Stores a drafted document, stamping its version
    pub fn insert(&mut self, mut doc: Document) -> &Document {
        doc.version = self.bump_version();
        self.touch(&doc.index_name, doc.created_at);
        let id = doc.id.clone();
        self.documents.entry(id).insert_entry(doc).into_mut()
    }

    /// Puts back a document as it was persisted, keeping its id and version
    pub fn restore(&mut self, doc: Document) {
        self.next_version = self.next_version.max(doc.version + 1);
        let updated = self
            .last_updates
            .entry(doc.index_name.clone())
            .or_insert(doc.created_at);
        *updated = (*updated).max(doc.created_at);
        self.documents.insert(doc.id.clone(), doc);
    }

    pub fn remove(&mut self, doc_id: &DocId) -> Option<Document> {
        let doc = self.documents.remove(doc_id)?;
        self.touch(&doc.index_name, Utc::now());
        Some(doc)
    }

    fn bump_version(&mut self) -> u64 {
        let version = self.next_version.max(1);
        self.next_version = version + 1;
        version
    }

    fn touch(&mut self, index_name: &str, at: DateTime<Utc>) {
        self.last_updates.insert(index_name.to_string(), at);
    }

    pub fn get(&self, doc_id: &DocId) -> Option<&Document> {
        self.documents.get(doc_id)
    }

    pub fn contains(&self, doc_id: &DocId) -> bool {
        self.documents.contains_key(doc_id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &DocId> {
        self.documents.keys()
    }

    pub fn count_in(&self, index_name: &str) -> usize {
        self.iter().filter(|doc| doc.index_name == index_name).count()
    }

    pub fn last_update(&self, index_name: &str) -> Option<DateTime<Utc>> {
        self.last_updates.get(index_name).copied()
    }

    /// Documents ordered by id, the form written to snapshots
    pub fn to_vec(&self) -> Vec<Document> {
        let mut docs: Vec<Document> = self.documents.values().cloned().collect();
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        docs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(title: &str) -> BTreeMap<String, FieldValue> {
        let mut fields = BTreeMap::new();
        fields.insert("title".to_string(), FieldValue::text(title));
        fields
    }

    fn insert(store: &mut DocumentStore, index: &str, fields: BTreeMap<String, FieldValue>) -> Result<Document> {
        let draft = DocumentStore::draft(index, fields)?;
        Ok(store.insert(draft).clone())
    }

    #[test]
    fn insert_assigns_distinct_ids_and_versions() {
        let mut store = DocumentStore::new();
        let a = insert(&mut store, "calls", fields("a")).unwrap();
        let b = insert(&mut store, "calls", fields("b")).unwrap();
        assert_ne!(a.id, b.id);
        assert!(b.version > a.version);
        assert_eq!(store.count_in("calls"), 2);
        assert!(store.last_update("calls").is_some());
        assert!(store.last_update("other").is_none());
    }

    #[test]
    fn rejects_unindexable_documents() {
        let mut store = DocumentStore::new();
        assert!(insert(&mut store, "  ", fields("a")).is_err());

        let mut bad = fields("a");
        bad.insert("score".into(), FieldValue::List(vec![FieldValue::Number(f64::NAN)]));
        assert!(insert(&mut store, "calls", bad).is_err());

        let mut unnamed = fields("a");
        unnamed.insert(String::new(), FieldValue::Boolean(true));
        assert!(insert(&mut store, "calls", unnamed).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn remove_and_restore() {
        let mut store = DocumentStore::new();
        let doc = insert(&mut store, "calls", fields("a")).unwrap();
        assert_eq!(store.remove(&doc.id).map(|d| d.id), Some(doc.id.clone()));
        assert!(store.remove(&doc.id).is_none());

        store.restore(doc.clone());
        assert!(store.contains(&doc.id));
        let next = insert(&mut store, "calls", fields("b")).unwrap();
        assert!(next.version > doc.version);
    }
}
