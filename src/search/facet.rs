use std::collections::{BTreeSet, HashMap};
use serde::{Deserialize, Serialize};
use crate::core::types::Document;
use crate::query::ast::{FacetOrder, FacetRequest};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetBucket {
    pub key: String,
    pub doc_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetResult {
    pub buckets: Vec<FacetBucket>,
    /// Counts of every bucket not returned: cut by size, min_doc_count,
    /// include or exclude
    pub sum_other_doc_count: usize,
}

impl FacetResult {
    pub fn total(&self) -> usize {
        self.buckets.iter().map(|b| b.doc_count).sum::<usize>() + self.sum_other_doc_count
    }
}

/// Counts field values over `docs`.
///
/// A document adds one to each distinct value it holds, so for single-valued
/// fields the total equals the number of documents having the field (plus
/// those counted under the `missing` placeholder).
pub fn aggregate<'a, I>(request: &FacetRequest, docs: I) -> FacetResult
where
    I: IntoIterator<Item = &'a Document>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();

    for doc in docs {
        let keys: BTreeSet<String> = doc
            .get_field(&request.field)
            .map(|value| value.scalars().into_iter().map(|v| v.key_string()).collect())
            .unwrap_or_default();

        if keys.is_empty() {
            if let Some(placeholder) = &request.missing {
                *counts.entry(placeholder.clone()).or_insert(0) += 1;
            }
            continue;
        }
        for key in keys {
            *counts.entry(key).or_insert(0) += 1;
        }
    }

    let mut sum_other_doc_count = 0;
    let mut buckets = Vec::with_capacity(counts.len());
    for (key, doc_count) in counts {
        let allowed = doc_count >= request.min_doc_count
            && (request.include.is_empty() || request.include.contains(&key))
            && !request.exclude.contains(&key);
        if allowed {
            buckets.push(FacetBucket { key, doc_count });
        } else {
            sum_other_doc_count += doc_count;
        }
    }

    sort_buckets(&mut buckets, request.order);

    if buckets.len() > request.size {
        sum_other_doc_count += buckets[request.size..].iter().map(|b| b.doc_count).sum::<usize>();
        buckets.truncate(request.size);
    }

    FacetResult {
        buckets,
        sum_other_doc_count,
    }
}

fn sort_buckets(buckets: &mut [FacetBucket], order: FacetOrder) {
    buckets.sort_by(|a, b| match order {
        FacetOrder::CountDesc => b.doc_count.cmp(&a.doc_count).then_with(|| a.key.cmp(&b.key)),
        FacetOrder::CountAsc => a.doc_count.cmp(&b.doc_count).then_with(|| a.key.cmp(&b.key)),
        FacetOrder::KeyAsc => a.key.cmp(&b.key),
        FacetOrder::KeyDesc => b.key.cmp(&a.key),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{DocId, FieldValue};

    fn corpus() -> Vec<Document> {
        let speakers = ["ada", "ada", "grace", "alan", "ada", "grace"];
        let mut docs: Vec<Document> = speakers
            .iter()
            .enumerate()
            .map(|(i, s)| {
                Document::new(DocId::new(format!("d{}", i)), "calls")
                    .with_field("speaker", FieldValue::keyword(*s))
            })
            .collect();
        docs.push(Document::new(DocId::from("anon"), "calls"));
        docs
    }

    fn keys(result: &FacetResult) -> Vec<(&str, usize)> {
        result.buckets.iter().map(|b| (b.key.as_str(), b.doc_count)).collect()
    }

    #[test]
    fn counts_and_orders_by_count() {
        let result = aggregate(&FacetRequest::new("s", "speaker"), &corpus());
        assert_eq!(keys(&result), vec![("ada", 3), ("grace", 2), ("alan", 1)]);
        assert_eq!(result.sum_other_doc_count, 0);
        assert_eq!(result.total(), 6);
    }

    #[test]
    fn truncation_moves_counts_to_other() {
        let result = aggregate(&FacetRequest::new("s", "speaker").size(1), &corpus());
        assert_eq!(keys(&result), vec![("ada", 3)]);
        assert_eq!(result.sum_other_doc_count, 3);
        assert_eq!(result.total(), 6);
    }

    #[test]
    fn filters_and_missing_placeholder_keep_conservation() {
        let request = FacetRequest::new("s", "speaker")
            .min_doc_count(2)
            .exclude(&["grace"])
            .missing("(none)");
        let result = aggregate(&request, &corpus());
        assert_eq!(keys(&result), vec![("ada", 3)]);
        assert_eq!(result.total(), 7);

        let request = FacetRequest::new("s", "speaker").include(&["alan", "grace"]).order(FacetOrder::KeyAsc);
        let result = aggregate(&request, &corpus());
        assert_eq!(keys(&result), vec![("alan", 1), ("grace", 2)]);
        assert_eq!(result.sum_other_doc_count, 3);
    }

    #[test]
    fn multi_valued_fields_count_each_distinct_value_once() {
        let docs = vec![
            Document::new(DocId::from("a"), "i").with_field("tags", FieldValue::List(vec![
                FieldValue::keyword("x"),
                FieldValue::keyword("y"),
                FieldValue::keyword("x"),
            ])),
            Document::new(DocId::from("b"), "i").with_field("tags", FieldValue::List(vec![
                FieldValue::keyword("x"),
            ])),
        ];
        let result = aggregate(&FacetRequest::new("t", "tags"), &docs);
        assert_eq!(keys(&result), vec![("x", 2), ("y", 1)]);
    }
}
