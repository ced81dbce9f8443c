use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use crate::core::types::Document;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    /// Field value as stored
    pub text: String,
    /// Characters beyond the typed prefix
    pub overshoot: usize,
}

/// Field values starting with `prefix`, case-insensitively.
///
/// Values differing only in case collapse into one (the lexicographically
/// smallest spelling). Ranked by overshoot, then alphabetically.
pub fn complete<'a, I>(prefix: &str, documents: I, field: &str, size: usize) -> Vec<Completion>
where
    I: IntoIterator<Item = &'a Document>,
{
    let needle = prefix.trim().to_lowercase();
    if needle.is_empty() || size == 0 {
        return Vec::new();
    }
    let needle_len = needle.chars().count();

    let mut by_key: BTreeMap<String, &str> = BTreeMap::new();
    for doc in documents {
        for value in doc.field_strings(field) {
            let key = value.to_lowercase();
            if !key.starts_with(&needle) {
                continue;
            }
            by_key
                .entry(key)
                .and_modify(|kept| *kept = (*kept).min(value))
                .or_insert(value);
        }
    }

    let mut completions: Vec<Completion> = by_key
        .into_iter()
        .map(|(key, text)| Completion {
            text: text.to_string(),
            overshoot: key.chars().count().saturating_sub(needle_len),
        })
        .collect();

    completions.sort_by(|a, b| {
        a.overshoot
            .cmp(&b.overshoot)
            .then_with(|| a.text.to_lowercase().cmp(&b.text.to_lowercase()))
    });
    completions.truncate(size);
    completions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{DocId, FieldValue};

    fn docs(titles: &[&str]) -> Vec<Document> {
        titles
            .iter()
            .enumerate()
            .map(|(i, t)| {
                Document::new(DocId::new(format!("d{}", i)), "idx")
                    .with_field("title", FieldValue::text(*t))
            })
            .collect()
    }

    fn texts(completions: &[Completion]) -> Vec<&str> {
        completions.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn shortest_overshoot_first() {
        let corpus = docs(&["Quarterly planning", "Quick sync", "Quiz night", "Budget"]);
        let got = complete("qu", &corpus, "title", 5);
        assert_eq!(texts(&got), vec!["Quick sync", "Quiz night", "Quarterly planning"]);
        assert_eq!(got[0].overshoot, 8);
    }

    #[test]
    fn case_insensitive_and_deduplicated() {
        let corpus = docs(&["quick sync", "Quick Sync", "QUICK SYNC", "Quick"]);
        let got = complete("QUI", &corpus, "title", 5);
        assert_eq!(texts(&got), vec!["Quick", "QUICK SYNC"]);
    }

    #[test]
    fn capped_and_blank_prefix_is_empty() {
        let corpus = docs(&["aa", "ab", "ac"]);
        assert_eq!(complete("a", &corpus, "title", 2).len(), 2);
        assert!(complete("  ", &corpus, "title", 5).is_empty());
        assert!(complete("a", &corpus, "missing", 5).is_empty());
    }
}
