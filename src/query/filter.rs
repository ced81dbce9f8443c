use std::cmp::Ordering;
use regex::Regex;
use crate::core::error::{Error, Result};
use crate::core::types::{Document, FieldValue};
use crate::query::ast::{Filter, RangeFilter};

/// Filter checked and ready to run; patterns are compiled once per query
#[derive(Debug, Clone)]
pub enum CompiledFilter {
    Term { field: String, value: FieldValue },
    Terms { field: String, values: Vec<FieldValue> },
    Range(RangeFilter),
    Exists { field: String },
    Prefix { field: String, prefix: String },
    Pattern { field: String, regex: Regex },
}

/// Validates every filter, failing on the first invalid one
pub fn compile(filters: &[Filter]) -> Result<Vec<CompiledFilter>> {
    filters.iter().map(CompiledFilter::compile).collect()
}

/// Logical AND over the compiled filters
pub fn matches_all(filters: &[CompiledFilter], doc: &Document) -> bool {
    filters.iter().all(|filter| filter.matches(doc))
}

/// Translates a `*`/`?` glob into an anchored regular expression
pub fn wildcard_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 8);
    regex.push('^');
    let mut literal = String::new();
    for ch in pattern.chars() {
        match ch {
            '*' | '?' => {
                regex.push_str(&regex::escape(&literal));
                literal.clear();
                regex.push_str(if ch == '*' { ".*" } else { "." });
            }
            _ => literal.push(ch),
        }
    }
    regex.push_str(&regex::escape(&literal));
    regex.push('$');
    regex
}

fn check_scalar(field: &str, value: &FieldValue) -> Result<()> {
    match value {
        FieldValue::List(_) => Err(Error::query(format!(
            "filter on '{}' expects a single value, got a list",
            field
        ))),
        FieldValue::Number(n) if !n.is_finite() => Err(Error::query(format!(
            "filter on '{}' has a non-finite number",
            field
        ))),
        _ => Ok(()),
    }
}

impl CompiledFilter {
    pub fn compile(filter: &Filter) -> Result<Self> {
        if filter.field().is_empty() {
            return Err(Error::query("filter with empty field name"));
        }

        let compiled = match filter {
            Filter::Term { field, value } => {
                check_scalar(field, value)?;
                CompiledFilter::Term { field: field.clone(), value: value.clone() }
            }
            Filter::Terms { field, values } => {
                if values.is_empty() {
                    return Err(Error::query(format!("terms filter on '{}' has no values", field)));
                }
                for value in values {
                    check_scalar(field, value)?;
                }
                CompiledFilter::Terms { field: field.clone(), values: values.clone() }
            }
            Filter::Range(range) => {
                let bounds = [&range.gt, &range.gte, &range.lt, &range.lte];
                if bounds.iter().all(|b| b.is_none()) {
                    return Err(Error::query(format!("range filter on '{}' has no bounds", range.field)));
                }
                for bound in bounds.into_iter().flatten() {
                    check_scalar(&range.field, bound)?;
                }
                CompiledFilter::Range(range.clone())
            }
            Filter::Exists { field } => CompiledFilter::Exists { field: field.clone() },
            Filter::Prefix { field, prefix } => CompiledFilter::Prefix {
                field: field.clone(),
                prefix: prefix.clone(),
            },
            Filter::Wildcard { field, pattern } => CompiledFilter::Pattern {
                field: field.clone(),
                regex: Regex::new(&wildcard_to_regex(pattern))?,
            },
            Filter::Regexp { field, pattern } => CompiledFilter::Pattern {
                field: field.clone(),
                regex: Regex::new(&format!("^(?:{})$", pattern))?,
            },
        };
        Ok(compiled)
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            CompiledFilter::Term { field, value } => {
                any_scalar(doc, field, |v| v.matches(value))
            }
            CompiledFilter::Terms { field, values } => {
                any_scalar(doc, field, |v| values.iter().any(|candidate| v.matches(candidate)))
            }
            CompiledFilter::Range(range) => {
                any_scalar(doc, &range.field, |v| in_range(v, range))
            }
            CompiledFilter::Exists { field } => any_scalar(doc, field, |_| true),
            CompiledFilter::Prefix { field, prefix } => {
                any_scalar(doc, field, |v| v.as_str().is_some_and(|s| s.starts_with(prefix.as_str())))
            }
            CompiledFilter::Pattern { field, regex } => {
                any_scalar(doc, field, |v| v.as_str().is_some_and(|s| regex.is_match(s)))
            }
        }
    }
}

/// Multi-valued fields match when any element does
fn any_scalar<F>(doc: &Document, field: &str, predicate: F) -> bool
where
    F: Fn(&FieldValue) -> bool,
{
    doc.get_field(field)
        .map(|value| value.scalars().into_iter().any(predicate))
        .unwrap_or(false)
}

fn in_range(value: &FieldValue, range: &RangeFilter) -> bool {
    let satisfies = |bound: &Option<FieldValue>, accept: fn(Ordering) -> bool| match bound {
        Some(bound) => value.compare(bound).is_some_and(accept),
        None => true,
    };

    satisfies(&range.gt, |o| o == Ordering::Greater)
        && satisfies(&range.gte, |o| o != Ordering::Less)
        && satisfies(&range.lt, |o| o == Ordering::Less)
        && satisfies(&range.lte, |o| o != Ordering::Greater)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use crate::core::types::DocId;

    fn doc() -> Document {
        Document::new(DocId::from("d"), "calls")
            .with_field("speaker", FieldValue::keyword("Ada Lovelace"))
            .with_field("minutes", FieldValue::Number(42.0))
            .with_field("tags", FieldValue::List(vec![
                FieldValue::keyword("finance"),
                FieldValue::keyword("weekly"),
            ]))
            .with_field("recorded", FieldValue::Date(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()))
    }

    fn passes(filter: Filter) -> bool {
        CompiledFilter::compile(&filter).unwrap().matches(&doc())
    }

    #[test]
    fn term_and_terms_match_raw_values() {
        assert!(passes(Filter::term("speaker", FieldValue::keyword("Ada Lovelace"))));
        assert!(!passes(Filter::term("speaker", FieldValue::keyword("ada lovelace"))));
        assert!(passes(Filter::term("tags", FieldValue::keyword("weekly"))));
        assert!(passes(Filter::terms("tags", vec![
            FieldValue::keyword("daily"),
            FieldValue::keyword("finance"),
        ])));
        assert!(!passes(Filter::term("missing", FieldValue::keyword("x"))));
    }

    #[test]
    fn range_bounds_are_inclusive_or_exclusive() {
        let range = |r: RangeFilter| passes(Filter::Range(r));
        assert!(range(RangeFilter::new("minutes").gte(FieldValue::Number(42.0))));
        assert!(!range(RangeFilter::new("minutes").gt(FieldValue::Number(42.0))));
        assert!(range(RangeFilter::new("minutes").gt(FieldValue::Number(10.0)).lt(FieldValue::Number(50.0))));
        assert!(!range(RangeFilter::new("minutes").lt(FieldValue::Number(42.0))));
        assert!(range(RangeFilter::new("minutes").lte(FieldValue::Number(42.0))));

        let march = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert!(range(RangeFilter::new("recorded").gte(FieldValue::Date(march))));
        // Type mismatch never matches
        assert!(!range(RangeFilter::new("minutes").gte(FieldValue::keyword("a"))));
    }

    #[test]
    fn exists_prefix_and_patterns() {
        assert!(passes(Filter::exists("tags")));
        assert!(!passes(Filter::exists("summary")));
        assert!(passes(Filter::prefix("speaker", "Ada")));
        assert!(!passes(Filter::prefix("speaker", "Love")));
        assert!(passes(Filter::wildcard("speaker", "Ada*")));
        assert!(passes(Filter::wildcard("tags", "w??kly")));
        assert!(!passes(Filter::wildcard("speaker", "Ada")));
        assert!(!passes(Filter::wildcard("speaker", "Ada L.v*")));
        assert!(passes(Filter::regexp("speaker", "Ada .*")));
        assert!(!passes(Filter::regexp("speaker", "Lovelace")));
    }

    #[test]
    fn invalid_filters_are_query_errors() {
        let bad = [
            Filter::regexp("speaker", "(unclosed"),
            Filter::terms("tags", vec![]),
            Filter::Range(RangeFilter::new("minutes")),
            Filter::term("minutes", FieldValue::Number(f64::NAN)),
            Filter::term("tags", FieldValue::List(vec![])),
            Filter::exists(""),
        ];
        for filter in bad {
            let err = CompiledFilter::compile(&filter).unwrap_err();
            assert!(err.is_query_error(), "{:?}", filter);
        }
    }

    #[test]
    fn all_filters_must_pass() {
        let filters = compile(&[
            Filter::exists("speaker"),
            Filter::term("tags", FieldValue::keyword("finance")),
        ]).unwrap();
        assert!(matches_all(&filters, &doc()));

        let filters = compile(&[
            Filter::exists("speaker"),
            Filter::term("tags", FieldValue::keyword("sales")),
        ]).unwrap();
        assert!(!matches_all(&filters, &doc()));
    }
}
