use serde::{Serialize, Deserialize};
use crate::core::error::{Error, Result};
use crate::core::types::FieldValue;

/// Full search request: free text plus the structured parts applied to its
/// matches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    /// Restricts candidates to one logical index
    pub index_name: Option<String>,
    pub filters: Vec<Filter>,       // ANDed, applied after scoring
    pub facets: Vec<FacetRequest>,
    pub sort: Vec<SortKey>,         // Empty = descending score
    pub from: usize,
    pub size: Option<usize>,        // None = engine default
    pub highlight: Option<HighlightRequest>,
    pub suggest: bool,
    pub min_score: Option<f32>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Query {
            text: text.into(),
            index_name: None,
            filters: Vec::new(),
            facets: Vec::new(),
            sort: Vec::new(),
            from: 0,
            size: None,
            highlight: None,
            suggest: false,
            min_score: None,
        }
    }

    /// Matches every document (of the index, when one is set)
    pub fn match_all() -> Self {
        Query::new("")
    }

    pub fn in_index(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = Some(index_name.into());
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn facet(mut self, facet: FacetRequest) -> Self {
        self.facets.push(facet);
        self
    }

    pub fn sort_by(mut self, key: SortKey) -> Self {
        self.sort.push(key);
        self
    }

    pub fn from(mut self, from: usize) -> Self {
        self.from = from;
        self
    }

    pub fn size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn highlight(mut self, request: HighlightRequest) -> Self {
        self.highlight = Some(request);
        self
    }

    pub fn with_suggestions(mut self) -> Self {
        self.suggest = true;
        self
    }

    pub fn min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }
}

/// Structured filter on raw (unanalyzed) field values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    Term { field: String, value: FieldValue },
    Terms { field: String, values: Vec<FieldValue> },
    Range(RangeFilter),
    Exists { field: String },
    Prefix { field: String, prefix: String },
    Wildcard { field: String, pattern: String },    // * and ? globs
    Regexp { field: String, pattern: String },
}

impl Filter {
    pub fn term(field: &str, value: FieldValue) -> Self {
        Filter::Term { field: field.to_string(), value }
    }

    pub fn terms(field: &str, values: Vec<FieldValue>) -> Self {
        Filter::Terms { field: field.to_string(), values }
    }

    pub fn exists(field: &str) -> Self {
        Filter::Exists { field: field.to_string() }
    }

    pub fn prefix(field: &str, prefix: &str) -> Self {
        Filter::Prefix { field: field.to_string(), prefix: prefix.to_string() }
    }

    pub fn wildcard(field: &str, pattern: &str) -> Self {
        Filter::Wildcard { field: field.to_string(), pattern: pattern.to_string() }
    }

    pub fn regexp(field: &str, pattern: &str) -> Self {
        Filter::Regexp { field: field.to_string(), pattern: pattern.to_string() }
    }

    /// Builds a filter from a host-supplied operator name
    pub fn from_operator(field: &str, operator: &str, value: FieldValue) -> Result<Self> {
        let text = |value: FieldValue| -> Result<String> {
            value.as_str().map(str::to_string).ok_or_else(|| {
                Error::query(format!("operator '{}' on '{}' needs a string value", operator, field))
            })
        };

        let filter = match operator {
            "term" | "eq" => Filter::term(field, value),
            "terms" | "in" => match value {
                FieldValue::List(values) => Filter::terms(field, values),
                single => Filter::terms(field, vec![single]),
            },
            "gt" => Filter::Range(RangeFilter::new(field).gt(value)),
            "gte" => Filter::Range(RangeFilter::new(field).gte(value)),
            "lt" => Filter::Range(RangeFilter::new(field).lt(value)),
            "lte" => Filter::Range(RangeFilter::new(field).lte(value)),
            "exists" => Filter::exists(field),
            "prefix" => Filter::prefix(field, &text(value)?),
            "wildcard" => Filter::wildcard(field, &text(value)?),
            "regexp" => Filter::regexp(field, &text(value)?),
            other => return Err(Error::query(format!("unsupported operator '{}'", other))),
        };
        Ok(filter)
    }

    pub fn field(&self) -> &str {
        match self {
            Filter::Term { field, .. }
            | Filter::Terms { field, .. }
            | Filter::Exists { field }
            | Filter::Prefix { field, .. }
            | Filter::Wildcard { field, .. }
            | Filter::Regexp { field, .. } => field,
            Filter::Range(range) => &range.field,
        }
    }
}

/// Range on numeric, date or string values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeFilter {
    pub field: String,
    pub gt: Option<FieldValue>,   // Greater than
    pub gte: Option<FieldValue>,  // Greater than or equal
    pub lt: Option<FieldValue>,   // Less than
    pub lte: Option<FieldValue>,  // Less than or equal
}

impl RangeFilter {
    pub fn new(field: &str) -> Self {
        RangeFilter {
            field: field.to_string(),
            gt: None,
            gte: None,
            lt: None,
            lte: None,
        }
    }

    pub fn gt(mut self, value: FieldValue) -> Self {
        self.gt = Some(value);
        self
    }

    pub fn gte(mut self, value: FieldValue) -> Self {
        self.gte = Some(value);
        self
    }

    pub fn lt(mut self, value: FieldValue) -> Self {
        self.lt = Some(value);
        self
    }

    pub fn lte(mut self, value: FieldValue) -> Self {
        self.lte = Some(value);
        self
    }
}

/// Pseudo-field naming the relevance score in sort keys
pub const SCORE_FIELD: &str = "_score";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Where documents lacking the sort field go
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MissingValue {
    First,
    Last,
    /// Sort as if the document held this value
    Value(FieldValue),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    pub order: SortOrder,
    pub missing: MissingValue,
}

impl SortKey {
    pub fn asc(field: &str) -> Self {
        SortKey {
            field: field.to_string(),
            order: SortOrder::Asc,
            missing: MissingValue::Last,
        }
    }

    pub fn desc(field: &str) -> Self {
        SortKey {
            order: SortOrder::Desc,
            ..SortKey::asc(field)
        }
    }

    pub fn score() -> Self {
        SortKey::desc(SCORE_FIELD)
    }

    pub fn missing(mut self, missing: MissingValue) -> Self {
        self.missing = missing;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FacetOrder {
    CountDesc,
    CountAsc,
    KeyAsc,
    KeyDesc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetRequest {
    pub name: String,
    pub field: String,
    pub size: usize,
    pub min_doc_count: usize,
    /// When non-empty, only these values form buckets
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub order: FacetOrder,
    /// Bucket key for matching documents without the field
    pub missing: Option<String>,
}

impl FacetRequest {
    pub fn new(name: &str, field: &str) -> Self {
        FacetRequest {
            name: name.to_string(),
            field: field.to_string(),
            size: 10,
            min_doc_count: 1,
            include: Vec::new(),
            exclude: Vec::new(),
            order: FacetOrder::CountDesc,
            missing: None,
        }
    }

    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn min_doc_count(mut self, min_doc_count: usize) -> Self {
        self.min_doc_count = min_doc_count;
        self
    }

    pub fn include(mut self, values: &[&str]) -> Self {
        self.include = values.iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn exclude(mut self, values: &[&str]) -> Self {
        self.exclude = values.iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn order(mut self, order: FacetOrder) -> Self {
        self.order = order;
        self
    }

    pub fn missing(mut self, placeholder: &str) -> Self {
        self.missing = Some(placeholder.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightRequest {
    /// Empty = every analyzed text field of the hit
    pub fields: Vec<String>,
    pub pre_tag: String,
    pub post_tag: String,
    /// Characters of context per fragment; 0 returns the whole field
    pub fragment_size: usize,
    pub number_of_fragments: usize,
}

impl Default for HighlightRequest {
    fn default() -> Self {
        HighlightRequest {
            fields: Vec::new(),
            pre_tag: "<em>".to_string(),
            post_tag: "</em>".to_string(),
            fragment_size: 100,
            number_of_fragments: 3,
        }
    }
}

impl HighlightRequest {
    pub fn fields(fields: &[&str]) -> Self {
        HighlightRequest {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            ..HighlightRequest::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operators_map_to_filters() {
        let f = Filter::from_operator("speaker", "eq", FieldValue::keyword("ada")).unwrap();
        assert_eq!(f, Filter::term("speaker", FieldValue::keyword("ada")));

        let f = Filter::from_operator("minutes", "gte", FieldValue::Number(5.0)).unwrap();
        assert_eq!(f.field(), "minutes");
        assert!(matches!(f, Filter::Range(RangeFilter { gte: Some(_), .. })));

        let f = Filter::from_operator("lang", "in", FieldValue::keyword("en")).unwrap();
        assert_eq!(f, Filter::terms("lang", vec![FieldValue::keyword("en")]));
    }

    #[test]
    fn unknown_operator_and_bad_value_are_query_errors() {
        let err = Filter::from_operator("title", "near", FieldValue::text("x")).unwrap_err();
        assert!(err.is_query_error());
        let err = Filter::from_operator("title", "prefix", FieldValue::Number(1.0)).unwrap_err();
        assert!(err.is_query_error());
    }

    #[test]
    fn builder_collects_parts() {
        let query = Query::new("budget")
            .in_index("calls")
            .filter(Filter::exists("speaker"))
            .sort_by(SortKey::score())
            .facet(FacetRequest::new("by_speaker", "speaker").size(3))
            .from(10)
            .size(5)
            .with_suggestions();
        assert_eq!(query.index_name.as_deref(), Some("calls"));
        assert_eq!(query.sort[0].field, SCORE_FIELD);
        assert_eq!(query.facets[0].size, 3);
        assert_eq!((query.from, query.size), (10, Some(5)));
        assert!(query.suggest);
    }

    #[test]
    fn queries_serialize() {
        let query = Query::new("fox").filter(Filter::Range(RangeFilter::new("n").lt(FieldValue::Number(3.0))));
        let json = serde_json::to_string(&query).unwrap();
        let back: Query = serde_json::from_str(&json).unwrap();
        assert_eq!(back, query);
    }
}
