use serde::{Serialize, Deserialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use chrono::{DateTime, SecondsFormat, Utc};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocId(pub String);

impl DocId {
    pub fn new(id: impl Into<String>) -> Self {
        DocId(id.into())
    }

    /// Fresh random id for a newly indexed document
    pub fn generate() -> Self {
        DocId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DocId {
    fn from(id: &str) -> Self {
        DocId(id.to_string())
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw field value as supplied by the host.
///
/// `Text` is analyzed; `Keyword` is matched and faceted verbatim. `List`
/// holds multi-valued fields such as tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
    Keyword(String),
    Number(f64),
    Date(DateTime<Utc>),
    Boolean(bool),
    List(Vec<FieldValue>),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn keyword(value: impl Into<String>) -> Self {
        FieldValue::Keyword(value.into())
    }

    /// String content of a text or keyword value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) | FieldValue::Keyword(s) => Some(s),
            _ => None,
        }
    }

    /// Scalar values, with lists flattened one element at a time
    pub fn scalars(&self) -> Vec<&FieldValue> {
        match self {
            FieldValue::List(items) => items.iter().flat_map(|item| item.scalars()).collect(),
            scalar => vec![scalar],
        }
    }

    /// All string contents, flattening lists
    pub fn strings(&self) -> Vec<&str> {
        self.scalars().into_iter().filter_map(|v| v.as_str()).collect()
    }

    /// Canonical string form used for facet keys and exact matching
    pub fn key_string(&self) -> String {
        match self {
            FieldValue::Text(s) | FieldValue::Keyword(s) => s.clone(),
            FieldValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            FieldValue::Date(d) => d.to_rfc3339_opts(SecondsFormat::Secs, true),
            FieldValue::Boolean(b) => b.to_string(),
            FieldValue::List(items) => items
                .iter()
                .map(|item| item.key_string())
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// Ordering between two scalars of a comparable kind.
    /// Text and keyword compare with each other; anything else must match kinds.
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Number(a), FieldValue::Number(b)) => a.partial_cmp(b),
            (FieldValue::Date(a), FieldValue::Date(b)) => Some(a.cmp(b)),
            (FieldValue::Boolean(a), FieldValue::Boolean(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_str(), b.as_str()) {
                (Some(x), Some(y)) => Some(x.cmp(y)),
                _ => None,
            },
        }
    }

    /// Equality on scalars; text and keyword compare by string content
    pub fn matches(&self, other: &FieldValue) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub index_name: String,
    pub fields: BTreeMap<String, FieldValue>,
    pub created_at: DateTime<Utc>,
    pub version: u64,
}

impl Document {
    pub fn new(id: DocId, index_name: impl Into<String>) -> Self {
        Document {
            id,
            index_name: index_name.into(),
            fields: BTreeMap::new(),
            created_at: Utc::now(),
            version: 1,
        }
    }

    pub fn add_field(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.add_field(name, value);
        self
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// String contents of a field, flattening lists
    pub fn field_strings(&self, name: &str) -> Vec<&str> {
        self.get_field(name).map(|v| v.strings()).unwrap_or_default()
    }
}
