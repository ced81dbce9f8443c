use serde::{Serialize, Deserialize};
use crate::core::error::{Error, Result};
use crate::core::types::FieldValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    /// Tokenized and indexed into postings
    Text,
    /// Exact-match filters and facets only
    Keyword,
    Number,
    Date,
    Boolean,
}

impl FieldType {
    /// Type a value carries when its field is not declared
    pub fn infer(value: &FieldValue) -> FieldType {
        match value {
            FieldValue::Text(_) => FieldType::Text,
            FieldValue::Keyword(_) => FieldType::Keyword,
            FieldValue::Number(_) => FieldType::Number,
            FieldValue::Date(_) => FieldType::Date,
            FieldValue::Boolean(_) => FieldType::Boolean,
            FieldValue::List(items) => items
                .first()
                .map(FieldType::infer)
                .unwrap_or(FieldType::Keyword),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    pub field_type: FieldType,
    /// Multiplier applied to this field's TF-IDF contribution
    pub boost: f32,
}

/// Declared fields and their scoring weights. Undeclared fields are typed by
/// their value and weighted 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<FieldDefinition>,
}

impl Default for Schema {
    fn default() -> Self {
        Schema::new()
            .add_field("title", FieldType::Text, 2.0)
            .add_field("content", FieldType::Text, 1.0)
            .add_field("tags", FieldType::Text, 1.0)
    }
}

impl Schema {
    pub fn new() -> Self {
        Schema { fields: Vec::new() }
    }

    pub fn add_field(mut self, name: &str, field_type: FieldType, boost: f32) -> Self {
        self.fields.retain(|f| f.name != name);
        self.fields.push(FieldDefinition {
            name: name.to_string(),
            field_type,
            boost,
        });
        self
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_type(&self, name: &str, value: &FieldValue) -> FieldType {
        self.get_field(name)
            .map(|f| f.field_type)
            .unwrap_or_else(|| FieldType::infer(value))
    }

    pub fn is_analyzed(&self, name: &str, value: &FieldValue) -> bool {
        self.field_type(name, value) == FieldType::Text
    }

    pub fn boost(&self, name: &str) -> f32 {
        self.get_field(name).map(|f| f.boost).unwrap_or(1.0)
    }

    pub fn validate(&self) -> Result<()> {
        for field in &self.fields {
            if field.name.is_empty() {
                return Err(Error::invalid_input("schema field with empty name"));
            }
            if !field.boost.is_finite() || field.boost < 0.0 {
                return Err(Error::invalid_input(format!(
                    "field '{}' has invalid boost {}",
                    field.name, field.boost
                )));
            }
        }
        Ok(())
    }
}
