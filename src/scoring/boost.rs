use chrono::{DateTime, Utc};
use crate::core::config::{RecencyConfig, RelevanceConfig};
use crate::core::types::{Document, FieldValue};

const MILLIS_PER_DAY: f64 = 86_400_000.0;
const MIN_RECENCY_FACTOR: f64 = 0.1;

/// Exponential decay on document age past a grace offset
#[derive(Debug, Clone)]
pub struct RecencyBoost {
    pub config: RecencyConfig,
}

impl RecencyBoost {
    pub fn new(config: RecencyConfig) -> Self {
        RecencyBoost { config }
    }

    /// Timestamp the age is measured from: the configured date field when the
    /// document has a usable one, its creation time otherwise
    pub fn timestamp(&self, doc: &Document) -> DateTime<Utc> {
        self.config
            .field
            .as_deref()
            .and_then(|name| doc.get_field(name))
            .and_then(|value| match value {
                FieldValue::Date(date) => Some(*date),
                FieldValue::Text(s) | FieldValue::Keyword(s) => DateTime::parse_from_rfc3339(s)
                    .ok()
                    .map(|d| d.with_timezone(&Utc)),
                _ => None,
            })
            .unwrap_or(doc.created_at)
    }

    pub fn factor(&self, doc: &Document, now: DateTime<Utc>) -> f32 {
        if !self.config.enabled {
            return 1.0;
        }

        let age_days = ((now - self.timestamp(doc)).num_milliseconds() as f64 / MILLIS_PER_DAY).max(0.0);
        if age_days <= self.config.offset_days {
            return 1.0;
        }

        let decayed = (-self.config.decay * (age_days - self.config.offset_days) / self.config.scale_days).exp();
        decayed.max(MIN_RECENCY_FACTOR) as f32
    }
}

/// Literal matches of the raw query string against title, content and tags
#[derive(Debug, Clone)]
pub struct RelevanceBoost {
    pub config: RelevanceConfig,
}

impl RelevanceBoost {
    pub fn new(config: RelevanceConfig) -> Self {
        RelevanceBoost { config }
    }

    /// Comparison is case-insensitive on trimmed text; a blank query
    /// boosts nothing.
    pub fn factor(&self, doc: &Document, raw_query: &str) -> f32 {
        let query = raw_query.trim().to_lowercase();
        if query.is_empty() {
            return 1.0;
        }

        let mut factor = 1.0;

        let titles = lowered(doc, &self.config.title_field);
        if titles.iter().any(|t| t.contains(&query)) {
            factor *= self.config.title_boost;
        }
        if titles.iter().any(|t| t.trim() == query) {
            factor *= self.config.exact_match_boost;
        }
        if lowered(doc, &self.config.content_field).iter().any(|c| c.contains(&query)) {
            factor *= self.config.content_boost;
        }
        if lowered(doc, &self.config.tags_field).iter().any(|t| t.contains(&query)) {
            factor *= self.config.tags_boost;
        }

        factor
    }
}

fn lowered(doc: &Document, field: &str) -> Vec<String> {
    doc.field_strings(field).into_iter().map(str::to_lowercase).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::core::types::DocId;

    fn aged(days: i64) -> Document {
        let mut doc = Document::new(DocId::from("d"), "idx");
        doc.created_at = Utc::now() - Duration::days(days);
        doc
    }

    #[test]
    fn recent_documents_are_not_penalized() {
        let boost = RecencyBoost::new(RecencyConfig::default());
        assert_eq!(boost.factor(&aged(0), Utc::now()), 1.0);
        assert_eq!(boost.factor(&aged(7), Utc::now()), 1.0);
    }

    #[test]
    fn decay_is_monotonic_and_floored() {
        let boost = RecencyBoost::new(RecencyConfig::default());
        let now = Utc::now();
        let week = boost.factor(&aged(14), now);
        let month = boost.factor(&aged(60), now);
        assert!(week < 1.0);
        assert!(month < week);
        assert_eq!(boost.factor(&aged(100_000), now), 0.1);
    }

    #[test]
    fn disabled_recency_is_neutral() {
        let boost = RecencyBoost::new(RecencyConfig {
            enabled: false,
            ..RecencyConfig::default()
        });
        assert_eq!(boost.factor(&aged(1000), Utc::now()), 1.0);
    }

    #[test]
    fn configured_date_field_overrides_creation_time() {
        let boost = RecencyBoost::new(RecencyConfig {
            field: Some("recorded_at".into()),
            ..RecencyConfig::default()
        });
        let old = (Utc::now() - Duration::days(400)).to_rfc3339();
        let doc = aged(0).with_field("recorded_at", FieldValue::keyword(old));
        assert!(boost.factor(&doc, Utc::now()) < 1.0);

        let unparsable = aged(0).with_field("recorded_at", FieldValue::keyword("yesterday"));
        assert_eq!(boost.factor(&unparsable, Utc::now()), 1.0);
    }

    #[test]
    fn relevance_multiplies_each_literal_match() {
        let boost = RelevanceBoost::new(RelevanceConfig::default());
        let doc = aged(0)
            .with_field("title", FieldValue::text("Lazy Fox"))
            .with_field("content", FieldValue::text("the lazy fox sleeps"))
            .with_field("tags", FieldValue::List(vec![FieldValue::keyword("animals")]));

        assert_eq!(boost.factor(&doc, "lazy fox"), 2.0 * 3.0 * 1.2);
        assert_eq!(boost.factor(&doc, "fox"), 2.0 * 1.2);
        assert_eq!(boost.factor(&doc, "animal"), 1.5);
        assert_eq!(boost.factor(&doc, "zebra"), 1.0);
        assert_eq!(boost.factor(&doc, "   "), 1.0);
    }
}
