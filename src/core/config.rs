use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::core::error::{Error, Result};
use crate::schema::schema::Schema;

/// Engine configuration, persisted next to the document snapshot as JSON.
///
/// Every section has documented defaults; missing sections in a config file
/// fall back to them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub storage: StorageConfig,
    pub analyzer: AnalyzerConfig,
    pub schema: Schema,
    pub scoring: ScoringConfig,
    pub suggest: SuggestConfig,
    pub search: SearchConfig,
    pub maintenance: MaintenanceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding `documents.json` and `engine.json`; `None` keeps
    /// everything in memory
    pub data_dir: Option<PathBuf>,
    /// Write the snapshot after every mutation (best effort)
    pub persist_on_write: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            data_dir: None,
            persist_on_write: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StemmerAlgorithm {
    /// Strips "ing", "ed" and a trailing "s"
    Light,
    /// Snowball English
    Porter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeSide {
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NGramMode {
    /// Emit only the n-grams
    Replace,
    /// Keep the original token and add its n-grams
    Append,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NGramConfig {
    pub min_gram: usize,
    pub max_gram: usize,
    pub side: EdgeSide,
    pub mode: NGramMode,
}

impl Default for NGramConfig {
    fn default() -> Self {
        NGramConfig {
            min_gram: 2,
            max_gram: 10,
            side: EdgeSide::Front,
            mode: NGramMode::Append,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SynonymDirection {
    Query,
    Index,
    Both,
}

impl SynonymDirection {
    pub fn expands_query(self) -> bool {
        matches!(self, SynonymDirection::Query | SynonymDirection::Both)
    }

    pub fn expands_index(self) -> bool {
        matches!(self, SynonymDirection::Index | SynonymDirection::Both)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynonymConfig {
    /// term -> synonyms; both sides are analyzed-form lowercase words
    pub table: BTreeMap<String, Vec<String>>,
    pub direction: SynonymDirection,
}

impl Default for SynonymConfig {
    fn default() -> Self {
        SynonymConfig {
            table: BTreeMap::new(),
            direction: SynonymDirection::Query,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhoneticAlgorithm {
    Soundex,
    Metaphone,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhoneticConfig {
    pub enabled: bool,
    pub algorithm: PhoneticAlgorithm,
    /// Keep a code -> terms bucket map beside the postings instead of
    /// scanning the vocabulary per query token
    pub use_bucket_index: bool,
}

impl Default for PhoneticConfig {
    fn default() -> Self {
        PhoneticConfig {
            enabled: false,
            algorithm: PhoneticAlgorithm::Soundex,
            use_bucket_index: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub stop_words: Vec<String>,
    pub stemming: bool,
    pub stemmer: StemmerAlgorithm,
    pub ngram: Option<NGramConfig>,
    pub synonyms: SynonymConfig,
    pub phonetic: PhoneticConfig,
    /// Analyzed text fields larger than this fail indexing
    pub max_field_bytes: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            stop_words: default_stop_words(),
            stemming: true,
            stemmer: StemmerAlgorithm::Light,
            ngram: None,
            synonyms: SynonymConfig::default(),
            phonetic: PhoneticConfig::default(),
            max_field_bytes: 1024 * 1024,
        }
    }
}

pub fn default_stop_words() -> Vec<String> {
    [
        "a", "an", "and", "are", "as", "at", "be", "but", "by", "for",
        "from", "has", "he", "in", "is", "it", "its", "of", "on", "or",
        "that", "the", "this", "to", "was", "were", "will", "with",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecencyConfig {
    pub enabled: bool,
    /// Date field holding the timestamp; `None` uses the document's `created_at`
    pub field: Option<String>,
    /// Age with no decay at all
    pub offset_days: f64,
    pub scale_days: f64,
    pub decay: f64,
}

impl Default for RecencyConfig {
    fn default() -> Self {
        RecencyConfig {
            enabled: true,
            field: None,
            offset_days: 7.0,
            scale_days: 30.0,
            decay: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelevanceConfig {
    pub title_field: String,
    pub content_field: String,
    pub tags_field: String,
    pub title_boost: f32,
    pub exact_match_boost: f32,
    pub content_boost: f32,
    pub tags_boost: f32,
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        RelevanceConfig {
            title_field: "title".to_string(),
            content_field: "content".to_string(),
            tags_field: "tags".to_string(),
            title_boost: 2.0,
            exact_match_boost: 3.0,
            content_boost: 1.2,
            tags_boost: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Floor for `ln(N / (df + 1))`, keeps common terms from scoring
    /// zero or negative
    pub min_idf: f32,
    pub recency: RecencyConfig,
    pub relevance: RelevanceConfig,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            min_idf: 0.01,
            recency: RecencyConfig::default(),
            relevance: RelevanceConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestConfig {
    pub completion_field: String,
    pub completion_size: usize,
    pub max_edits: u8,
    /// Minimum `1 - distance / max_len` for a spelling suggestion
    pub accuracy: f64,
    pub max_per_word: usize,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        SuggestConfig {
            completion_field: "title".to_string(),
            completion_size: 5,
            max_edits: 2,
            accuracy: 0.5,
            max_per_word: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub timeout_ms: u64,
    /// Upper bound for `from + size`
    pub max_result_window: usize,
    pub default_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            timeout_ms: 5_000,
            max_result_window: 10_000,
            default_size: 10,
        }
    }
}

impl SearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    pub save_interval_secs: u64,
    pub optimize_interval_secs: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        MaintenanceConfig {
            save_interval_secs: 30,
            optimize_interval_secs: 3600,
        }
    }
}

impl EngineConfig {
    pub fn in_memory() -> Self {
        EngineConfig::default()
    }

    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let mut config = EngineConfig::default();
        config.storage.data_dir = Some(data_dir.into());
        config
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        let config: EngineConfig = serde_json::from_slice(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_vec_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let analyzer = &self.analyzer;
        if let Some(ngram) = &analyzer.ngram {
            if ngram.min_gram == 0 || ngram.min_gram > ngram.max_gram {
                return Err(Error::invalid_input(format!(
                    "n-gram bounds must satisfy 0 < min <= max, got {}..{}",
                    ngram.min_gram, ngram.max_gram
                )));
            }
        }
        if analyzer.max_field_bytes == 0 {
            return Err(Error::invalid_input("max_field_bytes must be positive"));
        }

        let scoring = &self.scoring;
        if !scoring.min_idf.is_finite() || scoring.min_idf < 0.0 {
            return Err(Error::invalid_input("min_idf must be a non-negative number"));
        }
        let recency = &scoring.recency;
        if recency.scale_days <= 0.0 || recency.offset_days < 0.0 || recency.decay < 0.0 {
            return Err(Error::invalid_input(
                "recency needs scale > 0, offset >= 0 and decay >= 0",
            ));
        }
        let relevance = &scoring.relevance;
        for (name, boost) in [
            ("title_boost", relevance.title_boost),
            ("exact_match_boost", relevance.exact_match_boost),
            ("content_boost", relevance.content_boost),
            ("tags_boost", relevance.tags_boost),
        ] {
            if !boost.is_finite() || boost <= 0.0 {
                return Err(Error::invalid_input(format!("{} must be positive", name)));
            }
        }

        if !(0.0..=1.0).contains(&self.suggest.accuracy) {
            return Err(Error::invalid_input("suggest accuracy must lie in [0, 1]"));
        }
        if self.search.timeout_ms == 0 {
            return Err(Error::invalid_input("search timeout must be positive"));
        }
        if self.search.default_size == 0 || self.search.default_size > self.search.max_result_window {
            return Err(Error::invalid_input(
                "default_size must be positive and within max_result_window",
            ));
        }
        if self.maintenance.save_interval_secs == 0 || self.maintenance.optimize_interval_secs == 0 {
            return Err(Error::invalid_input("maintenance intervals must be positive"));
        }

        self.schema.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_inverted_ngram_bounds() {
        let mut config = EngineConfig::default();
        config.analyzer.ngram = Some(NGramConfig {
            min_gram: 4,
            max_gram: 2,
            ..NGramConfig::default()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let json = r#"{ "search": { "timeout_ms": 250 }, "scoring": { "min_idf": 0.5 } }"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.search.timeout_ms, 250);
        assert_eq!(config.search.max_result_window, 10_000);
        assert_eq!(config.scoring.min_idf, 0.5);
        assert!(config.scoring.recency.enabled);
        assert_eq!(config.analyzer, AnalyzerConfig::default());
    }

    #[test]
    fn save_and_load_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        let mut config = EngineConfig::default();
        config.suggest.max_edits = 1;
        config.save(&path).unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap(), config);
    }
}
