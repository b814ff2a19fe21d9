//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use docfields_llm::LlmConfig;

use crate::error::{DocfieldsError, Result};

/// Default validation cutoff: fields at or below this confidence need review.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 80.0;

/// Main configuration for the docfields pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocfieldsConfig {
    /// Entity extraction and validation policy.
    pub extraction: ExtractionConfig,

    /// OCR text cleaning.
    pub cleaning: CleaningConfig,

    /// Schema store location.
    pub schemas: SchemaConfig,

    /// Language-model provider.
    pub llm: LlmConfig,
}

/// Entity extraction and validation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Fields with confidence at or below this value need validation (0 - 100).
    pub confidence_threshold: f64,

    /// Use the NER model when one is available.
    pub nlp_enabled: bool,

    /// Use the regex entity library when the NER model is off or unavailable.
    pub fallback_to_regex: bool,

    /// Directory holding `model.onnx`, `tokenizer.json` and `config.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ner_model_dir: Option<PathBuf>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            nlp_enabled: true,
            fallback_to_regex: true,
            ner_model_dir: None,
        }
    }
}

/// OCR text cleaning configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Collapse runs of spaces and tabs, keeping newlines.
    pub remove_extra_spaces: bool,

    /// Normalize line endings and squeeze blank lines.
    pub normalize_whitespace: bool,

    /// Drop characters outside words, whitespace, CJK and basic punctuation.
    pub remove_special_chars: bool,

    /// Word list of `original -> corrected` terms applied before cleaning.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_words: Option<PathBuf>,

    /// Also replace words similar to a listed term.
    pub fuzzy_match: bool,

    /// Minimum similarity (0 - 1) for a fuzzy replacement.
    pub fuzzy_threshold: f64,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            remove_extra_spaces: true,
            normalize_whitespace: true,
            remove_special_chars: false,
            custom_words: None,
            fuzzy_match: true,
            fuzzy_threshold: 0.8,
        }
    }
}

/// Schema store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Directory of `<doc_type>.json` schema documents.
    pub dir: PathBuf,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("configs/structures"),
        }
    }
}

impl DocfieldsConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        let threshold = self.extraction.confidence_threshold;
        if !(0.0..=100.0).contains(&threshold) {
            return Err(DocfieldsError::Config(format!(
                "confidence_threshold must be within 0-100, got {threshold}"
            )));
        }
        let fuzzy = self.cleaning.fuzzy_threshold;
        if !(0.0..=1.0).contains(&fuzzy) {
            return Err(DocfieldsError::Config(format!(
                "cleaning.fuzzy_threshold must be within 0-1, got {fuzzy}"
            )));
        }
        if self.llm.timeout_secs == 0 {
            return Err(DocfieldsError::Config(
                "llm.timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = DocfieldsConfig::default();
        assert_eq!(config.extraction.confidence_threshold, 80.0);
        assert!(config.extraction.nlp_enabled);
        assert!(config.extraction.fallback_to_regex);
        assert!(config.cleaning.remove_extra_spaces);
        assert!(!config.cleaning.remove_special_chars);
        assert_eq!(config.schemas.dir, PathBuf::from("configs/structures"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file() {
        let json = r#"{"extraction": {"confidence_threshold": 70}, "llm": {"provider": "mock"}}"#;
        let config: DocfieldsConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.extraction.confidence_threshold, 70.0);
        assert!(config.extraction.fallback_to_regex);
        assert_eq!(config.llm.provider, docfields_llm::ProviderKind::Mock);
    }

    #[test]
    fn test_validate_threshold() {
        let mut config = DocfieldsConfig::default();
        config.extraction.confidence_threshold = 120.0;
        assert!(matches!(config.validate(), Err(DocfieldsError::Config(_))));
    }

    #[test]
    fn test_word_list_settings() {
        let json = r#"{"cleaning": {"custom_words": "configs/ocr/custom_words.txt"}}"#;
        let mut config: DocfieldsConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            config.cleaning.custom_words,
            Some(PathBuf::from("configs/ocr/custom_words.txt"))
        );
        assert!(config.cleaning.fuzzy_match);
        assert_eq!(config.cleaning.fuzzy_threshold, 0.8);

        config.cleaning.fuzzy_threshold = 1.5;
        assert!(matches!(config.validate(), Err(DocfieldsError::Config(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = DocfieldsConfig::default();
        config.extraction.nlp_enabled = false;
        config.save(&path).unwrap();

        let loaded = DocfieldsConfig::from_file(&path).unwrap();
        assert!(!loaded.extraction.nlp_enabled);
        assert_eq!(loaded.llm.timeout_secs, 30);
    }
}
