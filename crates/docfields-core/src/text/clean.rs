//! OCR text cleaning.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

use super::dictionary::TermDictionary;
use crate::models::CleaningConfig;

lazy_static! {
    static ref HORIZONTAL_SPACE: Regex = Regex::new(r"[ \t]+").unwrap();
    static ref BLANK_LINES: Regex = Regex::new(r"\n{3,}").unwrap();
    static ref SPECIAL_CHARS: Regex =
        Regex::new(r"[^\w\s\p{Han}，。、；：！？“”‘’（）【】《》￥%.,:;\-/@()]").unwrap();
}

/// Cleaning settings with the word list loaded once.
#[derive(Debug, Clone, Default)]
pub struct TextCleaner {
    config: CleaningConfig,
    dictionary: Option<TermDictionary>,
}

impl TextCleaner {
    /// A word list that cannot be read is logged and left out.
    pub fn from_config(config: &CleaningConfig) -> Self {
        let dictionary = config.custom_words.as_deref().and_then(|path| {
            match TermDictionary::load(path) {
                Ok(dictionary) => Some(dictionary),
                Err(e) => {
                    warn!("Skipping word list {}: {e}", path.display());
                    None
                }
            }
        });
        Self {
            config: config.clone(),
            dictionary,
        }
    }

    pub fn with_dictionary(mut self, dictionary: TermDictionary) -> Self {
        self.dictionary = Some(dictionary);
        self
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Correct listed terms, then clean. The result is trimmed.
    pub fn clean(&self, text: &str) -> String {
        match &self.dictionary {
            Some(dictionary) => {
                let mut corrected = dictionary.replace_exact(text);
                if self.config.fuzzy_match {
                    corrected = dictionary.replace_fuzzy(&corrected, self.config.fuzzy_threshold);
                }
                if corrected != text {
                    debug!("Word list corrected OCR text");
                }
                apply_rules(&corrected, &self.config)
            }
            None => apply_rules(text, &self.config),
        }
    }
}

/// Clean raw OCR text according to `config`. The result is trimmed.
pub fn clean_text(text: &str, config: &CleaningConfig) -> String {
    TextCleaner::from_config(config).clean(text)
}

fn apply_rules(text: &str, config: &CleaningConfig) -> String {
    let mut cleaned = text.to_string();

    if config.remove_extra_spaces {
        cleaned = HORIZONTAL_SPACE.replace_all(&cleaned, " ").into_owned();
    }

    if config.normalize_whitespace {
        cleaned = cleaned.replace("\r\n", "\n").replace('\r', "\n");
        cleaned = BLANK_LINES.replace_all(&cleaned, "\n\n").into_owned();
    }

    if config.remove_special_chars {
        cleaned = SPECIAL_CHARS.replace_all(&cleaned, "").into_owned();
    }

    cleaned.trim().to_string()
}
