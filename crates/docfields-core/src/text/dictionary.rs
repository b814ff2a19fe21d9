//! Custom word list for correcting domain terms the OCR engine misreads.

use std::collections::HashMap;
use std::path::Path;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::debug;

use crate::error::{DocfieldsError, Result};

lazy_static! {
    static ref WORD: Regex = Regex::new(r"\w+").unwrap();
    static ref ARROW: Regex = Regex::new(r"->|→").unwrap();
}

/// Term corrections loaded from a word list.
///
/// Each line is `original -> corrected` (or `→`), or a bare term that maps
/// to itself and only serves fuzzy matching. `#` starts a comment line.
#[derive(Debug, Clone)]
pub struct TermDictionary {
    /// `(original, corrected)` in file order; later duplicates win.
    terms: Vec<(String, String)>,
    lookup: HashMap<String, String>,
    exact: Option<Regex>,
}

impl TermDictionary {
    pub fn parse(content: &str) -> Result<Self> {
        let mut terms: Vec<(String, String)> = Vec::new();
        for line in content.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (original, corrected) = match ARROW.find(line) {
                Some(m) => (line[..m.start()].trim(), line[m.end()..].trim()),
                None => (line, line),
            };
            if original.is_empty() || corrected.is_empty() {
                continue;
            }
            match terms.iter_mut().find(|(o, _)| o == original) {
                Some(entry) => entry.1 = corrected.to_string(),
                None => terms.push((original.to_string(), corrected.to_string())),
            }
        }

        let lookup: HashMap<String, String> = terms.iter().cloned().collect();

        let mut replaced: Vec<&str> = terms
            .iter()
            .filter(|(o, c)| o != c)
            .map(|(o, _)| o.as_str())
            .collect();
        replaced.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        let exact = if replaced.is_empty() {
            None
        } else {
            let alternation: Vec<String> = replaced.iter().map(|t| regex::escape(t)).collect();
            let pattern = format!(r"\b(?:{})\b", alternation.join("|"));
            Some(Regex::new(&pattern).map_err(|e| DocfieldsError::Config(format!("word list: {e}")))?)
        };

        Ok(Self { terms, lookup, exact })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let dictionary = Self::parse(&content)?;
        debug!("Loaded {} term(s) from {}", dictionary.len(), path.display());
        Ok(dictionary)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Replace every listed original at word boundaries.
    pub fn replace_exact(&self, text: &str) -> String {
        match &self.exact {
            Some(re) => re
                .replace_all(text, |caps: &Captures| {
                    self.lookup.get(&caps[0]).cloned().unwrap_or_else(|| caps[0].to_string())
                })
                .into_owned(),
            None => text.to_string(),
        }
    }

    /// Replace each word with the correction of its most similar term.
    ///
    /// Similarity is normalised Levenshtein in 0-1; a term must reach
    /// `threshold`. Numeric words are never rewritten and everything
    /// between words is kept as is.
    pub fn replace_fuzzy(&self, text: &str, threshold: f64) -> String {
        if self.terms.is_empty() {
            return text.to_string();
        }
        WORD.replace_all(text, |caps: &Captures| {
            let word = &caps[0];
            if word.chars().all(|c| c.is_ascii_digit()) {
                return word.to_string();
            }
            let mut best: Option<(&str, f64)> = None;
            for (original, corrected) in &self.terms {
                let ratio = strsim::normalized_levenshtein(word, original);
                if ratio >= threshold && best.is_none_or(|(_, r)| ratio > r) {
                    best = Some((corrected.as_str(), ratio));
                }
            }
            best.map_or_else(|| word.to_string(), |(corrected, _)| corrected.to_string())
        })
        .into_owned()
    }
}
