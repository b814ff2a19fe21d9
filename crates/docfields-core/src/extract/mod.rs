//! Entity extraction: text to typed entities to `nlp` candidates.
//!
//! Two strategies produce the same output shape: a trained recogniser
//! (behind the `ner` feature) and a fixed regex library. The strategy is
//! chosen once, from configuration, when the extractor is built.

#[cfg(feature = "ner")]
mod onnx;
mod patterns;
mod recognizer;
mod regex_strategy;

#[cfg(feature = "ner")]
pub use onnx::OnnxRecognizer;
pub use recognizer::{kind_for_label, EntityRecognizer, LabeledSpan};
pub use regex_strategy::{find_entities, resolve_overlaps};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{Candidate, ExtractionConfig, Source};
use crate::schema::{DocumentSchema, FieldSchema, FieldType};
use crate::text::{normalize_value, parse_amount, parse_date};

/// Confidence of candidates from the recogniser.
pub const NLP_CONFIDENCE: f64 = 85.0;

/// Confidence of candidates from the regex library.
pub const REGEX_CONFIDENCE: f64 = 75.0;

/// Semantic kind of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Date,
    Amount,
    Phone,
    Email,
    Identifier,
    Organization,
    Person,
    Location,
}

impl EntityKind {
    /// Field-name fragments suggesting a text field holds this kind.
    fn name_hints(self) -> &'static [&'static str] {
        match self {
            EntityKind::Phone => &["phone", "tel", "telephone", "mobile", "fax", "电话", "手机"],
            EntityKind::Email => &["email", "mail", "邮箱"],
            EntityKind::Identifier => &["number", "no", "num", "id", "code", "号码", "编号", "单号"],
            EntityKind::Organization => &[
                "company", "org", "organization", "vendor", "supplier", "seller", "buyer", "customer",
                "公司", "单位",
            ],
            EntityKind::Person => &["name", "person", "contact", "姓名", "联系人"],
            EntityKind::Location => &["address", "addr", "city", "location", "地址"],
            EntityKind::Date | EntityKind::Amount => &[],
        }
    }
}

/// An entity found in the text; offsets are byte positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

impl Entity {
    pub fn new(kind: EntityKind, text: &str, start: usize, end: usize) -> Self {
        Self {
            kind,
            text: text.to_string(),
            start,
            end,
        }
    }
}

/// Which strategy an extractor runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Model,
    Regex,
    Disabled,
}

/// Entities and the candidates bound from them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub entities: Vec<Entity>,
    pub candidates: Vec<Candidate>,
}

/// Extracts `nlp` candidates from text. Never fails.
#[derive(Clone)]
pub struct EntityExtractor {
    recognizer: Option<Arc<dyn EntityRecognizer>>,
    nlp_enabled: bool,
    fallback_to_regex: bool,
}

impl std::fmt::Debug for EntityExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityExtractor")
            .field("recognizer", &self.recognizer.as_ref().map(|r| r.name().to_string()))
            .field("strategy", &self.strategy())
            .finish()
    }
}

impl EntityExtractor {
    /// Build from configuration, loading the recogniser when one is configured.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        let recognizer = if config.nlp_enabled {
            load_recognizer(config)
        } else {
            None
        };
        Self {
            recognizer,
            nlp_enabled: config.nlp_enabled,
            fallback_to_regex: config.fallback_to_regex,
        }
    }

    /// Regex strategy only.
    pub fn regex_only() -> Self {
        Self {
            recognizer: None,
            nlp_enabled: false,
            fallback_to_regex: true,
        }
    }

    /// Use `recognizer` for the model strategy.
    pub fn with_recognizer(mut self, recognizer: Arc<dyn EntityRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self.nlp_enabled = true;
        self
    }

    pub fn strategy(&self) -> Strategy {
        if self.nlp_enabled && self.recognizer.is_some() {
            Strategy::Model
        } else if self.fallback_to_regex {
            Strategy::Regex
        } else {
            Strategy::Disabled
        }
    }

    /// Candidates for `schema` found in `raw_text`, in text order.
    pub fn extract(&self, raw_text: &str, schema: &DocumentSchema) -> Vec<Candidate> {
        self.run(raw_text, schema).candidates
    }

    /// Entities plus bound candidates.
    pub fn run(&self, raw_text: &str, schema: &DocumentSchema) -> Extraction {
        if raw_text.trim().is_empty() {
            return Extraction::default();
        }

        let (entities, confidence) = self.find(raw_text);
        let candidates = bind(&entities, schema, confidence);
        debug!(
            "Entity extraction: {} entities, {} candidates ({:?})",
            entities.len(),
            candidates.len(),
            self.strategy()
        );
        Extraction { entities, candidates }
    }

    /// Run on the blocking pool when a model is involved.
    pub async fn run_detached(&self, raw_text: String, schema: Arc<DocumentSchema>) -> Extraction {
        if self.strategy() != Strategy::Model {
            return self.run(&raw_text, &schema);
        }

        let extractor = self.clone();
        match tokio::task::spawn_blocking(move || extractor.run(&raw_text, &schema)).await {
            Ok(extraction) => extraction,
            Err(e) => {
                warn!("Entity extraction task failed: {e}");
                Extraction::default()
            }
        }
    }

    fn find(&self, text: &str) -> (Vec<Entity>, f64) {
        match self.strategy() {
            Strategy::Model => {
                let Some(recognizer) = &self.recognizer else {
                    return (Vec::new(), 0.0);
                };
                match recognizer.recognize(text) {
                    Ok(spans) => (model_entities(text, spans), NLP_CONFIDENCE),
                    Err(e) if self.fallback_to_regex => {
                        warn!("{} failed, using regex entities: {e}", recognizer.name());
                        (find_entities(text), REGEX_CONFIDENCE)
                    }
                    Err(e) => {
                        warn!("{} failed: {e}", recognizer.name());
                        (Vec::new(), 0.0)
                    }
                }
            }
            Strategy::Regex => (find_entities(text), REGEX_CONFIDENCE),
            Strategy::Disabled => (Vec::new(), 0.0),
        }
    }
}

impl Default for EntityExtractor {
    fn default() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }
}

#[cfg(feature = "ner")]
fn load_recognizer(config: &ExtractionConfig) -> Option<Arc<dyn EntityRecognizer>> {
    let dir = config.ner_model_dir.as_ref()?;
    match OnnxRecognizer::load(dir) {
        Ok(recognizer) => Some(Arc::new(recognizer)),
        Err(e) => {
            warn!("NER model unavailable: {e}");
            None
        }
    }
}

#[cfg(not(feature = "ner"))]
fn load_recognizer(config: &ExtractionConfig) -> Option<Arc<dyn EntityRecognizer>> {
    if let Some(dir) = &config.ner_model_dir {
        warn!(
            "NER model at {} ignored: built without the `ner` feature",
            dir.display()
        );
    }
    None
}

/// Map recogniser spans to entities; bad offsets and unmapped labels are dropped.
fn model_entities(text: &str, spans: Vec<LabeledSpan>) -> Vec<Entity> {
    let mut by_kind: Vec<(EntityKind, Vec<(usize, usize)>)> = Vec::new();
    for span in spans {
        let Some(kind) = kind_for_label(&span.label) else {
            continue;
        };
        if span.start >= span.end || text.get(span.start..span.end).is_none() {
            continue;
        }
        match by_kind.iter_mut().find(|(k, _)| *k == kind) {
            Some((_, list)) => list.push((span.start, span.end)),
            None => by_kind.push((kind, vec![(span.start, span.end)])),
        }
    }

    let mut entities: Vec<Entity> = by_kind
        .into_iter()
        .flat_map(|(kind, list)| {
            resolve_overlaps(list)
                .into_iter()
                .map(move |(start, end)| Entity::new(kind, &text[start..end], start, end))
        })
        .collect();
    regex_strategy::sort_entities(&mut entities);
    entities
}

/// Bind entities to the schema fields that can hold them.
fn bind(entities: &[Entity], schema: &DocumentSchema, confidence: f64) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    for entity in entities {
        for field in schema.fields() {
            if accepts_entity(field, entity) {
                let value = normalize_value(field.field_type, &entity.text);
                if !value.is_empty() {
                    candidates.push(Candidate::new(&field.name, value, confidence, Source::Nlp));
                }
            }
        }
    }
    candidates
}

fn accepts_entity(field: &FieldSchema, entity: &Entity) -> bool {
    match (entity.kind, field.field_type) {
        (EntityKind::Date, FieldType::Date) => parse_date(&entity.text).is_some(),
        (EntityKind::Amount, t) if t.is_numeric() => parse_amount(&entity.text).is_some(),
        (EntityKind::Date | EntityKind::Amount, _) => false,
        (kind, FieldType::Text) => {
            (field.pattern().is_some() && field.accepts(entity.text.trim())) || name_suggests(field, kind)
        }
        _ => false,
    }
}

fn name_suggests(field: &FieldSchema, kind: EntityKind) -> bool {
    let hints = kind.name_hints();
    std::iter::once(&field.name)
        .chain(field.aliases.iter())
        .any(|name| {
            let lower = name.to_lowercase();
            let tokens: Vec<&str> = lower
                .split(|c: char| !c.is_ascii_alphanumeric())
                .filter(|t| !t.is_empty())
                .collect();
            hints.iter().any(|hint| {
                if hint.is_ascii() {
                    tokens.contains(hint)
                } else {
                    lower.contains(hint)
                }
            })
        })
}
