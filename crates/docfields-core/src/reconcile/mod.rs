//! Reconciliation of OCR, entity and LLM candidates into one value per field.
//!
//! For each declared field:
//!
//! 1. a `manual` candidate wins outright (the last one if several);
//! 2. otherwise candidates are ranked by confidence, then source
//!    (`ocr > nlp > llm`), then shorter value, then input order;
//! 3. the first candidate fully matching the field pattern is taken;
//! 4. with nothing left the field resolves to null with confidence 0.
//!
//! Reconciliation is a pure function of its inputs.

mod correction;
mod scoring;

pub use correction::{apply_corrections, manual_candidates, Corrections};
pub use scoring::{rank, ValidationPolicy};

use tracing::debug;

use crate::models::{Candidate, FieldResult, OcrDocument, Source, StructuredResult};
use crate::schema::{DocumentSchema, FieldSchema};

/// Merges candidate sources under a validation policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler {
    policy: ValidationPolicy,
}

impl Reconciler {
    pub fn new(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    pub fn with_threshold(threshold: f64) -> Self {
        Self::new(ValidationPolicy::new(threshold))
    }

    pub fn policy(&self) -> ValidationPolicy {
        self.policy
    }

    /// One result per schema field, in declaration order.
    pub fn reconcile(
        &self,
        schema: &DocumentSchema,
        ocr_candidates: &[Candidate],
        nlp_candidates: &[Candidate],
        llm_candidates: &[Candidate],
    ) -> StructuredResult {
        let fields = schema
            .fields()
            .iter()
            .map(|field| {
                let pool: Vec<&Candidate> = ocr_candidates
                    .iter()
                    .chain(nlp_candidates)
                    .chain(llm_candidates)
                    .filter(|c| c.field_name == field.name)
                    .collect();
                self.resolve_field(field, pool)
            })
            .collect();

        StructuredResult::from_fields(fields)
    }

    fn resolve_field(&self, field: &FieldSchema, pool: Vec<&Candidate>) -> FieldResult {
        if let Some(manual) = pool
            .iter()
            .rev()
            .find(|c| c.source == Source::Manual && c.value.is_some())
        {
            debug!("{}: manual value", field.name);
            return FieldResult::manual(&field.name, manual.value.as_deref().unwrap_or_default());
        }

        let mut ranked: Vec<&Candidate> = pool
            .into_iter()
            .filter(|c| c.source != Source::Manual && c.usable_value().is_some())
            .collect();
        ranked.sort_by(|a, b| rank(a, b));

        for candidate in ranked {
            let Some(value) = candidate.usable_value() else {
                continue;
            };
            let value = value.trim();
            if !field.accepts(value) {
                debug!(
                    "{}: rejected {:?} from {} (pattern mismatch)",
                    field.name, value, candidate.source
                );
                continue;
            }
            debug!(
                "{}: {:?} from {} at {:.1}",
                field.name, value, candidate.source, candidate.confidence
            );
            return self
                .policy
                .resolved(&field.name, value, candidate.confidence, candidate.source);
        }

        debug!("{}: no acceptable candidate", field.name);
        self.policy.unresolved(&field.name)
    }
}

/// Slice the raw OCR text with each field's pattern.
///
/// Non-overlapping matches in text order, duplicates removed. Confidence is
/// that of the OCR block containing the match, else the document's.
pub fn ocr_candidates(document: &OcrDocument, schema: &DocumentSchema) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    for field in schema.fields() {
        let Some(re) = field.search_regex() else {
            continue;
        };
        let mut seen: Vec<&str> = Vec::new();
        for m in re.find_iter(&document.text) {
            let value = m.as_str().trim();
            if value.is_empty() || seen.contains(&value) {
                continue;
            }
            seen.push(value);
            candidates.push(Candidate::new(
                &field.name,
                value,
                document.confidence_at(m.start(), m.end()),
                Source::Ocr,
            ));
        }
    }
    candidates
}
