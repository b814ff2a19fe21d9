//! Confidence and validation policy shared by reconciliation and correction.

use std::cmp::Ordering;

use crate::models::config::DEFAULT_CONFIDENCE_THRESHOLD;
use crate::models::field::clamp_confidence;
use crate::models::{Candidate, FieldResult, Source};

/// Decides which fields need human review.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidationPolicy {
    threshold: f64,
}

impl ValidationPolicy {
    /// Fields at or below `threshold` (0 - 100) need validation.
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: clamp_confidence(threshold),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Manual values are never flagged.
    pub fn needs_validation(&self, confidence: f64, source: Source) -> bool {
        source != Source::Manual && confidence <= self.threshold
    }

    /// Build a field result that honours the validation invariant.
    pub fn resolved(&self, field_name: &str, value: &str, confidence: f64, source: Source) -> FieldResult {
        if source == Source::Manual {
            return FieldResult::manual(field_name, value);
        }
        let confidence = clamp_confidence(confidence);
        FieldResult {
            field_name: field_name.to_string(),
            value: Some(value.to_string()),
            confidence,
            source,
            needs_validation: self.needs_validation(confidence, source),
        }
    }

    /// A field with no acceptable candidate.
    pub fn unresolved(&self, field_name: &str) -> FieldResult {
        FieldResult {
            needs_validation: self.needs_validation(0.0, Source::Unknown),
            ..FieldResult::missing(field_name)
        }
    }
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE_THRESHOLD)
    }
}

/// Ranking of automatic candidates: higher confidence first, then
/// `ocr > nlp > llm`, then the shorter value. Equal candidates compare
/// equal so a stable sort keeps input order.
pub fn rank(a: &Candidate, b: &Candidate) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| b.source.priority().cmp(&a.source.priority()))
        .then_with(|| value_len(a).cmp(&value_len(b)))
}

fn value_len(candidate: &Candidate) -> usize {
    candidate.value.as_deref().map_or(0, |v| v.trim().chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_threshold_is_inclusive() {
        let policy = ValidationPolicy::default();
        assert!(policy.needs_validation(80.0, Source::Ocr));
        assert!(!policy.needs_validation(80.01, Source::Ocr));
        assert!(!policy.needs_validation(0.0, Source::Manual));
    }

    #[test]
    fn test_resolved_manual() {
        let field = ValidationPolicy::new(100.0).resolved("total", "5", 10.0, Source::Manual);
        assert_eq!(field, FieldResult::manual("total", "5"));
    }

    #[test]
    fn test_unresolved() {
        let field = ValidationPolicy::default().unresolved("total");
        assert_eq!(field.value, None);
        assert_eq!(field.confidence, 0.0);
        assert_eq!(field.source, Source::Unknown);
        assert!(field.needs_validation);
    }

    #[test]
    fn test_rank_order() {
        let ocr = Candidate::new("f", "abc", 70.0, Source::Ocr);
        let llm = Candidate::new("f", "abc", 70.0, Source::Llm);
        let nlp_high = Candidate::new("f", "abcdef", 71.0, Source::Nlp);
        let ocr_short = Candidate::new("f", "ab", 70.0, Source::Ocr);

        let mut list = vec![llm.clone(), ocr.clone(), nlp_high.clone(), ocr_short.clone()];
        list.sort_by(rank);
        assert_eq!(list, vec![nlp_high, ocr_short, ocr, llm]);
    }
}
