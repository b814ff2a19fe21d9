//! Folding human corrections back into a reconciled result.

use std::collections::BTreeMap;

use tracing::debug;

use crate::models::{Candidate, FieldResult, StructuredResult};

/// Field name to corrected value.
pub type Corrections = BTreeMap<String, String>;

/// Apply human corrections to a result.
///
/// Each named field present in `result` whose value differs from the
/// current one becomes a manual value with confidence 100. Unchanged
/// values and unknown names leave the result as it was. The returned
/// result is built fresh and the operation is idempotent.
pub fn apply_corrections(result: &StructuredResult, corrections: &Corrections) -> StructuredResult {
    for name in corrections.keys() {
        if result.field(name).is_none() {
            debug!("Ignoring correction for unknown field {name:?}");
        }
    }

    let fields = result
        .fields()
        .iter()
        .map(|field| match corrections.get(&field.field_name) {
            Some(value) if field.value.as_deref() != Some(value.as_str()) => {
                debug!(
                    "{}: {:?} -> {:?} (manual)",
                    field.field_name, field.value, value
                );
                FieldResult::manual(&field.field_name, value)
            }
            _ => field.clone(),
        })
        .collect();

    StructuredResult::from_fields(fields)
}

/// Corrections as `manual` candidates, for replay through the reconciler.
///
/// Replay agrees with [`apply_corrections`] for values that differ from the
/// reconciled ones; callers drop unchanged values before replaying.
pub fn manual_candidates(corrections: &Corrections) -> Vec<Candidate> {
    corrections
        .iter()
        .map(|(name, value)| Candidate::manual(name, value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Source;
    use crate::reconcile::Reconciler;
    use crate::schema::{DocumentSchema, FieldSchema, FieldType};
    use pretty_assertions::assert_eq;

    fn schema() -> DocumentSchema {
        DocumentSchema::new(
            "invoice",
            vec![
                FieldSchema::new("invoice_number", FieldType::Text)
                    .with_pattern(r"\d{8,12}")
                    .unwrap(),
                FieldSchema::new("amount", FieldType::Amount),
                FieldSchema::new("total", FieldType::Amount),
            ],
        )
        .unwrap()
    }

    fn reconciled() -> StructuredResult {
        let ocr = vec![Candidate::new("invoice_number", "420015435099", 90.0, Source::Ocr)];
        let llm = vec![Candidate::new("amount", "1000.00", 60.0, Source::Llm)];
        Reconciler::default().reconcile(&schema(), &ocr, &[], &llm)
    }

    fn corrections(pairs: &[(&str, &str)]) -> Corrections {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_correction_marks_manual() {
        let result = reconciled();
        assert_eq!(result.validation_list(), &["amount".to_string(), "total".to_string()]);

        let corrected = apply_corrections(&result, &corrections(&[("amount", "1100.00"), ("total", "1353.00")]));

        assert_eq!(corrected.field("amount"), Some(&FieldResult::manual("amount", "1100.00")));
        assert_eq!(corrected.field("total"), Some(&FieldResult::manual("total", "1353.00")));
        assert_eq!(corrected.field("invoice_number"), result.field("invoice_number"));
        assert_eq!(corrected.coverage(), 100.0);
        assert!(corrected.validation_list().is_empty());
    }

    #[test]
    fn test_idempotent() {
        let c = corrections(&[("amount", "1100.00"), ("vendor", "ACME")]);
        let once = apply_corrections(&reconciled(), &c);
        let twice = apply_corrections(&once, &c);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let result = reconciled();
        let corrected = apply_corrections(&result, &corrections(&[("vendor", "ACME")]));
        assert_eq!(corrected, result);
    }

    #[test]
    fn test_unchanged_value_carried_over() {
        let result = reconciled();
        let amount = result.field("amount").unwrap();
        assert_eq!(amount.source, Source::Llm);
        assert!(amount.needs_validation);

        let corrected = apply_corrections(&result, &corrections(&[("amount", "1000.00")]));
        assert_eq!(corrected.field("amount"), result.field("amount"));
        assert_eq!(corrected.validation_list(), result.validation_list());
        assert_eq!(corrected, result);
    }

    #[test]
    fn test_mixed_changed_and_unchanged() {
        let result = reconciled();
        let corrected = apply_corrections(
            &result,
            &corrections(&[("amount", "1000.00"), ("invoice_number", "420015435100")]),
        );
        assert_eq!(corrected.field("amount"), result.field("amount"));
        assert_eq!(
            corrected.field("invoice_number"),
            Some(&FieldResult::manual("invoice_number", "420015435100"))
        );
        assert_eq!(corrected.validation_list(), &["amount".to_string(), "total".to_string()]);
    }

    #[test]
    fn test_manual_ignores_pattern() {
        let corrected = apply_corrections(&reconciled(), &corrections(&[("invoice_number", "N/A")]));
        assert_eq!(
            corrected.field("invoice_number"),
            Some(&FieldResult::manual("invoice_number", "N/A"))
        );
    }

    #[test]
    fn test_replay_matches_applier() {
        let c = corrections(&[("amount", "1100.00")]);
        let ocr = vec![Candidate::new("invoice_number", "420015435099", 90.0, Source::Ocr)];
        let mut llm = vec![Candidate::new("amount", "1000.00", 60.0, Source::Llm)];
        llm.extend(manual_candidates(&c));

        let replayed = Reconciler::default().reconcile(&schema(), &ocr, &[], &llm);
        assert_eq!(replayed, apply_corrections(&reconciled(), &c));
    }
}
