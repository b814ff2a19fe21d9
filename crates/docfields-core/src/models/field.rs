//! Candidate and reconciled field models.

use serde::{Deserialize, Serialize};

/// Where a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Direct pattern match on the raw OCR text.
    Ocr,
    /// Entity recognised by the NER model or the regex library.
    Nlp,
    /// Structured guess from the language model.
    Llm,
    /// Human correction.
    Manual,
    /// No candidate survived.
    Unknown,
}

impl Source {
    /// Tie-break rank among automatic sources (higher wins).
    pub fn priority(self) -> u8 {
        match self {
            Source::Manual => 4,
            Source::Ocr => 3,
            Source::Nlp => 2,
            Source::Llm => 1,
            Source::Unknown => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Source::Ocr => "ocr",
            Source::Nlp => "nlp",
            Source::Llm => "llm",
            Source::Manual => "manual",
            Source::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An unranked proposal for one field's value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Canonical schema field name.
    pub field_name: String,
    /// Proposed value.
    pub value: Option<String>,
    /// Confidence score (0 - 100).
    pub confidence: f64,
    /// Producing layer.
    pub source: Source,
}

impl Candidate {
    pub fn new(
        field_name: impl Into<String>,
        value: impl Into<String>,
        confidence: f64,
        source: Source,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            value: Some(value.into()),
            confidence: clamp_confidence(confidence),
            source,
        }
    }

    /// A human-supplied value; always fully trusted.
    pub fn manual(field_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field_name, value, 100.0, Source::Manual)
    }

    /// The value, if present and not blank.
    pub fn usable_value(&self) -> Option<&str> {
        self.value.as_deref().filter(|v| !v.trim().is_empty())
    }
}

/// The reconciled, authoritative value of one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldResult {
    pub field_name: String,
    pub value: Option<String>,
    pub confidence: f64,
    pub source: Source,
    pub needs_validation: bool,
}

impl FieldResult {
    /// A field nobody produced an acceptable value for.
    pub fn missing(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            value: None,
            confidence: 0.0,
            source: Source::Unknown,
            needs_validation: true,
        }
    }

    /// A field overridden by a human.
    pub fn manual(field_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            value: Some(value.into()),
            confidence: 100.0,
            source: Source::Manual,
            needs_validation: false,
        }
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }
}

/// Reconciled fields of one document (or one PDF page).
///
/// Coverage and the validation list are derived from the fields on
/// construction and are never set independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawStructuredResult")]
pub struct StructuredResult {
    #[serde(with = "field_map")]
    fields: Vec<FieldResult>,
    coverage: f64,
    validation_list: Vec<String>,
}

impl StructuredResult {
    /// Build a result from fields in schema declaration order.
    pub fn from_fields(fields: Vec<FieldResult>) -> Self {
        let filled = fields.iter().filter(|f| f.has_value()).count();
        let coverage = if fields.is_empty() {
            0.0
        } else {
            100.0 * filled as f64 / fields.len() as f64
        };

        let mut validation_list: Vec<String> = Vec::new();
        for field in fields.iter().filter(|f| f.needs_validation) {
            if !validation_list.contains(&field.field_name) {
                validation_list.push(field.field_name.clone());
            }
        }

        Self {
            fields,
            coverage,
            validation_list,
        }
    }

    /// Fields in schema order.
    pub fn fields(&self) -> &[FieldResult] {
        &self.fields
    }

    /// Look up a field by canonical name.
    pub fn field(&self, name: &str) -> Option<&FieldResult> {
        self.fields.iter().find(|f| f.field_name == name)
    }

    /// Percentage of fields with a non-null value.
    pub fn coverage(&self) -> f64 {
        self.coverage
    }

    /// Fields needing human review, in schema order.
    pub fn validation_list(&self) -> &[String] {
        &self.validation_list
    }

    pub fn into_fields(self) -> Vec<FieldResult> {
        self.fields
    }
}

#[derive(Deserialize)]
struct RawStructuredResult {
    #[serde(with = "field_map")]
    fields: Vec<FieldResult>,
}

impl From<RawStructuredResult> for StructuredResult {
    fn from(raw: RawStructuredResult) -> Self {
        StructuredResult::from_fields(raw.fields)
    }
}

/// Clamp into 0 - 100; NaN becomes 0.
pub fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 100.0)
    }
}

/// Serializes `Vec<FieldResult>` as an ordered `name -> entry` map.
mod field_map {
    use std::fmt;

    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::{FieldResult, Source};

    #[derive(Serialize, Deserialize)]
    struct Entry {
        value: Option<String>,
        confidence: f64,
        source: Source,
        needs_validation: bool,
    }

    pub fn serialize<S: Serializer>(fields: &[FieldResult], serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(fields.len()))?;
        for field in fields {
            map.serialize_entry(
                &field.field_name,
                &Entry {
                    value: field.value.clone(),
                    confidence: field.confidence,
                    source: field.source,
                    needs_validation: field.needs_validation,
                },
            )?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<FieldResult>, D::Error> {
        struct FieldsVisitor;

        impl<'de> Visitor<'de> for FieldsVisitor {
            type Value = Vec<FieldResult>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of field name to field result")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut fields = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, entry)) = access.next_entry::<String, Entry>()? {
                    fields.push(FieldResult {
                        field_name: name,
                        value: entry.value,
                        confidence: entry.confidence,
                        source: entry.source,
                        needs_validation: entry.needs_validation,
                    });
                }
                Ok(fields)
            }
        }

        deserializer.deserialize_map(FieldsVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> StructuredResult {
        StructuredResult::from_fields(vec![
            FieldResult {
                field_name: "invoice_number".to_string(),
                value: Some("420015435099".to_string()),
                confidence: 90.0,
                source: Source::Ocr,
                needs_validation: false,
            },
            FieldResult::missing("total"),
            FieldResult {
                field_name: "amount".to_string(),
                value: Some("1000.00".to_string()),
                confidence: 60.0,
                source: Source::Llm,
                needs_validation: true,
            },
        ])
    }

    #[test]
    fn test_derived_values() {
        let result = sample();
        assert!((result.coverage() - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(result.validation_list(), &["total".to_string(), "amount".to_string()]);
    }

    #[test]
    fn test_empty_schema_coverage() {
        let result = StructuredResult::from_fields(Vec::new());
        assert_eq!(result.coverage(), 0.0);
        assert!(result.validation_list().is_empty());
    }

    #[test]
    fn test_json_keeps_schema_order() {
        let json = serde_json::to_string(&sample()).unwrap();
        let invoice = json.find("invoice_number").unwrap();
        let total = json.find("\"total\"").unwrap();
        let amount = json.find("\"amount\"").unwrap();
        assert!(invoice < total && total < amount);
        assert!(json.contains("\"source\":\"unknown\""));

        let parsed: StructuredResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sample());
    }

    #[test]
    fn test_deserialize_recomputes_derived_values() {
        let json = r#"{
            "fields": {"a": {"value": null, "confidence": 0, "source": "unknown", "needs_validation": true}},
            "coverage": 100,
            "validation_list": []
        }"#;
        let parsed: StructuredResult = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.coverage(), 0.0);
        assert_eq!(parsed.validation_list(), &["a".to_string()]);
    }

    #[test]
    fn test_clamp_confidence() {
        assert_eq!(clamp_confidence(120.0), 100.0);
        assert_eq!(clamp_confidence(-3.0), 0.0);
        assert_eq!(clamp_confidence(f64::NAN), 0.0);
        assert_eq!(Candidate::new("a", "b", 150.0, Source::Llm).confidence, 100.0);
    }
}
