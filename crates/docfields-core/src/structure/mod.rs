//! LLM structuring: text plus schema to `llm` candidates.

mod decode;

pub use decode::{decode_reply, repair};

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use docfields_llm::{create_provider, LlmConfig, LlmProvider};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::models::{Candidate, Source};
use crate::schema::{DocumentSchema, FieldType};
use crate::text::normalize_value;

/// Confidence of candidates from the language model.
pub const LLM_CONFIDENCE: f64 = 60.0;

/// Keys models like to wrap their answer in.
const WRAPPER_KEYS: [&str; 4] = ["fields", "data", "result", "structured_data"];

/// Asks a language model for a structured guess. Never fails.
#[derive(Clone)]
pub struct LlmStructurer {
    provider: Option<Arc<dyn LlmProvider>>,
    timeout: Duration,
}

impl std::fmt::Debug for LlmStructurer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmStructurer")
            .field("provider", &self.provider.as_ref().map(|p| p.name().to_string()))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl LlmStructurer {
    /// Build the provider once from configuration.
    ///
    /// A provider that cannot be built (missing API key, bad settings)
    /// disables the layer instead of failing.
    pub fn from_config(config: &LlmConfig) -> Self {
        if !config.enabled {
            info!("LLM structuring disabled");
            return Self::disabled();
        }
        match create_provider(config) {
            Ok(provider) => {
                info!("LLM provider: {} ({})", provider.name(), provider.model());
                Self {
                    provider: Some(Arc::from(provider)),
                    timeout: config.timeout(),
                }
            }
            Err(e) => {
                warn!("LLM provider unavailable, structuring disabled: {e}");
                Self::disabled()
            }
        }
    }

    pub fn new(provider: Arc<dyn LlmProvider>, timeout: Duration) -> Self {
        Self {
            provider: Some(provider),
            timeout,
        }
    }

    pub fn disabled() -> Self {
        Self {
            provider: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    /// Canonical field name to candidate. Empty on any failure.
    pub async fn structure(&self, raw_text: &str, schema: &DocumentSchema) -> BTreeMap<String, Candidate> {
        let Some(provider) = &self.provider else {
            return BTreeMap::new();
        };
        if raw_text.trim().is_empty() || schema.fields().is_empty() {
            return BTreeMap::new();
        }

        let prompt = build_prompt(raw_text, schema);
        let reply = match tokio::time::timeout(self.timeout, provider.generate(&prompt)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!("LLM call to {} failed: {e}", provider.name());
                return BTreeMap::new();
            }
            Err(_) => {
                warn!("LLM call to {} timed out after {:?}", provider.name(), self.timeout);
                return BTreeMap::new();
            }
        };

        let Some(object) = decode_reply(&reply) else {
            let head: String = reply.chars().take(80).collect();
            warn!("LLM reply is not a JSON object: {head:?}");
            return BTreeMap::new();
        };

        let candidates = object_to_candidates(object, schema);
        debug!("LLM produced {} candidate(s)", candidates.len());
        candidates
    }
}

/// Build the extraction prompt.
pub fn build_prompt(raw_text: &str, schema: &DocumentSchema) -> String {
    let mut prompt = String::new();
    prompt.push_str("Extract structured data from the OCR text of a document.\n\n");
    let _ = writeln!(prompt, "Document type: {}", schema.title);
    if let Some(description) = &schema.description {
        let _ = writeln!(prompt, "Description: {description}");
    }

    prompt.push_str("\nFields:\n");
    for field in schema.fields() {
        let _ = write!(prompt, "- {} ({})", field.name, field.field_type);
        if let Some(description) = &field.description {
            let _ = write!(prompt, ": {description}");
        }
        if let Some(pattern) = field.pattern() {
            let _ = write!(prompt, " [pattern: {pattern}]");
        }
        prompt.push('\n');
    }

    let _ = write!(prompt, "\nOCR text:\n```\n{raw_text}\n```\n\n");
    prompt.push_str("Reply with a single JSON object and nothing else:\n{\n");
    let keys: Vec<String> = schema
        .fields()
        .iter()
        .map(|f| {
            let example = match f.field_type {
                FieldType::Date => "\"YYYY-MM-DD\"",
                FieldType::Number | FieldType::Amount | FieldType::Decimal => "\"0.00\"",
                FieldType::Text => "\"...\"",
            };
            format!("  \"{}\": {example}", f.name)
        })
        .collect();
    prompt.push_str(&keys.join(",\n"));
    prompt.push_str("\n}\n\n");
    prompt.push_str(
        "Use null for fields not present in the text. Write dates as YYYY-MM-DD \
         and numbers without currency symbols or thousands separators.",
    );
    prompt
}

/// Normalise a decoded object onto the schema's canonical names.
fn object_to_candidates(mut object: Map<String, Value>, schema: &DocumentSchema) -> BTreeMap<String, Candidate> {
    if object.len() == 1 {
        let key = object.keys().next().cloned().unwrap_or_default();
        let is_wrapper = WRAPPER_KEYS.contains(&key.to_lowercase().as_str()) && schema.canonical_name(&key).is_none();
        if is_wrapper {
            if let Some(Value::Object(inner)) = object.remove(&key) {
                object = inner;
            }
        }
    }

    let mut candidates = BTreeMap::new();
    for (key, value) in object {
        let Some(name) = schema.canonical_name(&key) else {
            debug!("Dropping field {key:?} not in schema {}", schema.doc_type);
            continue;
        };
        let Some(field) = schema.field(name) else {
            continue;
        };
        let Some(raw) = value_to_string(&value) else {
            continue;
        };

        let candidate = Candidate::new(name, normalize_value(field.field_type, &raw), LLM_CONFIDENCE, Source::Llm);
        if key == name {
            candidates.insert(name.to_string(), candidate);
        } else {
            candidates.entry(name.to_string()).or_insert(candidate);
        }
    }
    candidates
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter(|v| !v.is_array() && !v.is_object())
                .filter_map(value_to_string)
                .collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        Value::Object(map) => map.get("value").and_then(value_to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSchema;
    use async_trait::async_trait;
    use docfields_llm::{LlmError, MockProvider};
    use pretty_assertions::assert_eq;

    fn schema() -> DocumentSchema {
        DocumentSchema::new(
            "invoice",
            vec![
                FieldSchema::new("invoice_number", FieldType::Text).with_aliases(["invoice no"]),
                FieldSchema::new("issue_date", FieldType::Date),
                FieldSchema::new("amount", FieldType::Amount),
                FieldSchema::new("items", FieldType::Text),
            ],
        )
        .unwrap()
        .with_title("Invoice")
    }

    fn structurer(reply: &str) -> LlmStructurer {
        LlmStructurer::new(Arc::new(MockProvider::new(Some(reply.to_string()))), Duration::from_secs(5))
    }

    fn value(candidates: &BTreeMap<String, Candidate>, name: &str) -> Option<String> {
        candidates.get(name).and_then(|c| c.value.clone())
    }

    struct SlowProvider;

    #[async_trait]
    impl LlmProvider for SlowProvider {
        fn name(&self) -> &str {
            "slow"
        }

        fn model(&self) -> &str {
            "slow"
        }

        async fn generate(&self, _prompt: &str) -> docfields_llm::Result<String> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(r#"{"amount": "1.00"}"#.to_string())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl LlmProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        fn model(&self) -> &str {
            "failing"
        }

        async fn generate(&self, _prompt: &str) -> docfields_llm::Result<String> {
            Err(LlmError::EmptyResponse)
        }
    }

    #[tokio::test]
    async fn test_names_normalised_and_inventions_dropped() {
        let reply = r#"```json
{"Invoice No": "INV-1", "Issue-Date": "2024/01/05", "AMOUNT": "￥1,000", "vendor": "ACME"}
```"#;
        let candidates = structurer(reply).structure("some text", &schema()).await;

        assert_eq!(candidates.len(), 3);
        assert_eq!(value(&candidates, "invoice_number").as_deref(), Some("INV-1"));
        assert_eq!(value(&candidates, "issue_date").as_deref(), Some("2024-01-05"));
        assert_eq!(value(&candidates, "amount").as_deref(), Some("1000.00"));
        assert!(candidates.values().all(|c| c.source == Source::Llm && c.confidence == LLM_CONFIDENCE));
    }

    #[tokio::test]
    async fn test_wrapper_and_value_shapes() {
        let reply = r#"{"data": {"amount": 12.5, "items": ["pen", "ink"], "invoice_number": "", "issue_date": null}}"#;
        let candidates = structurer(reply).structure("text", &schema()).await;

        assert_eq!(value(&candidates, "amount").as_deref(), Some("12.50"));
        assert_eq!(value(&candidates, "items").as_deref(), Some("pen, ink"));
        assert!(!candidates.contains_key("invoice_number"));
        assert!(!candidates.contains_key("issue_date"));
    }

    #[tokio::test]
    async fn test_exact_name_wins_over_alias() {
        let reply = r#"{"invoice no": "A-1", "invoice_number": "B-2"}"#;
        let candidates = structurer(reply).structure("text", &schema()).await;
        assert_eq!(value(&candidates, "invoice_number").as_deref(), Some("B-2"));
    }

    #[tokio::test]
    async fn test_unparseable_reply_is_empty() {
        let candidates = LlmStructurer::new(Arc::new(MockProvider::new(None)), Duration::from_secs(5))
            .structure("text", &schema())
            .await;
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_provider_error_is_empty() {
        let structurer = LlmStructurer::new(Arc::new(FailingProvider), Duration::from_secs(5));
        assert!(structurer.structure("text", &schema()).await.is_empty());
    }

    #[tokio::test]
    async fn test_timeout_is_empty() {
        let structurer = LlmStructurer::new(Arc::new(SlowProvider), Duration::from_millis(50));
        assert!(structurer.structure("text", &schema()).await.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_and_empty_text() {
        assert!(LlmStructurer::disabled().structure("text", &schema()).await.is_empty());
        assert!(structurer(r#"{"amount": "1.00"}"#).structure("  ", &schema()).await.is_empty());
    }

    #[test]
    fn test_from_config() {
        assert!(LlmStructurer::from_config(&LlmConfig::mock("{}")).is_enabled());

        let config = LlmConfig {
            enabled: false,
            ..LlmConfig::mock("{}")
        };
        assert!(!LlmStructurer::from_config(&config).is_enabled());
    }

    #[test]
    fn test_prompt_lists_fields() {
        let schema = DocumentSchema::new(
            "invoice",
            vec![FieldSchema::new("invoice_number", FieldType::Text)
                .with_pattern(r"\d{8,12}")
                .unwrap()
                .with_description("Number printed in the header")],
        )
        .unwrap();
        let prompt = build_prompt("No 42", &schema);
        assert!(prompt.contains("- invoice_number (text): Number printed in the header [pattern: \\d{8,12}]"));
        assert!(prompt.contains("```\nNo 42\n```"));
        assert!(prompt.contains("\"invoice_number\": \"...\""));
    }
}
