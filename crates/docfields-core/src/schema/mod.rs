//! Field schemas: the per-document-type declaration of expected fields.
//!
//! A schema document on disk looks like
//!
//! ```json
//! {
//!   "title": "Invoice",
//!   "description": "Supplier invoice",
//!   "items": [
//!     {"field": "invoice_number", "type": "text", "pattern": "\\d{8,12}"},
//!     {"field": "amount", "type": "amount", "aliases": ["total"]}
//!   ]
//! }
//! ```
//!
//! and its document-type key is the file stem.

mod registry;

pub use registry::SchemaRegistry;

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Semantic type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    #[serde(alias = "string", alias = "str", alias = "文本")]
    Text,
    #[serde(alias = "int", alias = "integer", alias = "数字")]
    Number,
    #[serde(alias = "日期")]
    Date,
    #[serde(alias = "money", alias = "currency", alias = "金额")]
    Amount,
    #[serde(alias = "float", alias = "小数")]
    Decimal,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Amount => "amount",
            FieldType::Decimal => "decimal",
        }
    }

    /// Whether values of this type are numeric.
    pub fn is_numeric(self) -> bool {
        matches!(self, FieldType::Number | FieldType::Amount | FieldType::Decimal)
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared field.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    pub description: Option<String>,
    pub aliases: Vec<String>,
    pattern: Option<String>,
    search: Option<Regex>,
    anchored: Option<Regex>,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: true,
            description: None,
            aliases: Vec::new(),
            pattern: None,
            search: None,
            anchored: None,
        }
    }

    /// Attach a validation pattern; compiled once here.
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self, SchemaError> {
        let invalid = |e: regex::Error| SchemaError::InvalidPattern {
            field: self.name.clone(),
            reason: e.to_string(),
        };
        let search = Regex::new(pattern).map_err(invalid)?;
        let anchored = Regex::new(&format!("^(?:{pattern})$")).map_err(invalid)?;

        self.pattern = Some(pattern.to_string());
        self.search = Some(search);
        self.anchored = Some(anchored);
        Ok(self)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    /// Regex for locating values inside free text.
    pub fn search_regex(&self) -> Option<&Regex> {
        self.search.as_ref()
    }

    /// True when there is no pattern, or the whole value matches it.
    pub fn accepts(&self, value: &str) -> bool {
        self.anchored.as_ref().is_none_or(|re| re.is_match(value))
    }

    /// True when `raw` names this field (case, separators and aliases ignored).
    pub fn is_named(&self, raw: &str) -> bool {
        let key = normalize_key(raw);
        !key.is_empty()
            && (normalize_key(&self.name) == key || self.aliases.iter().any(|a| normalize_key(a) == key))
    }
}

/// The declared field set for one document type.
#[derive(Debug, Clone)]
pub struct DocumentSchema {
    pub doc_type: String,
    pub title: String,
    pub description: Option<String>,
    fields: Vec<FieldSchema>,
}

impl DocumentSchema {
    /// Build a schema; field names must be unique.
    pub fn new(doc_type: impl Into<String>, fields: Vec<FieldSchema>) -> Result<Self, SchemaError> {
        let doc_type = doc_type.into();
        for (i, field) in fields.iter().enumerate() {
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(SchemaError::DuplicateField {
                    doc_type,
                    field: field.name.clone(),
                });
            }
        }
        Ok(Self {
            title: doc_type.clone(),
            doc_type,
            description: None,
            fields,
        })
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Parse a schema document.
    pub fn from_json(doc_type: &str, json: &str) -> Result<Self, SchemaError> {
        let document: SchemaDocument = serde_json::from_str(json).map_err(|e| SchemaError::Parse {
            path: format!("{doc_type}.json").into(),
            reason: e.to_string(),
        })?;
        document.into_schema(doc_type)
    }

    /// Load `<doc_type>.json`; the file stem is the document type.
    pub fn from_file(path: &Path) -> Result<Self, SchemaError> {
        let doc_type = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| SchemaError::Parse {
                path: path.to_path_buf(),
                reason: "file name is not valid UTF-8".to_string(),
            })?;
        let content = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document: SchemaDocument = serde_json::from_str(&content).map_err(|e| SchemaError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        document.into_schema(doc_type)
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Map a loosely spelled name onto a declared field name.
    pub fn canonical_name(&self, raw: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == raw)
            .or_else(|| self.fields.iter().find(|f| f.is_named(raw)))
            .map(|f| f.name.as_str())
    }

    /// Convert back into the on-disk shape.
    pub fn to_document(&self) -> SchemaDocument {
        SchemaDocument {
            title: Some(self.title.clone()),
            description: self.description.clone(),
            items: self
                .fields
                .iter()
                .map(|f| SchemaItem {
                    field: f.name.clone(),
                    field_type: f.field_type,
                    description: f.description.clone(),
                    pattern: f.pattern.clone(),
                    required: f.required,
                    aliases: f.aliases.clone(),
                })
                .collect(),
        }
    }
}

/// On-disk schema document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, alias = "fields")]
    pub items: Vec<SchemaItem>,
}

/// On-disk field declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaItem {
    #[serde(alias = "name")]
    pub field: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

fn default_required() -> bool {
    true
}

impl SchemaDocument {
    pub fn into_schema(self, doc_type: &str) -> Result<DocumentSchema, SchemaError> {
        let mut fields = Vec::with_capacity(self.items.len());
        for item in self.items {
            let name = item.field.trim().to_string();
            if name.is_empty() {
                return Err(SchemaError::Parse {
                    path: format!("{doc_type}.json").into(),
                    reason: "field name must not be empty".to_string(),
                });
            }
            let mut field = FieldSchema::new(name, item.field_type).with_aliases(item.aliases);
            field.required = item.required;
            field.description = item.description.filter(|d| !d.trim().is_empty());
            if let Some(pattern) = item.pattern.as_deref().filter(|p| !p.is_empty()) {
                field = field.with_pattern(pattern)?;
            }
            fields.push(field);
        }

        let mut schema = DocumentSchema::new(doc_type, fields)?;
        if let Some(title) = self.title.filter(|t| !t.trim().is_empty()) {
            schema.title = title;
        }
        schema.description = self.description;
        Ok(schema)
    }
}

/// Lowercase and drop separators so `Invoice-Number` == `invoice_number`.
pub fn normalize_key(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-' | '.' | '/' | ':' | '：'))
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const INVOICE: &str = r#"{
        "title": "Invoice",
        "items": [
            {"field": "invoice_number", "type": "string", "pattern": "\\d{8,12}", "aliases": ["invoice no"]},
            {"field": "issue_date", "type": "date", "required": false},
            {"field": "amount", "type": "money", "pattern": "\\d+\\.\\d{2}"},
            {"field": "金额", "type": "小数"}
        ]
    }"#;

    #[test]
    fn test_parse_document() {
        let schema = DocumentSchema::from_json("invoice", INVOICE).unwrap();
        assert_eq!(schema.doc_type, "invoice");
        assert_eq!(schema.title, "Invoice");

        let names: Vec<&str> = schema.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["invoice_number", "issue_date", "amount", "金额"]);

        assert_eq!(schema.fields()[0].field_type, FieldType::Text);
        assert!(schema.fields()[0].required);
        assert!(!schema.fields()[1].required);
        assert_eq!(schema.fields()[2].field_type, FieldType::Amount);
        assert_eq!(schema.fields()[3].field_type, FieldType::Decimal);
    }

    #[test]
    fn test_pattern_requires_full_match() {
        let field = FieldSchema::new("invoice_number", FieldType::Text)
            .with_pattern(r"\d{8,12}")
            .unwrap();
        assert!(field.accepts("420015435099"));
        assert!(!field.accepts("4200"));
        assert!(!field.accepts("No. 420015435099"));
        assert!(FieldSchema::new("note", FieldType::Text).accepts("anything"));
    }

    #[test]
    fn test_alternation_is_anchored_as_a_whole() {
        let field = FieldSchema::new("currency", FieldType::Text).with_pattern("EUR|USD").unwrap();
        assert!(field.accepts("USD"));
        assert!(!field.accepts("EURO"));
    }

    #[test]
    fn test_invalid_pattern() {
        let json = r#"{"items": [{"field": "x", "pattern": "(unclosed"}]}"#;
        let err = DocumentSchema::from_json("bad", json).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidPattern { ref field, .. } if field == "x"));
    }

    #[test]
    fn test_duplicate_field() {
        let json = r#"{"items": [{"field": "x"}, {"field": "x"}]}"#;
        let err = DocumentSchema::from_json("dup", json).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField { .. }));
    }

    #[test]
    fn test_canonical_name() {
        let schema = DocumentSchema::from_json("invoice", INVOICE).unwrap();
        assert_eq!(schema.canonical_name("Invoice-Number"), Some("invoice_number"));
        assert_eq!(schema.canonical_name("INVOICE NO"), Some("invoice_number"));
        assert_eq!(schema.canonical_name("issueDate"), Some("issue_date"));
        assert_eq!(schema.canonical_name("vendor"), None);
        assert_eq!(schema.canonical_name(""), None);
    }

    #[test]
    fn test_title_defaults_to_doc_type() {
        let schema = DocumentSchema::from_json("resume", r#"{"items": []}"#).unwrap();
        assert_eq!(schema.title, "resume");
        assert!(schema.fields().is_empty());
    }

    #[test]
    fn test_to_document() {
        let schema = DocumentSchema::from_json("invoice", INVOICE).unwrap();
        let json = serde_json::to_value(schema.to_document()).unwrap();
        assert_eq!(json["items"][0]["type"], "text");
        assert_eq!(json["items"][0]["pattern"], r"\d{8,12}");
        assert_eq!(json["items"][2]["type"], "amount");
    }
}
