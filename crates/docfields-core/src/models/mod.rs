//! Data models for documents, candidates and reconciled results.

pub mod config;
pub mod field;
pub mod ocr;

pub use config::{CleaningConfig, DocfieldsConfig, ExtractionConfig, SchemaConfig};
pub use field::{Candidate, FieldResult, Source, StructuredResult};
pub use ocr::{OcrDocument, TextBlock};
