//! Core library for schema-driven document field extraction.
//!
//! This crate provides:
//! - Field schema registry (per document type, reloadable)
//! - OCR text cleaning and value normalisation
//! - Entity extraction (NER model or regex library)
//! - LLM structuring with tolerant reply decoding
//! - Confidence reconciliation and human corrections
//! - PDF text layer reading

pub mod error;
pub mod extract;
pub mod models;
pub mod pdf;
pub mod pipeline;
pub mod reconcile;
pub mod schema;
pub mod structure;
pub mod text;

pub use error::{DocfieldsError, NerError, PdfError, Result, SchemaError};
pub use extract::{Entity, EntityExtractor, EntityKind, EntityRecognizer};
pub use models::{
    Candidate, CleaningConfig, DocfieldsConfig, ExtractionConfig, FieldResult, OcrDocument, SchemaConfig, Source,
    StructuredResult, TextBlock,
};
pub use pdf::PdfTextSource;
pub use pipeline::{DocumentPipeline, ProcessingResult};
pub use reconcile::{apply_corrections, Corrections, Reconciler, ValidationPolicy};
pub use schema::{DocumentSchema, FieldSchema, FieldType, SchemaRegistry};
pub use structure::LlmStructurer;

/// Re-export of the language-model layer.
pub use docfields_llm as llm;
