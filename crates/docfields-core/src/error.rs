//! Error types for the docfields-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the docfields library.
#[derive(Error, Debug)]
pub enum DocfieldsError {
    /// Schema registry error.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to field schemas.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// No schema is registered for the requested document type.
    #[error("unknown document type: {0}")]
    UnknownDocumentType(String),

    /// A field pattern does not compile.
    #[error("invalid pattern for field {field}: {reason}")]
    InvalidPattern { field: String, reason: String },

    /// A field name is declared twice in one schema.
    #[error("duplicate field {field} in schema {doc_type}")]
    DuplicateField { doc_type: String, field: String },

    /// A schema document could not be parsed.
    #[error("failed to parse schema {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// Reading the schema store failed.
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors related to reading the PDF text layer.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),

    /// No page carries an embedded text layer.
    #[error("PDF has no embedded text; run it through OCR first")]
    NoText,
}

/// Errors from the NER model. Never escapes the entity extractor.
#[derive(Error, Debug)]
pub enum NerError {
    /// Failed to load the model, tokenizer or label map.
    #[error("failed to load NER model: {0}")]
    ModelLoad(String),

    /// Inference failed.
    #[error("NER inference failed: {0}")]
    Inference(String),
}

/// Result type for the docfields library.
pub type Result<T> = std::result::Result<T, DocfieldsError>;
