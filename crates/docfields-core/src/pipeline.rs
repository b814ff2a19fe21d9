//! End-to-end processing of one OCR document against a schema.

use std::sync::Arc;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{DocfieldsError, Result};
use crate::extract::{Entity, EntityExtractor};
use crate::models::{CleaningConfig, DocfieldsConfig, OcrDocument, StructuredResult};
use crate::reconcile::{apply_corrections, ocr_candidates, Corrections, Reconciler};
use crate::schema::SchemaRegistry;
use crate::structure::LlmStructurer;
use crate::text::TextCleaner;

/// Output of processing one document or page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    /// Document type the schema was looked up by.
    pub doc_type: String,

    /// Schema title.
    pub structure_config: String,

    /// 1-indexed page of a multi-page source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,

    /// Reconciled fields.
    pub structured_data: StructuredResult,

    /// The OCR document as received.
    pub ocr_result: OcrDocument,

    /// Text the extractors saw.
    pub cleaned_text: String,

    /// Entities found by the entity extractor.
    #[serde(default)]
    pub entities: Vec<Entity>,
}

/// Wires cleaning, extraction, structuring and reconciliation together.
#[derive(Debug, Clone)]
pub struct DocumentPipeline {
    registry: Arc<SchemaRegistry>,
    cleaner: TextCleaner,
    extractor: EntityExtractor,
    structurer: LlmStructurer,
    reconciler: Reconciler,
}

impl DocumentPipeline {
    /// Regex entities, no language model, default policy.
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            registry,
            cleaner: TextCleaner::default(),
            extractor: EntityExtractor::regex_only(),
            structurer: LlmStructurer::disabled(),
            reconciler: Reconciler::default(),
        }
    }

    /// Build every stage from configuration.
    pub fn from_config(config: &DocfieldsConfig, registry: Arc<SchemaRegistry>) -> Self {
        Self {
            registry,
            cleaner: TextCleaner::from_config(&config.cleaning),
            extractor: EntityExtractor::from_config(&config.extraction),
            structurer: LlmStructurer::from_config(&config.llm),
            reconciler: Reconciler::with_threshold(config.extraction.confidence_threshold),
        }
    }

    pub fn with_cleaning(mut self, cleaning: CleaningConfig) -> Self {
        self.cleaner = TextCleaner::from_config(&cleaning);
        self
    }

    pub fn with_extractor(mut self, extractor: EntityExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_structurer(mut self, structurer: LlmStructurer) -> Self {
        self.structurer = structurer;
        self
    }

    pub fn with_reconciler(mut self, reconciler: Reconciler) -> Self {
        self.reconciler = reconciler;
        self
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// Process one OCR document. Only an unknown document type fails.
    pub async fn process(&self, doc_type: &str, document: &OcrDocument) -> Result<ProcessingResult> {
        let schema = self.registry.get(doc_type)?;
        let cleaned_text = self.cleaner.clean(&document.text);
        debug!(
            "Cleaned OCR text: {} -> {} chars",
            document.text.chars().count(),
            cleaned_text.chars().count()
        );

        let (extraction, llm) = tokio::join!(
            self.extractor.run_detached(cleaned_text.clone(), Arc::clone(&schema)),
            self.structurer.structure(&cleaned_text, &schema),
        );

        let ocr = ocr_candidates(document, &schema);
        let llm: Vec<_> = llm.into_values().collect();
        debug!(
            "Candidates: {} ocr, {} nlp, {} llm",
            ocr.len(),
            extraction.candidates.len(),
            llm.len()
        );

        let structured_data = self.reconciler.reconcile(&schema, &ocr, &extraction.candidates, &llm);
        info!(
            "{}: coverage {:.1}%, {} field(s) need validation",
            doc_type,
            structured_data.coverage(),
            structured_data.validation_list().len()
        );

        Ok(ProcessingResult {
            doc_type: doc_type.to_string(),
            structure_config: schema.title.clone(),
            page_number: None,
            structured_data,
            ocr_result: document.clone(),
            cleaned_text,
            entities: extraction.entities,
        })
    }

    /// Process pages concurrently; results come back in page order.
    pub async fn process_pages(
        &self,
        doc_type: &str,
        pages: Vec<(u32, OcrDocument)>,
    ) -> Result<Vec<ProcessingResult>> {
        let mut pages = pages;
        pages.sort_by_key(|(number, _)| *number);

        let results = join_all(pages.iter().map(|(number, document)| async move {
            let mut result = self.process(doc_type, document).await?;
            result.page_number = Some(*number);
            Ok::<_, DocfieldsError>(result)
        }))
        .await;

        results.into_iter().collect()
    }

    /// Fold corrections into an earlier result without re-running anything.
    pub fn reapply(&self, result: &ProcessingResult, corrections: &Corrections) -> ProcessingResult {
        reapply(result, corrections)
    }
}

/// Apply corrections to a stored result.
pub fn reapply(result: &ProcessingResult, corrections: &Corrections) -> ProcessingResult {
    ProcessingResult {
        structured_data: apply_corrections(&result.structured_data, corrections),
        ..result.clone()
    }
}
