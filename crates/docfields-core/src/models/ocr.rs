//! OCR collaborator document.

use serde::{Deserialize, Serialize};

use super::field::clamp_confidence;

/// A recognised text block (usually a word or a line).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    /// Recognised text content.
    pub text: String,

    /// Axis-aligned bounding box (x1, y1, x2, y2).
    #[serde(default)]
    pub bbox: [f64; 4],

    /// Recognition confidence (0 - 100).
    pub confidence: f64,
}

/// Output of an external OCR engine, or of the PDF text layer.
///
/// Confidences given on a 0 - 1 scale are rescaled to 0 - 100 when the
/// document is deserialized. The scale is decided once per document from
/// the largest confidence among the document and its blocks. A missing
/// document confidence is the mean of the block confidences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawOcrDocument")]
pub struct OcrDocument {
    /// Full recognised text.
    pub text: String,

    /// Overall confidence (0 - 100).
    pub confidence: f64,

    /// Per-block results in reading order.
    pub per_block: Vec<TextBlock>,

    /// Engine name (e.g. "tesseract", "pdf-text").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,

    /// Detected language(s).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Deserialize)]
struct RawOcrDocument {
    text: String,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default, alias = "text_blocks")]
    per_block: Vec<TextBlock>,
    #[serde(default)]
    engine: Option<String>,
    #[serde(default)]
    language: Option<String>,
}

impl From<RawOcrDocument> for OcrDocument {
    fn from(raw: RawOcrDocument) -> Self {
        let largest = raw
            .per_block
            .iter()
            .map(|block| block.confidence)
            .chain(raw.confidence)
            .fold(0.0_f64, f64::max);
        let fractional = largest > 0.0 && largest <= 1.0;
        let scale = |c: f64| clamp_confidence(if fractional { c * 100.0 } else { c });

        let confidence = match raw.confidence {
            Some(confidence) => confidence,
            None if raw.per_block.is_empty() => 0.0,
            None => raw.per_block.iter().map(|block| block.confidence).sum::<f64>() / raw.per_block.len() as f64,
        };

        Self {
            text: raw.text,
            confidence: scale(confidence),
            per_block: raw
                .per_block
                .into_iter()
                .map(|block| TextBlock {
                    confidence: scale(block.confidence),
                    ..block
                })
                .collect(),
            engine: raw.engine,
            language: raw.language,
        }
    }
}

impl OcrDocument {
    /// A document with no block breakdown.
    pub fn from_text(text: impl Into<String>, confidence: f64) -> Self {
        Self {
            text: text.into(),
            confidence: clamp_confidence(confidence),
            per_block: Vec::new(),
            engine: None,
            language: None,
        }
    }

    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    /// Confidence for the text at byte range `start..end` of `self.text`.
    ///
    /// Blocks are located in reading order; the block whose span contains
    /// the range supplies the confidence, otherwise the document does.
    pub fn confidence_at(&self, start: usize, end: usize) -> f64 {
        let mut cursor = 0;
        for block in &self.per_block {
            let needle = block.text.trim();
            if needle.is_empty() {
                continue;
            }
            let Some(offset) = self.text.get(cursor..).and_then(|rest| rest.find(needle)) else {
                continue;
            };
            let block_start = cursor + offset;
            let block_end = block_start + needle.len();
            if block_start <= start && end <= block_end {
                return clamp_confidence(block.confidence);
            }
            cursor = block_end;
        }
        clamp_confidence(self.confidence)
    }
}
