//! Embedded text layer of born-digital PDFs.
//!
//! Scanned PDFs carry no text layer and have to go through an external OCR
//! engine; they are reported as [`PdfError::NoText`].

use std::path::Path;

use lopdf::Document;
use tracing::{debug, trace, warn};

use crate::error::PdfError;
use crate::models::OcrDocument;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Engine tag set on documents read from the text layer.
pub const PDF_TEXT_ENGINE: &str = "pdf-text";

/// Confidence of embedded text.
const TEXT_LAYER_CONFIDENCE: f64 = 100.0;

/// A loaded PDF whose pages are read from the embedded text layer.
pub struct PdfTextSource {
    document: Document,
}

impl PdfTextSource {
    /// Load from bytes. PDFs encrypted with an empty user password are
    /// decrypted; any other encryption is an error.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut document = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        if document.is_encrypted() {
            if document.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");
        }

        let page_count = document.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        Ok(Self { document })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .map_err(|e| PdfError::Parse(format!("{}: {e}", path.display())))?;
        Self::from_bytes(&data)
    }

    pub fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    /// Text of a 1-indexed page, trimmed. Empty for image-only pages.
    pub fn page_text(&self, page: u32) -> Result<String> {
        if !self.document.get_pages().contains_key(&page) {
            return Err(PdfError::InvalidPage(page));
        }
        let text = self
            .document
            .extract_text(&[page])
            .map_err(|e| PdfError::Parse(format!("page {page}: {e}")))?;
        Ok(text.trim().to_string())
    }

    /// Every page with text as an OCR document, in page order.
    ///
    /// Pages without text are skipped; if none has text the PDF needs OCR.
    pub fn pages(&self) -> Result<Vec<(u32, OcrDocument)>> {
        let mut pages = Vec::new();
        for page in self.document.get_pages().into_keys() {
            let text = match self.page_text(page) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Skipping page {page}: {e}");
                    continue;
                }
            };
            if text.is_empty() {
                trace!("Page {page} has no text layer");
                continue;
            }
            pages.push((
                page,
                OcrDocument::from_text(text, TEXT_LAYER_CONFIDENCE).with_engine(PDF_TEXT_ENGINE),
            ));
        }

        if pages.is_empty() {
            return Err(PdfError::NoText);
        }
        debug!("Read text layer from {}/{} pages", pages.len(), self.page_count());
        Ok(pages)
    }
}

impl std::fmt::Debug for PdfTextSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfTextSource")
            .field("pages", &self.page_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};
    use pretty_assertions::assert_eq;

    /// A PDF with one page per entry; `None` pages have no content.
    fn build_pdf(pages: &[Option<&str>]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let operations = match text {
                Some(text) => vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
                None => vec![],
            };
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut data = Vec::new();
        doc.save_to(&mut data).unwrap();
        data
    }

    #[test]
    fn test_text_pages() {
        let source = PdfTextSource::from_bytes(&build_pdf(&[Some("Invoice 42"), None, Some("Total 10.00")])).unwrap();
        assert_eq!(source.page_count(), 3);

        let pages = source.pages().unwrap();
        let numbers: Vec<u32> = pages.iter().map(|(n, _)| *n).collect();
        assert_eq!(numbers, vec![1, 3]);

        let (_, first) = &pages[0];
        assert!(first.text.contains("Invoice 42"));
        assert_eq!(first.confidence, 100.0);
        assert_eq!(first.engine.as_deref(), Some(PDF_TEXT_ENGINE));
    }

    #[test]
    fn test_image_only_pdf_needs_ocr() {
        let source = PdfTextSource::from_bytes(&build_pdf(&[None])).unwrap();
        assert_eq!(source.page_text(1).unwrap(), "");
        assert!(matches!(source.pages(), Err(PdfError::NoText)));
    }

    #[test]
    fn test_invalid_page() {
        let source = PdfTextSource::from_bytes(&build_pdf(&[Some("x")])).unwrap();
        assert!(matches!(source.page_text(2), Err(PdfError::InvalidPage(2))));
    }

    #[test]
    fn test_not_a_pdf() {
        assert!(matches!(
            PdfTextSource::from_bytes(b"plain text"),
            Err(PdfError::Parse(_))
        ));
    }
}
