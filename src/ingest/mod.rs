//! Document text extraction
//!
//! Turns an uploaded file into page texts for the chunker. PDFs go through a
//! fallback chain: embedded text via lopdf, then OCR when the embedded text is
//! missing or too short, then a fixed placeholder. Plain text files are decoded
//! as UTF-8, lossily if needed.

mod ocr;

pub use ocr::{OcrEngine, TesseractOcr};

use crate::config::ExtractionConfig;
use crate::error::{DocctxError, Result};
use crate::outcome::StageOutcome;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Text stored when no strategy could read a PDF
pub const PDF_PLACEHOLDER: &str = "Error extracting text from PDF.";

/// Text stored when a plain text file is empty or unreadable
pub const TEXT_PLACEHOLDER: &str = "Error extracting text from file.";

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("PDF parsing failed: {0}")]
    Pdf(String),

    #[error("OCR failed: {0}")]
    Ocr(String),
}

/// Supported document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Text,
}

impl DocumentKind {
    /// Detect the format from the file extension, case-insensitively
    pub fn from_file_name(file_name: &str) -> Result<Self> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("pdf") => Ok(DocumentKind::Pdf),
            Some("txt") => Ok(DocumentKind::Text),
            _ => Err(DocctxError::UnsupportedFileType {
                file_name: file_name.to_string(),
            }),
        }
    }
}

/// An uploaded file
#[derive(Debug, Clone)]
pub struct Document {
    pub file_name: String,
    pub kind: DocumentKind,
    pub bytes: Vec<u8>,
}

impl Document {
    /// Rejects unsupported extensions before any bytes are inspected
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let file_name = file_name.into();
        let kind = DocumentKind::from_file_name(&file_name)?;
        Ok(Self {
            file_name,
            kind,
            bytes,
        })
    }

    /// Read a document from disk, keeping only the file name
    pub fn from_path(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        // Check the extension first so unsupported files are never read
        DocumentKind::from_file_name(&file_name)?;

        let bytes = std::fs::read(path).map_err(|e| DocctxError::Io {
            source: e,
            context: format!("Failed to read document: {:?}", path),
        })?;
        Self::new(file_name, bytes)
    }
}

/// Page-text extractor with optional OCR fallback
pub struct Extractor {
    min_text_chars: usize,
    ocr: Option<Arc<dyn OcrEngine>>,
}

impl Extractor {
    pub fn new(min_text_chars: usize, ocr: Option<Arc<dyn OcrEngine>>) -> Self {
        Self { min_text_chars, ocr }
    }

    /// Build from configuration, wiring tesseract when OCR is enabled
    pub fn from_config(config: &ExtractionConfig) -> Self {
        let ocr: Option<Arc<dyn OcrEngine>> = if config.ocr_enabled {
            Some(Arc::new(TesseractOcr::from_config(config)))
        } else {
            None
        };
        Self::new(config.min_text_chars, ocr)
    }

    /// Extract page texts; never fails, the outcome says which branch answered
    pub fn extract(&self, document: &Document) -> StageOutcome<Vec<String>> {
        match document.kind {
            DocumentKind::Pdf => self.extract_pdf(&document.bytes),
            DocumentKind::Text => extract_text(&document.bytes),
        }
    }

    fn extract_pdf(&self, bytes: &[u8]) -> StageOutcome<Vec<String>> {
        let reason = match extract_pdf_pages(bytes) {
            Ok(pages) => {
                let total = extracted_chars(&pages);
                if total >= self.min_text_chars {
                    tracing::debug!("Extracted {} chars from {} PDF page(s)", total, pages.len());
                    return StageOutcome::Success(pages);
                }
                format!(
                    "embedded text too short ({} < {} chars), likely a scanned PDF",
                    total, self.min_text_chars
                )
            }
            Err(e) => e.to_string(),
        };

        tracing::info!("Direct PDF extraction unusable ({}), trying OCR", reason);

        let Some(ocr) = &self.ocr else {
            tracing::warn!("OCR disabled, storing placeholder text");
            return StageOutcome::failed(
                vec![PDF_PLACEHOLDER.to_string()],
                format!("{}; OCR disabled", reason),
            );
        };

        match ocr.ocr_pdf(bytes) {
            Ok(pages) if pages.iter().any(|p| !p.trim().is_empty()) => {
                StageOutcome::degraded(pages, reason)
            }
            Ok(_) => {
                tracing::warn!("OCR produced no text, storing placeholder text");
                StageOutcome::failed(
                    vec![PDF_PLACEHOLDER.to_string()],
                    format!("{}; OCR produced no text", reason),
                )
            }
            Err(e) => {
                tracing::warn!("OCR failed ({}), storing placeholder text", e);
                StageOutcome::failed(
                    vec![PDF_PLACEHOLDER.to_string()],
                    format!("{}; {}", reason, e),
                )
            }
        }
    }
}

/// Raw extracted characters across pages, whitespace included
fn extracted_chars(pages: &[String]) -> usize {
    pages.iter().map(|p| p.chars().count()).sum()
}

/// Embedded text of every page, in page order
///
/// A page whose content stream cannot be decoded contributes an empty string.
fn extract_pdf_pages(bytes: &[u8]) -> std::result::Result<Vec<String>, ExtractionError> {
    let document =
        lopdf::Document::load_mem(bytes).map_err(|e| ExtractionError::Pdf(e.to_string()))?;

    let mut pages = Vec::new();
    for page_number in document.get_pages().keys() {
        match document.extract_text(&[*page_number]) {
            Ok(text) => pages.push(text),
            Err(e) => {
                tracing::debug!("Page {} has no extractable text: {}", page_number, e);
                pages.push(String::new());
            }
        }
    }

    if pages.is_empty() {
        return Err(ExtractionError::Pdf("document has no pages".to_string()));
    }

    Ok(pages)
}

fn extract_text(bytes: &[u8]) -> StageOutcome<Vec<String>> {
    let outcome = match std::str::from_utf8(bytes) {
        Ok(text) => StageOutcome::Success(text.to_string()),
        Err(e) => {
            tracing::warn!("Text file is not valid UTF-8 ({}), decoding lossily", e);
            StageOutcome::degraded(
                String::from_utf8_lossy(bytes).into_owned(),
                format!("invalid UTF-8: {}", e),
            )
        }
    };

    if outcome.value().trim().is_empty() {
        return StageOutcome::failed(vec![TEXT_PLACEHOLDER.to_string()], "file is empty");
    }

    outcome.map(|text| vec![text])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::StageStatus;

    struct FixedOcr(std::result::Result<Vec<String>, String>);

    impl OcrEngine for FixedOcr {
        fn ocr_pdf(&self, _pdf_bytes: &[u8]) -> std::result::Result<Vec<String>, ExtractionError> {
            self.0.clone().map_err(ExtractionError::Ocr)
        }
    }

    fn extractor_with(ocr: FixedOcr) -> Extractor {
        Extractor::new(100, Some(Arc::new(ocr)))
    }

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(DocumentKind::from_file_name("report.PDF").unwrap(), DocumentKind::Pdf);
        assert_eq!(DocumentKind::from_file_name("notes.txt").unwrap(), DocumentKind::Text);
        assert!(matches!(
            DocumentKind::from_file_name("slides.docx"),
            Err(DocctxError::UnsupportedFileType { .. })
        ));
        assert!(DocumentKind::from_file_name("README").is_err());
    }

    #[test]
    fn test_ocr_threshold_counts_raw_characters() {
        let pages = vec![" ".repeat(60), format!("{}\n", "x".repeat(39))];
        assert_eq!(extracted_chars(&pages), 100);
        assert_eq!(extracted_chars(&["é".to_string()]), 1);
    }

    #[test]
    fn test_utf8_text() {
        let doc = Document::new("a.txt", "héllo world".as_bytes().to_vec()).unwrap();
        let outcome = Extractor::new(100, None).extract(&doc);
        assert_eq!(outcome.status(), StageStatus::Success);
        assert_eq!(outcome.value(), &vec!["héllo world".to_string()]);
    }

    #[test]
    fn test_invalid_utf8_is_degraded() {
        let doc = Document::new("a.txt", vec![b'o', b'k', 0xff, b'!']).unwrap();
        let outcome = Extractor::new(100, None).extract(&doc);
        assert_eq!(outcome.status(), StageStatus::Degraded);
        assert_eq!(outcome.value()[0], "ok\u{fffd}!");
    }

    #[test]
    fn test_empty_text_gets_placeholder() {
        let doc = Document::new("a.txt", b"  \n ".to_vec()).unwrap();
        let outcome = Extractor::new(100, None).extract(&doc);
        assert_eq!(outcome.status(), StageStatus::Failed);
        assert_eq!(outcome.value(), &vec![TEXT_PLACEHOLDER.to_string()]);
    }

    #[test]
    fn test_unreadable_pdf_falls_back_to_ocr() {
        let doc = Document::new("scan.pdf", b"not a pdf".to_vec()).unwrap();
        let extractor = extractor_with(FixedOcr(Ok(vec![
            "page one".to_string(),
            "page two".to_string(),
        ])));

        let outcome = extractor.extract(&doc);
        assert_eq!(outcome.status(), StageStatus::Degraded);
        assert_eq!(outcome.value().len(), 2);
        assert!(outcome.reason().is_some());
    }

    #[test]
    fn test_ocr_failure_gives_placeholder() {
        let doc = Document::new("scan.pdf", b"not a pdf".to_vec()).unwrap();
        let extractor = extractor_with(FixedOcr(Err("tesseract missing".to_string())));

        let outcome = extractor.extract(&doc);
        assert_eq!(outcome.status(), StageStatus::Failed);
        assert_eq!(outcome.value(), &vec![PDF_PLACEHOLDER.to_string()]);
        assert!(outcome.reason().unwrap_or_default().contains("tesseract missing"));
    }

    #[test]
    fn test_blank_ocr_gives_placeholder() {
        let doc = Document::new("scan.pdf", b"not a pdf".to_vec()).unwrap();
        let extractor = extractor_with(FixedOcr(Ok(vec!["   ".to_string()])));
        assert_eq!(extractor.extract(&doc).status(), StageStatus::Failed);
    }

    #[test]
    fn test_ocr_disabled_gives_placeholder() {
        let doc = Document::new("scan.pdf", b"not a pdf".to_vec()).unwrap();
        let outcome = Extractor::new(100, None).extract(&doc);
        assert_eq!(outcome.status(), StageStatus::Failed);
        assert_eq!(outcome.value()[0], PDF_PLACEHOLDER);
    }

    #[test]
    fn test_from_path_rejects_before_reading() {
        let result = Document::from_path(Path::new("/nonexistent/deck.pptx"));
        assert!(matches!(result, Err(DocctxError::UnsupportedFileType { .. })));
    }
}
