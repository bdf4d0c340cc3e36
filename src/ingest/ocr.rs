// OCR fallback for scanned PDFs
// Rasterizes pages with pdftoppm and reads each image with tesseract.

use super::ExtractionError;
use crate::config::ExtractionConfig;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Image-based text extraction, one string per page in page order
pub trait OcrEngine: Send + Sync {
    fn ocr_pdf(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError>;
}

/// OCR through the poppler and tesseract command-line tools
pub struct TesseractOcr {
    pdftoppm: String,
    tesseract: String,
    dpi: u32,
}

impl TesseractOcr {
    pub fn new(pdftoppm: impl Into<String>, tesseract: impl Into<String>, dpi: u32) -> Self {
        Self {
            pdftoppm: pdftoppm.into(),
            tesseract: tesseract.into(),
            dpi,
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(
            config.pdftoppm_command.clone(),
            config.tesseract_command.clone(),
            config.ocr_dpi,
        )
    }

    fn rasterize(&self, pdf_path: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
        let prefix = out_dir.join("page");
        let output = Command::new(&self.pdftoppm)
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-png")
            .arg(pdf_path)
            .arg(&prefix)
            .output()
            .map_err(|e| ExtractionError::Ocr(format!("Failed to run {}: {}", self.pdftoppm, e)))?;

        if !output.status.success() {
            return Err(ExtractionError::Ocr(format!(
                "{} exited with {}: {}",
                self.pdftoppm,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let entries = std::fs::read_dir(out_dir)
            .map_err(|e| ExtractionError::Ocr(format!("Failed to list page images: {}", e)))?;

        // pdftoppm zero-pads page numbers, so name order is page order
        let mut images: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
                name.starts_with("page") && name.ends_with(".png")
            })
            .collect();
        images.sort();

        if images.is_empty() {
            return Err(ExtractionError::Ocr("pdftoppm produced no pages".to_string()));
        }

        Ok(images)
    }

    fn read_image(&self, image: &Path) -> Result<String, ExtractionError> {
        let output = Command::new(&self.tesseract)
            .arg(image)
            .arg("stdout")
            .output()
            .map_err(|e| {
                ExtractionError::Ocr(format!("Failed to run {}: {}", self.tesseract, e))
            })?;

        if !output.status.success() {
            return Err(ExtractionError::Ocr(format!(
                "{} failed on {:?}: {}",
                self.tesseract,
                image,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl OcrEngine for TesseractOcr {
    fn ocr_pdf(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        let work_dir = tempfile::tempdir()
            .map_err(|e| ExtractionError::Ocr(format!("Failed to create temp dir: {}", e)))?;
        let pdf_path = work_dir.path().join("input.pdf");
        std::fs::write(&pdf_path, pdf_bytes)
            .map_err(|e| ExtractionError::Ocr(format!("Failed to write temp PDF: {}", e)))?;

        let images = self.rasterize(&pdf_path, work_dir.path())?;
        tracing::debug!("OCR: rasterized {} page(s)", images.len());

        images.iter().map(|image| self.read_image(image)).collect()
    }
}
