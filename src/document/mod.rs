// src/document/mod.rs
use std::path::Path;

use crate::utils::error::DocumentError;

/// Page separator used by text exports and by pdf-extract output.
const PAGE_BREAK: char = '\u{0c}';

/// Extracted text of one budget exhibit, one entry per page in reading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pages: Vec<String>,
}

impl Document {
    pub fn from_pages(pages: Vec<String>) -> Self {
        Self { pages }
    }

    /// Splits a single text blob into pages on form feeds.
    pub fn from_text(text: &str) -> Self {
        Self::from_pages(text.split(PAGE_BREAK).map(str::to_string).collect())
    }

    /// Reads a `.pdf` (text extracted with pdf-extract) or a plain text export.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let document = match extension.as_str() {
            "pdf" => {
                let bytes = std::fs::read(path)?;
                tracing::debug!("Read {} bytes of PDF from {}", bytes.len(), path.display());
                let text = pdf_extract::extract_text_from_mem(&bytes)
                    .map_err(|e| DocumentError::Pdf(format!("{}: {}", path.display(), e)))?;
                Self::from_text(&text)
            }
            "txt" | "text" => Self::from_text(&std::fs::read_to_string(path)?),
            other => return Err(DocumentError::UnsupportedFormat(other.to_string())),
        };

        tracing::info!(
            "Loaded {} ({} pages, {} characters)",
            path.display(),
            document.page_count(),
            document.pages().iter().map(|p| p.chars().count()).sum::<usize>()
        );
        Ok(document)
    }

    pub fn pages(&self) -> &[String] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// All pages concatenated in order, with nothing inserted between them.
    pub fn raw_text(&self) -> String {
        self.pages.concat()
    }
}
