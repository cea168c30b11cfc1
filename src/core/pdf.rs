use tracing::debug;

use super::errors::CoreError;

pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Concatenates each page's text layer in page order. Pages without a
    /// text layer (scanned images) contribute nothing.
    pub fn extract_text(&self, data: &[u8]) -> Result<String, CoreError> {
        let pages = self.extract_pages(data)?;
        let empty_pages = pages.iter().filter(|p| p.trim().is_empty()).count();
        if empty_pages > 0 {
            debug!(
                pages = pages.len(),
                empty_pages, "pdf contains pages without a text layer"
            );
        }

        Ok(pages.concat())
    }

    pub fn extract_pages(&self, data: &[u8]) -> Result<Vec<String>, CoreError> {
        if data.is_empty() {
            return Err(CoreError::CorruptDocument("empty PDF payload".to_string()));
        }

        std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(data))
            .map_err(|_| CoreError::CorruptDocument("PDF parser aborted".to_string()))?
            .map_err(|err| CoreError::CorruptDocument(err.to_string()))
    }
}

impl Default for PdfTextExtractor {
    fn default() -> Self {
        Self::new()
    }
}
