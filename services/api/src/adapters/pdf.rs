//! services/api/src/adapters/pdf.rs
//!
//! This module contains the adapter for PDF text extraction.
//! It implements the `TextExtractor` port from the `core` crate using the
//! `pdf-extract` crate.

use async_trait::async_trait;
use study_assistant_core::domain::ExtractedText;
use study_assistant_core::ports::{PortError, PortResult, TextExtractor};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `TextExtractor` port over `pdf-extract`.
#[derive(Clone, Default)]
pub struct PdfExtractAdapter;

impl PdfExtractAdapter {
    pub fn new() -> Self {
        Self
    }
}

//=========================================================================================
// `TextExtractor` Trait Implementation
//=========================================================================================

#[async_trait]
impl TextExtractor for PdfExtractAdapter {
    /// Extracts plain text from PDF bytes. Parsing is CPU-bound, so it runs
    /// on the blocking thread pool. `pdf-extract` does not report a page
    /// count, so it is left unset.
    async fn extract(&self, file_bytes: &[u8]) -> PortResult<ExtractedText> {
        let bytes = file_bytes.to_vec();
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| PortError::Unexpected(format!("extraction task panicked: {}", e)))?
            .map_err(|e| PortError::Extraction(e.to_string()))?;

        Ok(ExtractedText {
            text,
            page_count: None,
        })
    }
}
