//! crates/study_assistant_core/src/ingestion.rs
//!
//! The asynchronous pipeline that turns a raw uploaded file into a chunked,
//! searchable document: extract text, chunk it, persist everything with the
//! `Ready` status flip as one atomic update. Any failure along the way moves
//! the document to the terminal `Failed` state instead; nothing is partially
//! persisted and nothing is retried.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use crate::chunker::{chunk_text, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::domain::DocumentStatus;
use crate::ports::{PortError, PortResult, StorageService, TextExtractor};

/// Orchestrates document ingestion over the extractor and storage ports.
///
/// The surrounding system must ensure at most one ingestion run per
/// document; the pipeline itself does not guard against concurrent runs
/// for the same id.
#[derive(Clone)]
pub struct IngestionPipeline {
    extractor: Arc<dyn TextExtractor>,
    storage: Arc<dyn StorageService>,
}

impl IngestionPipeline {
    pub fn new(extractor: Arc<dyn TextExtractor>, storage: Arc<dyn StorageService>) -> Self {
        Self { extractor, storage }
    }

    /// Runs ingestion to completion and returns the terminal status.
    ///
    /// Extraction failures and empty extractor output both resolve to
    /// `Failed`; errors are logged here rather than raised past the
    /// pipeline boundary, since `Failed` is a user-visible state and not
    /// an exception.
    pub async fn run(&self, document_id: Uuid, file_bytes: Vec<u8>) -> DocumentStatus {
        match self.process(document_id, &file_bytes).await {
            Ok(()) => {
                info!("Document {} ingested successfully.", document_id);
                DocumentStatus::Ready
            }
            Err(e) => {
                error!("Ingestion of document {} failed: {}", document_id, e);
                if let Err(e) = self.storage.mark_document_failed(document_id).await {
                    error!(
                        "Failed to mark document {} as failed: {}",
                        document_id, e
                    );
                }
                DocumentStatus::Failed
            }
        }
    }

    /// Spawns `run` as a detached background task, returning the handle so
    /// callers can await completion when they care and drop it when they
    /// don't. The creating request observes only the later status flip.
    pub fn spawn(&self, document_id: Uuid, file_bytes: Vec<u8>) -> JoinHandle<DocumentStatus> {
        let pipeline = self.clone();
        tokio::spawn(async move { pipeline.run(document_id, file_bytes).await })
    }

    async fn process(&self, document_id: Uuid, file_bytes: &[u8]) -> PortResult<()> {
        let extracted = self.extractor.extract(file_bytes).await?;
        if extracted.text.trim().is_empty() {
            return Err(PortError::Extraction(
                "extractor returned no readable text".to_string(),
            ));
        }

        let chunks = chunk_text(&extracted.text, DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)?;

        self.storage
            .mark_document_ready(document_id, &extracted.text, extracted.page_count, &chunks)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ExtractedText;
    use crate::test_support::{FailingExtractor, FixedExtractor, InMemoryStorage};

    async fn seeded_storage() -> (Arc<InMemoryStorage>, Uuid) {
        let storage = Arc::new(InMemoryStorage::default());
        let doc = storage
            .seed_document(Uuid::new_v4(), "Notes", "notes.pdf")
            .await;
        (storage, doc)
    }

    #[tokio::test]
    async fn successful_ingestion_marks_the_document_ready() {
        let (storage, document_id) = seeded_storage().await;
        let extractor = Arc::new(FixedExtractor::new(ExtractedText {
            text: "a".repeat(1200),
            page_count: Some(2),
        }));
        let pipeline = IngestionPipeline::new(extractor, storage.clone());

        let status = pipeline.run(document_id, b"%PDF".to_vec()).await;

        assert_eq!(status, DocumentStatus::Ready);
        let doc = storage.document(document_id).await;
        assert_eq!(doc.status, DocumentStatus::Ready);
        assert_eq!(doc.extracted_text.as_deref().map(str::len), Some(1200));
        assert_eq!(storage.chunks_for(document_id).await.len(), 3);
    }

    #[tokio::test]
    async fn extractor_failure_marks_the_document_failed() {
        let (storage, document_id) = seeded_storage().await;
        let pipeline = IngestionPipeline::new(Arc::new(FailingExtractor), storage.clone());

        let status = pipeline.run(document_id, b"garbage".to_vec()).await;

        assert_eq!(status, DocumentStatus::Failed);
        let doc = storage.document(document_id).await;
        assert_eq!(doc.status, DocumentStatus::Failed);
        assert!(doc.extracted_text.is_none());
        assert!(storage.chunks_for(document_id).await.is_empty());
    }

    #[tokio::test]
    async fn empty_extractor_output_marks_the_document_failed() {
        let (storage, document_id) = seeded_storage().await;
        let extractor = Arc::new(FixedExtractor::new(ExtractedText {
            text: "   \n\t ".to_string(),
            page_count: Some(1),
        }));
        let pipeline = IngestionPipeline::new(extractor, storage.clone());

        let status = pipeline.run(document_id, b"%PDF".to_vec()).await;
        assert_eq!(status, DocumentStatus::Failed);
    }

    #[tokio::test]
    async fn spawn_reports_completion_through_the_handle() {
        let (storage, document_id) = seeded_storage().await;
        let extractor = Arc::new(FixedExtractor::new(ExtractedText {
            text: "short but real content".to_string(),
            page_count: Some(1),
        }));
        let pipeline = IngestionPipeline::new(extractor, storage.clone());

        let handle = pipeline.spawn(document_id, b"%PDF".to_vec());
        let status = handle.await.expect("ingestion task panicked");

        assert_eq!(status, DocumentStatus::Ready);
        assert_eq!(storage.chunks_for(document_id).await.len(), 1);
    }
}
