//! crates/study_assistant_core/src/documents.rs
//!
//! Read-path access to stored documents. Fetching a single document counts
//! as study activity, so it stamps `last_accessed_at`.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::Document;
use crate::ports::{PortResult, StorageService};

#[derive(Clone)]
pub struct DocumentService {
    storage: Arc<dyn StorageService>,
}

impl DocumentService {
    pub fn new(storage: Arc<dyn StorageService>) -> Self {
        Self { storage }
    }

    /// Fetches one document and bumps its access time. The returned value
    /// carries the fresh timestamp, so callers never observe the stale one.
    pub async fn fetch(&self, user_id: Uuid, document_id: Uuid) -> PortResult<Document> {
        let mut document = self.storage.get_document(user_id, document_id).await?;
        let now = Utc::now();
        self.storage.touch_document(document_id, now).await?;
        document.last_accessed_at = now;
        Ok(document)
    }

    /// All of a user's documents, newest upload first.
    pub async fn list(&self, user_id: Uuid) -> PortResult<Vec<Document>> {
        self.storage.list_documents(user_id).await
    }
}
