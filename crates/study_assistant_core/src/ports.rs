//! crates/study_assistant_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of specific external implementations like databases,
//! PDF parsers or generation APIs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    AnswerRecord, ChatMessage, Chunk, Document, ExtractedText, Flashcard, FlashcardSet, Quiz,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// The error type shared by all port operations and core services.
///
/// External-dependency failures (`Extraction`, `Generation`, `QuotaExceeded`)
/// are surfaced to the caller as-is; nothing in the core retries them.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Text extraction failed: {0}")]
    Extraction(String),
    #[error("Generation engine failed: {0}")]
    Generation(String),
    #[error("Generation engine quota exceeded")]
    QuotaExceeded,
    #[error("Quiz has already been submitted")]
    AlreadySubmitted,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Extracts plain text from an uploaded file's raw bytes.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Fails with `PortError::Extraction` when the file cannot be read.
    async fn extract(&self, file_bytes: &[u8]) -> PortResult<ExtractedText>;
}

/// The external text-generation engine, invoked with a fully rendered prompt.
///
/// Fails with `PortError::QuotaExceeded` on rate/quota exhaustion and
/// `PortError::Generation` on any other transport or API failure.
#[async_trait]
pub trait GenerationEngine: Send + Sync {
    async fn generate(&self, prompt: &str) -> PortResult<String>;
}

/// Persistent storage for documents, chunks, study aids and chat logs,
/// partitioned per user. The core assumes read-your-writes consistency on
/// the fields it just wrote.
#[async_trait]
pub trait StorageService: Send + Sync {
    // --- Document Management ---

    /// Creates a document record in the `Processing` state.
    async fn create_document(
        &self,
        user_id: Uuid,
        title: &str,
        file_name: &str,
    ) -> PortResult<Document>;

    async fn get_document(&self, user_id: Uuid, document_id: Uuid) -> PortResult<Document>;

    async fn list_documents(&self, user_id: Uuid) -> PortResult<Vec<Document>>;

    /// Persists the extracted text, the full chunk sequence and the `Ready`
    /// status flip as one atomic update.
    async fn mark_document_ready(
        &self,
        document_id: Uuid,
        extracted_text: &str,
        page_count: Option<u32>,
        chunks: &[Chunk],
    ) -> PortResult<()>;

    /// Moves the document to the terminal `Failed` state.
    async fn mark_document_failed(&self, document_id: Uuid) -> PortResult<()>;

    /// Read-path touch: bumps `last_accessed_at`.
    async fn touch_document(&self, document_id: Uuid, at: DateTime<Utc>) -> PortResult<()>;

    /// Returns the chunk sequence for a document, ordered by chunk index.
    async fn get_chunks(&self, document_id: Uuid) -> PortResult<Vec<Chunk>>;

    // --- Flashcard Management ---

    async fn save_flashcard_set(&self, set: &FlashcardSet) -> PortResult<()>;

    /// Sets for one document, newest first.
    async fn get_flashcard_sets(
        &self,
        user_id: Uuid,
        document_id: Uuid,
    ) -> PortResult<Vec<FlashcardSet>>;

    /// All of a user's sets, newest first.
    async fn get_all_flashcard_sets(&self, user_id: Uuid) -> PortResult<Vec<FlashcardSet>>;

    /// Finds the set that contains the given card.
    async fn get_flashcard_set_by_card(
        &self,
        user_id: Uuid,
        card_id: Uuid,
    ) -> PortResult<FlashcardSet>;

    /// Writes back the review/star bookkeeping of a single card.
    async fn update_flashcard(&self, set_id: Uuid, card: &Flashcard) -> PortResult<()>;

    /// Deletes a set and every card in it.
    async fn delete_flashcard_set(&self, user_id: Uuid, set_id: Uuid) -> PortResult<()>;

    // --- Quiz Management ---

    async fn save_quiz(&self, quiz: &Quiz) -> PortResult<()>;

    async fn get_quiz(&self, user_id: Uuid, quiz_id: Uuid) -> PortResult<Quiz>;

    async fn list_quizzes(&self, user_id: Uuid, document_id: Uuid) -> PortResult<Vec<Quiz>>;

    async fn list_all_quizzes(&self, user_id: Uuid) -> PortResult<Vec<Quiz>>;

    /// Persists `user_answers`, `score` and `completed_at` as one atomic
    /// transition from the unsubmitted state. Fails with `AlreadySubmitted`
    /// when the quiz was completed in the meantime.
    async fn complete_quiz(
        &self,
        quiz_id: Uuid,
        answers: &[AnswerRecord],
        score: u8,
        completed_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Deletes a quiz along with its recorded answers.
    async fn delete_quiz(&self, user_id: Uuid, quiz_id: Uuid) -> PortResult<()>;

    // --- Chat Log Management ---

    /// Appends a user/assistant message pair to the (user, document) chat
    /// log atomically; never only one of the two persists.
    async fn append_chat_messages(
        &self,
        user_id: Uuid,
        document_id: Uuid,
        messages: [ChatMessage; 2],
    ) -> PortResult<()>;

    /// The full append-only log, in insertion order.
    async fn get_chat_history(
        &self,
        user_id: Uuid,
        document_id: Uuid,
    ) -> PortResult<Vec<ChatMessage>>;
}
