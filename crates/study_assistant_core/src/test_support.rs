//! crates/study_assistant_core/src/test_support.rs
//!
//! In-memory implementations of the ports, shared by the unit tests of the
//! pipeline and service modules. Compiled only for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    AnswerRecord, ChatMessage, Chunk, Document, DocumentStatus, ExtractedText, Flashcard,
    FlashcardSet, Quiz,
};
use crate::ports::{PortError, PortResult, GenerationEngine, StorageService, TextExtractor};

//=========================================================================================
// Extractor fakes
//=========================================================================================

/// An extractor that always succeeds with a fixed result.
pub struct FixedExtractor {
    result: ExtractedText,
}

impl FixedExtractor {
    pub fn new(result: ExtractedText) -> Self {
        Self { result }
    }
}

#[async_trait]
impl TextExtractor for FixedExtractor {
    async fn extract(&self, _file_bytes: &[u8]) -> PortResult<ExtractedText> {
        Ok(self.result.clone())
    }
}

/// An extractor that always fails.
pub struct FailingExtractor;

#[async_trait]
impl TextExtractor for FailingExtractor {
    async fn extract(&self, _file_bytes: &[u8]) -> PortResult<ExtractedText> {
        Err(PortError::Extraction("unreadable file".to_string()))
    }
}

//=========================================================================================
// Generation engine fakes
//=========================================================================================

/// An engine that replays canned responses in order and records the prompts
/// it was given.
#[derive(Default)]
pub struct ScriptedEngine {
    responses: Mutex<Vec<String>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedEngine {
    pub fn with_responses(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().rev().map(String::from).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl GenerationEngine for ScriptedEngine {
    async fn generate(&self, prompt: &str) -> PortResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| PortError::Generation("no scripted response left".to_string()))
    }
}

/// An engine that always reports quota exhaustion.
pub struct QuotaExhaustedEngine;

#[async_trait]
impl GenerationEngine for QuotaExhaustedEngine {
    async fn generate(&self, _prompt: &str) -> PortResult<String> {
        Err(PortError::QuotaExceeded)
    }
}

//=========================================================================================
// In-memory storage
//=========================================================================================

/// A `StorageService` over plain hash maps, with the same atomicity shape
/// as the real adapter: ready-flip, quiz completion and chat-pair appends
/// each happen under one lock acquisition.
#[derive(Default)]
pub struct InMemoryStorage {
    documents: Mutex<HashMap<Uuid, Document>>,
    chunks: Mutex<HashMap<Uuid, Vec<Chunk>>>,
    flashcard_sets: Mutex<Vec<FlashcardSet>>,
    quizzes: Mutex<HashMap<Uuid, Quiz>>,
    chat_logs: Mutex<HashMap<(Uuid, Uuid), Vec<ChatMessage>>>,
}

impl InMemoryStorage {
    /// Seeds a `Processing` document and returns its id.
    pub async fn seed_document(&self, user_id: Uuid, title: &str, file_name: &str) -> Uuid {
        let doc = self
            .create_document(user_id, title, file_name)
            .await
            .expect("in-memory create cannot fail");
        doc.id
    }

    /// Seeds a `Ready` document with the given chunk contents.
    pub async fn seed_ready_document(&self, user_id: Uuid, chunk_contents: &[&str]) -> Uuid {
        let id = self.seed_document(user_id, "Seeded", "seeded.pdf").await;
        let chunks: Vec<Chunk> = chunk_contents
            .iter()
            .enumerate()
            .map(|(index, content)| Chunk {
                index,
                content: content.to_string(),
                start_offset: index * content.chars().count(),
            })
            .collect();
        let text: String = chunk_contents.concat();
        self.mark_document_ready(id, &text, Some(1), &chunks)
            .await
            .expect("in-memory ready flip cannot fail");
        id
    }

    pub async fn document(&self, document_id: Uuid) -> Document {
        self.documents
            .lock()
            .unwrap()
            .get(&document_id)
            .cloned()
            .expect("document was seeded")
    }

    pub async fn chunks_for(&self, document_id: Uuid) -> Vec<Chunk> {
        self.chunks
            .lock()
            .unwrap()
            .get(&document_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn seed_quiz(&self, quiz: Quiz) -> Uuid {
        let id = quiz.id;
        self.quizzes.lock().unwrap().insert(id, quiz);
        id
    }

    pub async fn stored_quiz(&self, quiz_id: Uuid) -> Quiz {
        self.quizzes
            .lock()
            .unwrap()
            .get(&quiz_id)
            .cloned()
            .expect("quiz was seeded")
    }
}

#[async_trait]
impl StorageService for InMemoryStorage {
    async fn create_document(
        &self,
        user_id: Uuid,
        title: &str,
        file_name: &str,
    ) -> PortResult<Document> {
        let now = Utc::now();
        let doc = Document {
            id: Uuid::new_v4(),
            user_id,
            title: title.to_string(),
            file_name: file_name.to_string(),
            status: DocumentStatus::Processing,
            extracted_text: None,
            page_count: None,
            uploaded_at: now,
            last_accessed_at: now,
        };
        self.documents.lock().unwrap().insert(doc.id, doc.clone());
        Ok(doc)
    }

    async fn get_document(&self, user_id: Uuid, document_id: Uuid) -> PortResult<Document> {
        self.documents
            .lock()
            .unwrap()
            .get(&document_id)
            .filter(|d| d.user_id == user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Document {} not found", document_id)))
    }

    async fn list_documents(&self, user_id: Uuid) -> PortResult<Vec<Document>> {
        Ok(self
            .documents
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn mark_document_ready(
        &self,
        document_id: Uuid,
        extracted_text: &str,
        page_count: Option<u32>,
        chunks: &[Chunk],
    ) -> PortResult<()> {
        let mut documents = self.documents.lock().unwrap();
        let doc = documents
            .get_mut(&document_id)
            .ok_or_else(|| PortError::NotFound(format!("Document {} not found", document_id)))?;
        doc.status = DocumentStatus::Ready;
        doc.extracted_text = Some(extracted_text.to_string());
        doc.page_count = page_count;
        self.chunks
            .lock()
            .unwrap()
            .insert(document_id, chunks.to_vec());
        Ok(())
    }

    async fn mark_document_failed(&self, document_id: Uuid) -> PortResult<()> {
        let mut documents = self.documents.lock().unwrap();
        let doc = documents
            .get_mut(&document_id)
            .ok_or_else(|| PortError::NotFound(format!("Document {} not found", document_id)))?;
        doc.status = DocumentStatus::Failed;
        Ok(())
    }

    async fn touch_document(&self, document_id: Uuid, at: DateTime<Utc>) -> PortResult<()> {
        if let Some(doc) = self.documents.lock().unwrap().get_mut(&document_id) {
            doc.last_accessed_at = at;
        }
        Ok(())
    }

    async fn get_chunks(&self, document_id: Uuid) -> PortResult<Vec<Chunk>> {
        Ok(self.chunks_for(document_id).await)
    }

    async fn save_flashcard_set(&self, set: &FlashcardSet) -> PortResult<()> {
        self.flashcard_sets.lock().unwrap().push(set.clone());
        Ok(())
    }

    async fn get_flashcard_sets(
        &self,
        user_id: Uuid,
        document_id: Uuid,
    ) -> PortResult<Vec<FlashcardSet>> {
        Ok(self
            .flashcard_sets
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.user_id == user_id && s.document_id == document_id)
            .cloned()
            .collect())
    }

    async fn get_all_flashcard_sets(&self, user_id: Uuid) -> PortResult<Vec<FlashcardSet>> {
        Ok(self
            .flashcard_sets
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_flashcard_set_by_card(
        &self,
        user_id: Uuid,
        card_id: Uuid,
    ) -> PortResult<FlashcardSet> {
        self.flashcard_sets
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.user_id == user_id && s.cards.iter().any(|c| c.id == card_id))
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Flashcard {} not found", card_id)))
    }

    async fn update_flashcard(&self, set_id: Uuid, card: &Flashcard) -> PortResult<()> {
        let mut sets = self.flashcard_sets.lock().unwrap();
        let set = sets
            .iter_mut()
            .find(|s| s.id == set_id)
            .ok_or_else(|| PortError::NotFound(format!("Flashcard set {} not found", set_id)))?;
        let slot = set
            .cards
            .iter_mut()
            .find(|c| c.id == card.id)
            .ok_or_else(|| PortError::NotFound(format!("Flashcard {} not found", card.id)))?;
        *slot = card.clone();
        Ok(())
    }

    async fn delete_flashcard_set(&self, user_id: Uuid, set_id: Uuid) -> PortResult<()> {
        let mut sets = self.flashcard_sets.lock().unwrap();
        let before = sets.len();
        sets.retain(|s| !(s.id == set_id && s.user_id == user_id));
        if sets.len() == before {
            return Err(PortError::NotFound(format!(
                "Flashcard set {} not found",
                set_id
            )));
        }
        Ok(())
    }

    async fn save_quiz(&self, quiz: &Quiz) -> PortResult<()> {
        self.quizzes.lock().unwrap().insert(quiz.id, quiz.clone());
        Ok(())
    }

    async fn get_quiz(&self, user_id: Uuid, quiz_id: Uuid) -> PortResult<Quiz> {
        self.quizzes
            .lock()
            .unwrap()
            .get(&quiz_id)
            .filter(|q| q.user_id == user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Quiz {} not found", quiz_id)))
    }

    async fn list_quizzes(&self, user_id: Uuid, document_id: Uuid) -> PortResult<Vec<Quiz>> {
        Ok(self
            .quizzes
            .lock()
            .unwrap()
            .values()
            .filter(|q| q.user_id == user_id && q.document_id == document_id)
            .cloned()
            .collect())
    }

    async fn list_all_quizzes(&self, user_id: Uuid) -> PortResult<Vec<Quiz>> {
        Ok(self
            .quizzes
            .lock()
            .unwrap()
            .values()
            .filter(|q| q.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn complete_quiz(
        &self,
        quiz_id: Uuid,
        answers: &[AnswerRecord],
        score: u8,
        completed_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut quizzes = self.quizzes.lock().unwrap();
        let quiz = quizzes
            .get_mut(&quiz_id)
            .ok_or_else(|| PortError::NotFound(format!("Quiz {} not found", quiz_id)))?;
        if quiz.completed_at.is_some() {
            return Err(PortError::AlreadySubmitted);
        }
        quiz.user_answers = answers.to_vec();
        quiz.score = score;
        quiz.completed_at = Some(completed_at);
        Ok(())
    }

    async fn delete_quiz(&self, user_id: Uuid, quiz_id: Uuid) -> PortResult<()> {
        let mut quizzes = self.quizzes.lock().unwrap();
        match quizzes.get(&quiz_id) {
            Some(quiz) if quiz.user_id == user_id => {
                quizzes.remove(&quiz_id);
                Ok(())
            }
            _ => Err(PortError::NotFound(format!("Quiz {} not found", quiz_id))),
        }
    }

    async fn append_chat_messages(
        &self,
        user_id: Uuid,
        document_id: Uuid,
        messages: [ChatMessage; 2],
    ) -> PortResult<()> {
        self.chat_logs
            .lock()
            .unwrap()
            .entry((user_id, document_id))
            .or_default()
            .extend(messages);
        Ok(())
    }

    async fn get_chat_history(
        &self,
        user_id: Uuid,
        document_id: Uuid,
    ) -> PortResult<Vec<ChatMessage>> {
        Ok(self
            .chat_logs
            .lock()
            .unwrap()
            .get(&(user_id, document_id))
            .cloned()
            .unwrap_or_default())
    }
}
