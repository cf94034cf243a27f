//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `StorageService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! The runtime query API is used rather than the compile-time macros so the
//! crate builds without a live database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use study_assistant_core::domain::{
    AnswerRecord, ChatMessage, ChatRole, Chunk, Difficulty, Document, DocumentStatus, Flashcard,
    FlashcardSet, Quiz, QuizQuestion,
};
use study_assistant_core::ports::{PortError, PortResult, StorageService};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `StorageService` port.
#[derive(Clone)]
pub struct PgStorageAdapter {
    pool: PgPool,
}

impl PgStorageAdapter {
    /// Creates a new `PgStorageAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found(what: &str, id: Uuid) -> impl FnOnce(sqlx::Error) -> PortError + '_ {
    move |e| match e {
        sqlx::Error::RowNotFound => PortError::NotFound(format!("{} {} not found", what, id)),
        _ => unexpected(e),
    }
}

//=========================================================================================
// Enum <-> TEXT Column Helpers
//=========================================================================================

fn status_to_str(status: DocumentStatus) -> &'static str {
    match status {
        DocumentStatus::Processing => "processing",
        DocumentStatus::Ready => "ready",
        DocumentStatus::Failed => "failed",
    }
}

fn status_from_str(raw: &str) -> PortResult<DocumentStatus> {
    match raw {
        "processing" => Ok(DocumentStatus::Processing),
        "ready" => Ok(DocumentStatus::Ready),
        "failed" => Ok(DocumentStatus::Failed),
        other => Err(PortError::Unexpected(format!(
            "unknown document status in database: {}",
            other
        ))),
    }
}

fn difficulty_to_str(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => "easy",
        Difficulty::Medium => "medium",
        Difficulty::Hard => "hard",
    }
}

fn difficulty_from_str(raw: &str) -> PortResult<Difficulty> {
    Difficulty::from_token(raw).ok_or_else(|| {
        PortError::Unexpected(format!("unknown difficulty in database: {}", raw))
    })
}

fn role_to_str(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
    }
}

fn role_from_str(raw: &str) -> PortResult<ChatRole> {
    match raw {
        "user" => Ok(ChatRole::User),
        "assistant" => Ok(ChatRole::Assistant),
        other => Err(PortError::Unexpected(format!(
            "unknown chat role in database: {}",
            other
        ))),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct DocumentRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    file_name: String,
    status: String,
    extracted_text: Option<String>,
    page_count: Option<i32>,
    uploaded_at: DateTime<Utc>,
    last_accessed_at: DateTime<Utc>,
}

impl DocumentRecord {
    fn to_domain(self) -> PortResult<Document> {
        Ok(Document {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            file_name: self.file_name,
            status: status_from_str(&self.status)?,
            extracted_text: self.extracted_text,
            page_count: self.page_count.map(|n| n as u32),
            uploaded_at: self.uploaded_at,
            last_accessed_at: self.last_accessed_at,
        })
    }
}

const DOCUMENT_COLUMNS: &str = "id, user_id, title, file_name, status, extracted_text, \
     page_count, uploaded_at, last_accessed_at";

#[derive(FromRow)]
struct ChunkRecord {
    chunk_index: i64,
    content: String,
    start_offset: i64,
}

impl ChunkRecord {
    fn to_domain(self) -> Chunk {
        Chunk {
            index: self.chunk_index as usize,
            content: self.content,
            start_offset: self.start_offset as usize,
        }
    }
}

#[derive(FromRow)]
struct FlashcardSetRecord {
    id: Uuid,
    user_id: Uuid,
    document_id: Uuid,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct FlashcardRecord {
    id: Uuid,
    set_id: Uuid,
    question: String,
    answer: String,
    difficulty: String,
    review_count: i32,
    is_starred: bool,
    last_reviewed: Option<DateTime<Utc>>,
}

impl FlashcardRecord {
    fn to_domain(self) -> PortResult<Flashcard> {
        Ok(Flashcard {
            id: self.id,
            question: self.question,
            answer: self.answer,
            difficulty: difficulty_from_str(&self.difficulty)?,
            review_count: self.review_count as u32,
            is_starred: self.is_starred,
            last_reviewed: self.last_reviewed,
        })
    }
}

// Question and answer sequences live in JSONB columns; they are written once
// (questions at creation, answers at submission) and never updated in place.
#[derive(FromRow)]
struct QuizRecord {
    id: Uuid,
    user_id: Uuid,
    document_id: Uuid,
    title: String,
    questions: serde_json::Value,
    total_questions: i32,
    user_answers: serde_json::Value,
    score: i32,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl QuizRecord {
    fn to_domain(self) -> PortResult<Quiz> {
        let questions: Vec<QuizQuestion> = serde_json::from_value(self.questions)
            .map_err(|e| PortError::Unexpected(format!("corrupt quiz questions column: {}", e)))?;
        let user_answers: Vec<AnswerRecord> = serde_json::from_value(self.user_answers)
            .map_err(|e| PortError::Unexpected(format!("corrupt quiz answers column: {}", e)))?;
        Ok(Quiz {
            id: self.id,
            user_id: self.user_id,
            document_id: self.document_id,
            title: self.title,
            questions,
            total_questions: self.total_questions as usize,
            user_answers,
            score: self.score as u8,
            completed_at: self.completed_at,
            created_at: self.created_at,
        })
    }
}

const QUIZ_COLUMNS: &str = "id, user_id, document_id, title, questions, total_questions, \
     user_answers, score, completed_at, created_at";

#[derive(FromRow)]
struct ChatMessageRecord {
    role: String,
    content: String,
    created_at: DateTime<Utc>,
    relevant_chunks: serde_json::Value,
}

impl ChatMessageRecord {
    fn to_domain(self) -> PortResult<ChatMessage> {
        let relevant_chunks: Vec<usize> = serde_json::from_value(self.relevant_chunks)
            .map_err(|e| PortError::Unexpected(format!("corrupt chunk reference column: {}", e)))?;
        Ok(ChatMessage {
            role: role_from_str(&self.role)?,
            content: self.content,
            timestamp: self.created_at,
            relevant_chunks,
        })
    }
}

//=========================================================================================
// Flashcard set assembly
//=========================================================================================

impl PgStorageAdapter {
    /// Loads the cards for each set header and assembles full domain sets,
    /// preserving the header order.
    async fn assemble_sets(&self, headers: Vec<FlashcardSetRecord>) -> PortResult<Vec<FlashcardSet>> {
        let mut sets = Vec::with_capacity(headers.len());
        for header in headers {
            let card_records: Vec<FlashcardRecord> = sqlx::query_as(
                "SELECT id, set_id, question, answer, difficulty, review_count, is_starred, \
                 last_reviewed FROM flashcards WHERE set_id = $1 ORDER BY position ASC",
            )
            .bind(header.id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

            let cards = card_records
                .into_iter()
                .map(FlashcardRecord::to_domain)
                .collect::<PortResult<Vec<_>>>()?;

            sets.push(FlashcardSet {
                id: header.id,
                user_id: header.user_id,
                document_id: header.document_id,
                cards,
                created_at: header.created_at,
            });
        }
        Ok(sets)
    }
}

//=========================================================================================
// `StorageService` Trait Implementation
//=========================================================================================

#[async_trait]
impl StorageService for PgStorageAdapter {
    async fn create_document(
        &self,
        user_id: Uuid,
        title: &str,
        file_name: &str,
    ) -> PortResult<Document> {
        let record: DocumentRecord = sqlx::query_as(&format!(
            "INSERT INTO documents (id, user_id, title, file_name, status) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            DOCUMENT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(title)
        .bind(file_name)
        .bind(status_to_str(DocumentStatus::Processing))
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn get_document(&self, user_id: Uuid, document_id: Uuid) -> PortResult<Document> {
        let record: DocumentRecord = sqlx::query_as(&format!(
            "SELECT {} FROM documents WHERE id = $1 AND user_id = $2",
            DOCUMENT_COLUMNS
        ))
        .bind(document_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found("Document", document_id))?;
        record.to_domain()
    }

    async fn list_documents(&self, user_id: Uuid) -> PortResult<Vec<Document>> {
        let records: Vec<DocumentRecord> = sqlx::query_as(&format!(
            "SELECT {} FROM documents WHERE user_id = $1 ORDER BY uploaded_at DESC",
            DOCUMENT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(DocumentRecord::to_domain).collect()
    }

    async fn mark_document_ready(
        &self,
        document_id: Uuid,
        extracted_text: &str,
        page_count: Option<u32>,
        chunks: &[Chunk],
    ) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let result = sqlx::query(
            "UPDATE documents SET status = $2, extracted_text = $3, page_count = $4 WHERE id = $1",
        )
        .bind(document_id)
        .bind(status_to_str(DocumentStatus::Ready))
        .bind(extracted_text)
        .bind(page_count.map(|n| n as i32))
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Document {} not found",
                document_id
            )));
        }

        // Re-ingestion replaces the chunk sequence wholesale.
        sqlx::query("DELETE FROM chunks WHERE document_id = $1")
            .bind(document_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        for chunk in chunks {
            sqlx::query(
                "INSERT INTO chunks (document_id, chunk_index, content, start_offset) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(document_id)
            .bind(chunk.index as i64)
            .bind(&chunk.content)
            .bind(chunk.start_offset as i64)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }

        tx.commit().await.map_err(unexpected)
    }

    async fn mark_document_failed(&self, document_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("UPDATE documents SET status = $2 WHERE id = $1")
            .bind(document_id)
            .bind(status_to_str(DocumentStatus::Failed))
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Document {} not found",
                document_id
            )));
        }
        Ok(())
    }

    async fn touch_document(&self, document_id: Uuid, at: DateTime<Utc>) -> PortResult<()> {
        sqlx::query("UPDATE documents SET last_accessed_at = $2 WHERE id = $1")
            .bind(document_id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn get_chunks(&self, document_id: Uuid) -> PortResult<Vec<Chunk>> {
        let records: Vec<ChunkRecord> = sqlx::query_as(
            "SELECT chunk_index, content, start_offset FROM chunks \
             WHERE document_id = $1 ORDER BY chunk_index ASC",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(ChunkRecord::to_domain).collect())
    }

    async fn save_flashcard_set(&self, set: &FlashcardSet) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        sqlx::query(
            "INSERT INTO flashcard_sets (id, user_id, document_id, created_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(set.id)
        .bind(set.user_id)
        .bind(set.document_id)
        .bind(set.created_at)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        for (position, card) in set.cards.iter().enumerate() {
            sqlx::query(
                "INSERT INTO flashcards \
                 (id, set_id, position, question, answer, difficulty, review_count, \
                  is_starred, last_reviewed) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(card.id)
            .bind(set.id)
            .bind(position as i32)
            .bind(&card.question)
            .bind(&card.answer)
            .bind(difficulty_to_str(card.difficulty))
            .bind(card.review_count as i32)
            .bind(card.is_starred)
            .bind(card.last_reviewed)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }

        tx.commit().await.map_err(unexpected)
    }

    async fn get_flashcard_sets(
        &self,
        user_id: Uuid,
        document_id: Uuid,
    ) -> PortResult<Vec<FlashcardSet>> {
        let headers: Vec<FlashcardSetRecord> = sqlx::query_as(
            "SELECT id, user_id, document_id, created_at FROM flashcard_sets \
             WHERE user_id = $1 AND document_id = $2 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        self.assemble_sets(headers).await
    }

    async fn get_all_flashcard_sets(&self, user_id: Uuid) -> PortResult<Vec<FlashcardSet>> {
        let headers: Vec<FlashcardSetRecord> = sqlx::query_as(
            "SELECT id, user_id, document_id, created_at FROM flashcard_sets \
             WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        self.assemble_sets(headers).await
    }

    async fn get_flashcard_set_by_card(
        &self,
        user_id: Uuid,
        card_id: Uuid,
    ) -> PortResult<FlashcardSet> {
        let header: FlashcardSetRecord = sqlx::query_as(
            "SELECT s.id, s.user_id, s.document_id, s.created_at \
             FROM flashcard_sets s JOIN flashcards c ON c.set_id = s.id \
             WHERE s.user_id = $1 AND c.id = $2",
        )
        .bind(user_id)
        .bind(card_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found("Flashcard", card_id))?;

        let mut sets = self.assemble_sets(vec![header]).await?;
        sets.pop()
            .ok_or_else(|| PortError::NotFound(format!("Flashcard {} not found", card_id)))
    }

    async fn update_flashcard(&self, set_id: Uuid, card: &Flashcard) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE flashcards SET review_count = $3, is_starred = $4, last_reviewed = $5 \
             WHERE id = $1 AND set_id = $2",
        )
        .bind(card.id)
        .bind(set_id)
        .bind(card.review_count as i32)
        .bind(card.is_starred)
        .bind(card.last_reviewed)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Flashcard {} not found",
                card.id
            )));
        }
        Ok(())
    }

    async fn delete_flashcard_set(&self, user_id: Uuid, set_id: Uuid) -> PortResult<()> {
        // Cards go with the set via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM flashcard_sets WHERE id = $1 AND user_id = $2")
            .bind(set_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Flashcard set {} not found",
                set_id
            )));
        }
        Ok(())
    }

    async fn save_quiz(&self, quiz: &Quiz) -> PortResult<()> {
        let questions = serde_json::to_value(&quiz.questions)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let user_answers = serde_json::to_value(&quiz.user_answers)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        sqlx::query(
            "INSERT INTO quizzes \
             (id, user_id, document_id, title, questions, total_questions, user_answers, \
              score, completed_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(quiz.id)
        .bind(quiz.user_id)
        .bind(quiz.document_id)
        .bind(&quiz.title)
        .bind(questions)
        .bind(quiz.total_questions as i32)
        .bind(user_answers)
        .bind(quiz.score as i32)
        .bind(quiz.completed_at)
        .bind(quiz.created_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn get_quiz(&self, user_id: Uuid, quiz_id: Uuid) -> PortResult<Quiz> {
        let record: QuizRecord = sqlx::query_as(&format!(
            "SELECT {} FROM quizzes WHERE id = $1 AND user_id = $2",
            QUIZ_COLUMNS
        ))
        .bind(quiz_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found("Quiz", quiz_id))?;
        record.to_domain()
    }

    async fn list_quizzes(&self, user_id: Uuid, document_id: Uuid) -> PortResult<Vec<Quiz>> {
        let records: Vec<QuizRecord> = sqlx::query_as(&format!(
            "SELECT {} FROM quizzes WHERE user_id = $1 AND document_id = $2 \
             ORDER BY created_at DESC",
            QUIZ_COLUMNS
        ))
        .bind(user_id)
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(QuizRecord::to_domain).collect()
    }

    async fn list_all_quizzes(&self, user_id: Uuid) -> PortResult<Vec<Quiz>> {
        let records: Vec<QuizRecord> = sqlx::query_as(&format!(
            "SELECT {} FROM quizzes WHERE user_id = $1 ORDER BY created_at DESC",
            QUIZ_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(QuizRecord::to_domain).collect()
    }

    async fn complete_quiz(
        &self,
        quiz_id: Uuid,
        answers: &[AnswerRecord],
        score: u8,
        completed_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let user_answers =
            serde_json::to_value(answers).map_err(|e| PortError::Unexpected(e.to_string()))?;

        // The completed_at guard makes the first submission win; a lost race
        // surfaces as AlreadySubmitted rather than silently overwriting.
        let result = sqlx::query(
            "UPDATE quizzes SET user_answers = $2, score = $3, completed_at = $4 \
             WHERE id = $1 AND completed_at IS NULL",
        )
        .bind(quiz_id)
        .bind(user_answers)
        .bind(score as i32)
        .bind(completed_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 FROM quizzes WHERE id = $1")
                .bind(quiz_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(unexpected)?;
            return if exists.is_some() {
                Err(PortError::AlreadySubmitted)
            } else {
                Err(PortError::NotFound(format!("Quiz {} not found", quiz_id)))
            };
        }
        Ok(())
    }

    async fn delete_quiz(&self, user_id: Uuid, quiz_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM quizzes WHERE id = $1 AND user_id = $2")
            .bind(quiz_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Quiz {} not found", quiz_id)));
        }
        Ok(())
    }

    async fn append_chat_messages(
        &self,
        user_id: Uuid,
        document_id: Uuid,
        messages: [ChatMessage; 2],
    ) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        for message in &messages {
            let relevant_chunks = serde_json::to_value(&message.relevant_chunks)
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
            sqlx::query(
                "INSERT INTO chat_messages \
                 (user_id, document_id, role, content, created_at, relevant_chunks) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(user_id)
            .bind(document_id)
            .bind(role_to_str(message.role))
            .bind(&message.content)
            .bind(message.timestamp)
            .bind(relevant_chunks)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }

        tx.commit().await.map_err(unexpected)
    }

    async fn get_chat_history(
        &self,
        user_id: Uuid,
        document_id: Uuid,
    ) -> PortResult<Vec<ChatMessage>> {
        let records: Vec<ChatMessageRecord> = sqlx::query_as(
            "SELECT role, content, created_at, relevant_chunks FROM chat_messages \
             WHERE user_id = $1 AND document_id = $2 ORDER BY id ASC",
        )
        .bind(user_id)
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records
            .into_iter()
            .map(ChatMessageRecord::to_domain)
            .collect()
    }
}
