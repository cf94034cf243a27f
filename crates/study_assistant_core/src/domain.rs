//! crates/study_assistant_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or HTTP representation;
//! serde derives exist only so adapters can move them through JSON columns
//! and response payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The processing state of an uploaded document.
///
/// `Processing` is the only initial state. `Ready` and `Failed` are both
/// terminal; the ingestion pipeline is the only writer of these transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Processing,
    Ready,
    Failed,
}

/// A document uploaded by a user.
///
/// `extracted_text` is populated only once the document reaches `Ready`;
/// the chunk sequence lives alongside it in storage, keyed by document id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub file_name: String,
    pub status: DocumentStatus,
    pub extracted_text: Option<String>,
    pub page_count: Option<u32>,
    pub uploaded_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
}

impl Document {
    /// The extracted text of a `Ready` document; `None` while the document
    /// is still processing or has failed.
    pub fn ready_text(&self) -> Option<&str> {
        match self.status {
            DocumentStatus::Ready => self.extracted_text.as_deref(),
            _ => None,
        }
    }
}

/// A fixed-size slice of a document's extracted text.
///
/// `index` is assigned in emission order starting at 0 and is the permanent
/// identifier used for answer provenance. `start_offset` is the char offset
/// of the slice within the extracted text. Chunks are immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub index: usize,
    pub content: String,
    pub start_offset: usize,
}

/// The result of running the external text extractor over raw file bytes.
/// Not every extractor backend reports a page count.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub text: String,
    pub page_count: Option<u32>,
}

/// Difficulty rating attached to generated flashcards and quiz questions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Parses a difficulty token from generated text, case-insensitively.
    /// Anything outside the three recognized values is rejected.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }
}

/// A single generated flashcard with its review bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: Uuid,
    pub question: String,
    pub answer: String,
    pub difficulty: Difficulty,
    pub review_count: u32,
    pub is_starred: bool,
    pub last_reviewed: Option<DateTime<Utc>>,
}

impl Flashcard {
    /// Creates a fresh, never-reviewed card.
    pub fn new(question: String, answer: String, difficulty: Difficulty) -> Self {
        Self {
            id: Uuid::new_v4(),
            question,
            answer,
            difficulty,
            review_count: 0,
            is_starred: false,
            last_reviewed: None,
        }
    }

    /// Marks the card as reviewed now.
    pub fn record_review(&mut self, now: DateTime<Utc>) {
        self.review_count += 1;
        self.last_reviewed = Some(now);
    }

    /// Flips the starred flag and returns the new value.
    pub fn toggle_star(&mut self) -> bool {
        self.is_starred = !self.is_starred;
        self.is_starred
    }
}

/// A set of flashcards generated from one document for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashcardSet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub document_id: Uuid,
    pub cards: Vec<Flashcard>,
    pub created_at: DateTime<Utc>,
}

impl FlashcardSet {
    pub fn new(user_id: Uuid, document_id: Uuid, cards: Vec<Flashcard>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            document_id,
            cards,
            created_at: Utc::now(),
        }
    }
}

/// A multiple-choice question with exactly 4 options.
///
/// `correct_answer` is a zero-based index into `options`; the parser only
/// admits questions where it lands in [0, 3].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub explanation: String,
    pub difficulty: Difficulty,
}

/// One (questionIndex, selectedAnswer) pair submitted by the user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub question_index: usize,
    pub selected_answer: usize,
}

/// A graded answer record, produced at submission time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_index: usize,
    pub selected_answer: usize,
    pub is_correct: bool,
    pub answered_at: DateTime<Utc>,
}

/// A generated quiz. The question sequence is immutable after creation;
/// `user_answers`, `score` and `completed_at` are written exactly once, at
/// submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: Uuid,
    pub user_id: Uuid,
    pub document_id: Uuid,
    pub title: String,
    pub questions: Vec<QuizQuestion>,
    pub total_questions: usize,
    pub user_answers: Vec<AnswerRecord>,
    pub score: u8,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Quiz {
    pub fn new(
        user_id: Uuid,
        document_id: Uuid,
        title: String,
        questions: Vec<QuizQuestion>,
    ) -> Self {
        let total_questions = questions.len();
        Self {
            id: Uuid::new_v4(),
            user_id,
            document_id,
            title,
            questions,
            total_questions,
            user_answers: Vec::new(),
            score: 0,
            completed_at: None,
            created_at: Utc::now(),
        }
    }
}

/// The author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One entry in the append-only chat log for a (user, document) pair.
///
/// `relevant_chunks` carries the indices of the chunks that were fed to the
/// generation engine for an assistant message; it is empty on user messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub relevant_chunks: Vec<usize>,
}
