//! crates/study_assistant_core/src/study_aids.rs
//!
//! Generates study artifacts (flashcards, quizzes, summaries) from a ready
//! document by prompting the external generation engine and feeding its raw
//! response through the tolerant parser. Parsed records are persisted
//! through the storage port before being returned.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::domain::{Document, FlashcardSet, Quiz};
use crate::parser::{parse_flashcards, parse_quiz_questions};
use crate::ports::{GenerationEngine, PortError, PortResult, StorageService};

/// Document text fed to a prompt is capped at this many chars.
const PROMPT_TEXT_LIMIT: usize = 15_000;

const FLASHCARD_PROMPT: &str = r#"Generate exactly {count} educational flashcards from the following text.
Format each flashcard as:
Q: [Clear, specific question]
A: [Concise, accurate answer]
D: [Difficulty level: easy, medium or hard]

Separate each flashcard with "---"

Text:
{text}"#;

const QUIZ_PROMPT: &str = r#"Generate exactly {count} multiple choice questions from the following text.
Format each question as:
Q: [Question]
01: [Option 1]
02: [Option 2]
03: [Option 3]
04: [Option 4]
C: [Correct option number only: 01, 02, 03 or 04]
E: [Brief explanation]
D: [Difficulty: easy, medium or hard]

Separate questions with "---"

Text:
{text}"#;

const SUMMARY_PROMPT: &str = r#"Provide a concise summary of the following text, highlighting the key concepts, main ideas and important points.
Keep the summary clear and structured.

Text:
{text}"#;

/// Produces and persists AI-generated study aids for ready documents.
#[derive(Clone)]
pub struct StudyAidService {
    engine: Arc<dyn GenerationEngine>,
    storage: Arc<dyn StorageService>,
}

impl StudyAidService {
    pub fn new(engine: Arc<dyn GenerationEngine>, storage: Arc<dyn StorageService>) -> Self {
        Self { engine, storage }
    }

    /// Generates up to `count` flashcards from a document and persists them
    /// as a new set. The parser may legitimately return fewer cards than
    /// requested; the short set is saved and returned as-is.
    pub async fn generate_flashcards(
        &self,
        user_id: Uuid,
        document_id: Uuid,
        count: usize,
    ) -> PortResult<FlashcardSet> {
        let document = self.storage.get_document(user_id, document_id).await?;
        let text = ready_text(&document)?;

        let prompt = FLASHCARD_PROMPT
            .replace("{count}", &count.to_string())
            .replace("{text}", truncate_chars(text, PROMPT_TEXT_LIMIT));
        let raw = self.engine.generate(&prompt).await?;

        let cards = parse_flashcards(&raw, count);
        info!(
            "Parsed {} of {} requested flashcards for document {}.",
            cards.len(),
            count,
            document_id
        );

        let set = FlashcardSet::new(user_id, document_id, cards);
        self.storage.save_flashcard_set(&set).await?;
        Ok(set)
    }

    /// Generates up to `num_questions` quiz questions and persists them as a
    /// new, unsubmitted quiz. A missing title defaults to
    /// `"{document title} - Quiz"`.
    pub async fn generate_quiz(
        &self,
        user_id: Uuid,
        document_id: Uuid,
        num_questions: usize,
        title: Option<String>,
    ) -> PortResult<Quiz> {
        let document = self.storage.get_document(user_id, document_id).await?;
        let text = ready_text(&document)?;

        let prompt = QUIZ_PROMPT
            .replace("{count}", &num_questions.to_string())
            .replace("{text}", truncate_chars(text, PROMPT_TEXT_LIMIT));
        let raw = self.engine.generate(&prompt).await?;

        let questions = parse_quiz_questions(&raw, num_questions);
        info!(
            "Parsed {} of {} requested quiz questions for document {}.",
            questions.len(),
            num_questions,
            document_id
        );

        let title = title.unwrap_or_else(|| format!("{} - Quiz", document.title));
        let quiz = Quiz::new(user_id, document_id, title, questions);
        self.storage.save_quiz(&quiz).await?;
        Ok(quiz)
    }

    /// Generates a free-form summary of the document. Nothing is persisted.
    pub async fn generate_summary(&self, user_id: Uuid, document_id: Uuid) -> PortResult<String> {
        let document = self.storage.get_document(user_id, document_id).await?;
        let text = ready_text(&document)?;

        let prompt = SUMMARY_PROMPT.replace("{text}", truncate_chars(text, PROMPT_TEXT_LIMIT));
        self.engine.generate(&prompt).await
    }
}

/// Study aids can only be generated against a `Ready` document; anything
/// else reads as not found, matching the per-user, per-status lookup the
/// read path performs.
fn ready_text(document: &Document) -> PortResult<&str> {
    document.ready_text().ok_or_else(|| {
        PortError::NotFound(format!("Document {} not found or not ready", document.id))
    })
}

/// Cuts `text` at a char boundary after at most `limit` chars.
fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Difficulty;
    use crate::test_support::{InMemoryStorage, QuotaExhaustedEngine, ScriptedEngine};

    const FLASHCARD_RESPONSE: &str = "Q: What is a chunk?\nA: A slice of text.\nD: easy\n---\n\
                                      Q: What is ranking?\nA: Ordering by relevance.\nD: hard\n";

    const QUIZ_RESPONSE: &str = "Q: Pick one\n01: a\n02: b\n03: c\n04: d\nC: 02\nE: because\nD: easy\n";

    #[tokio::test]
    async fn generates_and_persists_a_flashcard_set() {
        let storage = Arc::new(InMemoryStorage::default());
        let user_id = Uuid::new_v4();
        let document_id = storage
            .seed_ready_document(user_id, &["ownership and borrowing"])
            .await;
        let engine = Arc::new(ScriptedEngine::with_responses(vec![FLASHCARD_RESPONSE]));
        let service = StudyAidService::new(engine.clone(), storage.clone());

        let set = service
            .generate_flashcards(user_id, document_id, 10)
            .await
            .unwrap();

        assert_eq!(set.cards.len(), 2);
        assert_eq!(set.cards[1].difficulty, Difficulty::Hard);
        let stored = storage.get_flashcard_sets(user_id, document_id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, set.id);

        let prompt = engine.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("exactly 10 educational flashcards"));
        assert!(prompt.contains("ownership and borrowing"));
    }

    #[tokio::test]
    async fn quiz_title_defaults_from_the_document() {
        let storage = Arc::new(InMemoryStorage::default());
        let user_id = Uuid::new_v4();
        let document_id = storage.seed_ready_document(user_id, &["some text"]).await;
        let engine = Arc::new(ScriptedEngine::with_responses(vec![QUIZ_RESPONSE]));
        let service = StudyAidService::new(engine, storage.clone());

        let quiz = service
            .generate_quiz(user_id, document_id, 5, None)
            .await
            .unwrap();

        assert_eq!(quiz.title, "Seeded - Quiz");
        assert_eq!(quiz.total_questions, 1);
        assert!(quiz.completed_at.is_none());
        assert_eq!(storage.stored_quiz(quiz.id).await.questions.len(), 1);
    }

    #[tokio::test]
    async fn rejects_a_document_still_processing() {
        let storage = Arc::new(InMemoryStorage::default());
        let user_id = Uuid::new_v4();
        let document_id = storage.seed_document(user_id, "Pending", "p.pdf").await;
        let engine = Arc::new(ScriptedEngine::with_responses(vec![FLASHCARD_RESPONSE]));
        let service = StudyAidService::new(engine, storage);

        let result = service.generate_flashcards(user_id, document_id, 5).await;
        assert!(matches!(result, Err(PortError::NotFound(_))));
    }

    #[tokio::test]
    async fn quota_errors_surface_unchanged() {
        let storage = Arc::new(InMemoryStorage::default());
        let user_id = Uuid::new_v4();
        let document_id = storage.seed_ready_document(user_id, &["text"]).await;
        let service = StudyAidService::new(Arc::new(QuotaExhaustedEngine), storage);

        let result = service.generate_summary(user_id, document_id).await;
        assert!(matches!(result, Err(PortError::QuotaExceeded)));
    }
}
