pub mod chat;
pub mod chunker;
pub mod documents;
pub mod domain;
pub mod flashcards;
pub mod ingestion;
pub mod parser;
pub mod ports;
pub mod quiz;
pub mod ranker;
pub mod stats;
pub mod study_aids;

#[cfg(test)]
mod test_support;

pub use chat::{ChatAnswer, ChatService, ConceptExplanation};
pub use chunker::{chunk_text, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
pub use domain::{
    AnswerRecord, ChatMessage, ChatRole, Chunk, Difficulty, Document, DocumentStatus,
    ExtractedText, Flashcard, FlashcardSet, Quiz, QuizQuestion, SubmittedAnswer,
};
pub use documents::DocumentService;
pub use flashcards::FlashcardService;
pub use ingestion::IngestionPipeline;
pub use parser::{parse_flashcards, parse_quiz_questions};
pub use ports::{GenerationEngine, PortError, PortResult, StorageService, TextExtractor};
pub use quiz::{score_submission, QuestionReview, QuizResult, QuizService};
pub use ranker::{rank_chunks, rank_chunks_with, ChunkScorer, RankedChunk, TermOverlapScorer};
pub use stats::{DashboardService, StudyOverview};
pub use study_aids::StudyAidService;
