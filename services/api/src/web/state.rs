//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use std::sync::Arc;
use study_assistant_core::chat::ChatService;
use study_assistant_core::documents::DocumentService;
use study_assistant_core::flashcards::FlashcardService;
use study_assistant_core::ingestion::IngestionPipeline;
use study_assistant_core::ports::StorageService;
use study_assistant_core::quiz::QuizService;
use study_assistant_core::stats::DashboardService;
use study_assistant_core::study_aids::StudyAidService;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn StorageService>,
    pub config: Arc<Config>,
    pub ingestion: IngestionPipeline,
    pub documents: DocumentService,
    pub study_aids: StudyAidService,
    pub chat: ChatService,
    pub quizzes: QuizService,
    pub flashcards: FlashcardService,
    pub dashboard: DashboardService,
}
