//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.
//!
//! Authentication is delegated to the surrounding deployment; handlers trust
//! the `x-user-id` header and use it only to partition data per user.

use crate::web::state::AppState;
use axum::{
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_assistant_core::chat::{ChatAnswer, ConceptExplanation};
use study_assistant_core::domain::{
    ChatMessage, ChatRole, Difficulty, Document, DocumentStatus, Flashcard, FlashcardSet, Quiz,
    SubmittedAnswer,
};
use study_assistant_core::ports::PortError;
use study_assistant_core::quiz::{QuestionReview, QuizResult};
use study_assistant_core::stats::StudyOverview;
use tracing::error;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        upload_document_handler,
        list_documents_handler,
        get_document_handler,
        generate_flashcards_handler,
        list_flashcard_sets_handler,
        all_flashcard_sets_handler,
        review_flashcard_handler,
        star_flashcard_handler,
        delete_flashcard_set_handler,
        generate_quiz_handler,
        list_quizzes_handler,
        all_quizzes_handler,
        get_quiz_handler,
        submit_quiz_handler,
        review_quiz_handler,
        delete_quiz_handler,
        generate_summary_handler,
        chat_handler,
        explain_handler,
        chat_history_handler,
        dashboard_handler,
    ),
    components(
        schemas(
            DocumentResponse,
            FlashcardResponse,
            FlashcardSetResponse,
            GenerateFlashcardsRequest,
            GenerateQuizRequest,
            QuizQuestionResponse,
            QuizResponse,
            SubmitQuizRequest,
            SubmittedAnswerPayload,
            QuizResultResponse,
            QuestionReviewResponse,
            SummaryResponse,
            ChatRequest,
            ChatResponse,
            ExplainRequest,
            ExplainResponse,
            ChatMessageResponse,
            OverviewResponse,
        )
    ),
    tags(
        (name = "Study Assistant API", description = "API endpoints for document ingestion and AI-generated study aids.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// A document as seen by API clients. The extracted text is not echoed back.
#[derive(Serialize, ToSchema)]
pub struct DocumentResponse {
    id: Uuid,
    title: String,
    file_name: String,
    status: String,
    page_count: Option<u32>,
    uploaded_at: DateTime<Utc>,
    last_accessed_at: DateTime<Utc>,
}

impl DocumentResponse {
    fn from_domain(document: Document) -> Self {
        let status = match document.status {
            DocumentStatus::Processing => "processing",
            DocumentStatus::Ready => "ready",
            DocumentStatus::Failed => "failed",
        };
        Self {
            id: document.id,
            title: document.title,
            file_name: document.file_name,
            status: status.to_string(),
            page_count: document.page_count,
            uploaded_at: document.uploaded_at,
            last_accessed_at: document.last_accessed_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct FlashcardResponse {
    id: Uuid,
    question: String,
    answer: String,
    difficulty: String,
    review_count: u32,
    is_starred: bool,
    last_reviewed: Option<DateTime<Utc>>,
}

impl FlashcardResponse {
    fn from_domain(card: Flashcard) -> Self {
        Self {
            id: card.id,
            question: card.question,
            answer: card.answer,
            difficulty: difficulty_label(card.difficulty).to_string(),
            review_count: card.review_count,
            is_starred: card.is_starred,
            last_reviewed: card.last_reviewed,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct FlashcardSetResponse {
    id: Uuid,
    document_id: Uuid,
    cards: Vec<FlashcardResponse>,
    created_at: DateTime<Utc>,
}

impl FlashcardSetResponse {
    fn from_domain(set: FlashcardSet) -> Self {
        Self {
            id: set.id,
            document_id: set.document_id,
            cards: set.cards.into_iter().map(FlashcardResponse::from_domain).collect(),
            created_at: set.created_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct GenerateFlashcardsRequest {
    /// Number of cards to request from the generation engine.
    #[serde(default = "default_flashcard_count")]
    count: usize,
}

fn default_flashcard_count() -> usize {
    10
}

#[derive(Deserialize, ToSchema)]
pub struct GenerateQuizRequest {
    #[serde(default = "default_question_count")]
    num_questions: usize,
    /// Defaults to "{document title} - Quiz" when omitted.
    title: Option<String>,
}

fn default_question_count() -> usize {
    5
}

/// A quiz question as presented to the taker. The correct answer and the
/// explanation stay server-side until the quiz is submitted.
#[derive(Serialize, ToSchema)]
pub struct QuizQuestionResponse {
    question: String,
    options: Vec<String>,
    difficulty: String,
}

#[derive(Serialize, ToSchema)]
pub struct QuizResponse {
    id: Uuid,
    document_id: Uuid,
    title: String,
    questions: Vec<QuizQuestionResponse>,
    total_questions: usize,
    score: u8,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl QuizResponse {
    fn from_domain(quiz: Quiz) -> Self {
        Self {
            id: quiz.id,
            document_id: quiz.document_id,
            title: quiz.title,
            questions: quiz
                .questions
                .into_iter()
                .map(|q| QuizQuestionResponse {
                    question: q.question,
                    options: q.options,
                    difficulty: difficulty_label(q.difficulty).to_string(),
                })
                .collect(),
            total_questions: quiz.total_questions,
            score: quiz.score,
            completed_at: quiz.completed_at,
            created_at: quiz.created_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct SubmittedAnswerPayload {
    question_index: usize,
    selected_answer: usize,
}

#[derive(Deserialize, ToSchema)]
pub struct SubmitQuizRequest {
    answers: Vec<SubmittedAnswerPayload>,
}

#[derive(Serialize, ToSchema)]
pub struct QuizResultResponse {
    quiz_id: Uuid,
    score: u8,
    correct_count: usize,
    total_questions: usize,
    completed_at: DateTime<Utc>,
}

impl QuizResultResponse {
    fn from_domain(result: QuizResult) -> Self {
        Self {
            quiz_id: result.quiz_id,
            score: result.score,
            correct_count: result.correct_count,
            total_questions: result.total_questions,
            completed_at: result.completed_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct QuestionReviewResponse {
    question_index: usize,
    question: String,
    options: Vec<String>,
    correct_answer: usize,
    selected_answer: Option<usize>,
    is_correct: bool,
    explanation: String,
}

impl QuestionReviewResponse {
    fn from_domain(review: QuestionReview) -> Self {
        Self {
            question_index: review.question_index,
            question: review.question,
            options: review.options,
            correct_answer: review.correct_answer,
            selected_answer: review.selected_answer,
            is_correct: review.is_correct,
            explanation: review.explanation,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SummaryResponse {
    summary: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ChatRequest {
    question: String,
}

#[derive(Serialize, ToSchema)]
pub struct ChatResponse {
    answer: String,
    relevant_chunks: Vec<usize>,
}

impl ChatResponse {
    fn from_domain(answer: ChatAnswer) -> Self {
        Self {
            answer: answer.answer,
            relevant_chunks: answer.relevant_chunks,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct ExplainRequest {
    concept: String,
}

#[derive(Serialize, ToSchema)]
pub struct ExplainResponse {
    explanation: String,
    relevant_chunks: Vec<usize>,
}

impl ExplainResponse {
    fn from_domain(explanation: ConceptExplanation) -> Self {
        Self {
            explanation: explanation.explanation,
            relevant_chunks: explanation.relevant_chunks,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ChatMessageResponse {
    role: String,
    content: String,
    timestamp: DateTime<Utc>,
    relevant_chunks: Vec<usize>,
}

impl ChatMessageResponse {
    fn from_domain(message: ChatMessage) -> Self {
        let role = match message.role {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        };
        Self {
            role: role.to_string(),
            content: message.content,
            timestamp: message.timestamp,
            relevant_chunks: message.relevant_chunks,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct OverviewResponse {
    total_documents: usize,
    total_flashcard_sets: usize,
    total_flashcards: usize,
    reviewed_flashcards: usize,
    starred_flashcards: usize,
    total_quizzes: usize,
    completed_quizzes: usize,
    average_score: u32,
}

impl OverviewResponse {
    fn from_domain(overview: StudyOverview) -> Self {
        Self {
            total_documents: overview.total_documents,
            total_flashcard_sets: overview.total_flashcard_sets,
            total_flashcards: overview.total_flashcards,
            reviewed_flashcards: overview.reviewed_flashcards,
            starred_flashcards: overview.starred_flashcards,
            total_quizzes: overview.total_quizzes,
            completed_quizzes: overview.completed_quizzes,
            average_score: overview.average_score,
        }
    }
}

fn difficulty_label(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => "easy",
        Difficulty::Medium => "medium",
        Difficulty::Hard => "hard",
    }
}

//=========================================================================================
// Shared Handler Helpers
//=========================================================================================

type HandlerError = (StatusCode, String);

/// Extracts and parses the `x-user-id` header.
fn require_user_id(headers: &HeaderMap) -> Result<Uuid, HandlerError> {
    let raw = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                "x-user-id header is required".to_string(),
            )
        })?;
    Uuid::parse_str(raw).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            "Invalid x-user-id format".to_string(),
        )
    })
}

/// Maps a core error to an HTTP response. Unexpected failures are logged
/// here and returned as opaque 500s.
fn port_error_response(e: PortError) -> HandlerError {
    match e {
        PortError::NotFound(message) => (StatusCode::NOT_FOUND, message),
        PortError::InvalidArgument(message) => (StatusCode::BAD_REQUEST, message),
        PortError::AlreadySubmitted => (
            StatusCode::BAD_REQUEST,
            "Quiz has already been submitted".to_string(),
        ),
        PortError::QuotaExceeded => (
            StatusCode::TOO_MANY_REQUESTS,
            "Generation engine quota exceeded".to_string(),
        ),
        PortError::Extraction(message)
        | PortError::Generation(message)
        | PortError::Unexpected(message) => {
            error!("Request failed: {}", message);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

//=========================================================================================
// Document Handlers
//=========================================================================================

/// Upload a document for ingestion.
///
/// Accepts a multipart/form-data request with a `file` part and an optional
/// `title` text part. The document is returned immediately in the
/// `processing` state; extraction and chunking run in the background.
#[utoipa::path(
    post,
    path = "/documents",
    request_body(content_type = "multipart/form-data", description = "The PDF to upload."),
    responses(
        (status = 201, description = "Document accepted for processing", body = DocumentResponse),
        (status = 400, description = "Bad request (e.g., missing header or file)"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn upload_document_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HandlerError> {
    let user_id = require_user_id(&headers)?;

    let mut title: Option<String> = None;
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to read multipart data: {}", e),
        )
    })? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("title") => {
                let text = field.text().await.map_err(|e| {
                    (
                        StatusCode::BAD_REQUEST,
                        format!("Failed to read title field: {}", e),
                    )
                })?;
                title = Some(text);
            }
            Some("file") => {
                let file_name = field.file_name().unwrap_or("untitled.pdf").to_string();
                let data = field.bytes().await.map_err(|e| {
                    (
                        StatusCode::BAD_REQUEST,
                        format!("Failed to read file bytes: {}", e),
                    )
                })?;
                file = Some((file_name, data.to_vec()));
            }
            _ => {}
        }
    }

    let (file_name, file_bytes) = file.ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            "Multipart form must include a 'file' part".to_string(),
        )
    })?;
    if file_bytes.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Uploaded file is empty".to_string(),
        ));
    }

    // Default the title to the file name without its extension.
    let title = title.unwrap_or_else(|| {
        file_name
            .rsplit_once('.')
            .map(|(stem, _)| stem.to_string())
            .unwrap_or_else(|| file_name.clone())
    });

    let document = app_state
        .storage
        .create_document(user_id, &title, &file_name)
        .await
        .map_err(port_error_response)?;

    // The upload response only reports `processing`; clients poll the
    // document for the later ready/failed flip.
    let _ = app_state.ingestion.spawn(document.id, file_bytes);

    Ok((
        StatusCode::CREATED,
        Json(DocumentResponse::from_domain(document)),
    ))
}

/// List all of the user's documents, newest first.
#[utoipa::path(
    get,
    path = "/documents",
    responses(
        (status = 200, description = "The user's documents", body = [DocumentResponse]),
        (status = 400, description = "Bad request")
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn list_documents_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HandlerError> {
    let user_id = require_user_id(&headers)?;
    let documents = app_state
        .documents
        .list(user_id)
        .await
        .map_err(port_error_response)?;
    let response: Vec<DocumentResponse> = documents
        .into_iter()
        .map(DocumentResponse::from_domain)
        .collect();
    Ok(Json(response))
}

/// Fetch one document and bump its last-accessed timestamp.
#[utoipa::path(
    get,
    path = "/documents/{document_id}",
    responses(
        (status = 200, description = "The document", body = DocumentResponse),
        (status = 404, description = "Document not found")
    ),
    params(
        ("document_id" = Uuid, Path, description = "The document's ID."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn get_document_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(document_id): Path<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let user_id = require_user_id(&headers)?;
    let document = app_state
        .documents
        .fetch(user_id, document_id)
        .await
        .map_err(port_error_response)?;
    Ok(Json(DocumentResponse::from_domain(document)))
}

//=========================================================================================
// Flashcard Handlers
//=========================================================================================

/// Generate a flashcard set from a ready document.
#[utoipa::path(
    post,
    path = "/documents/{document_id}/flashcards",
    request_body = GenerateFlashcardsRequest,
    responses(
        (status = 201, description = "Flashcard set generated", body = FlashcardSetResponse),
        (status = 404, description = "Document not found or not ready"),
        (status = 429, description = "Generation quota exceeded")
    ),
    params(
        ("document_id" = Uuid, Path, description = "The document's ID."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn generate_flashcards_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(document_id): Path<Uuid>,
    Json(payload): Json<GenerateFlashcardsRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let user_id = require_user_id(&headers)?;
    let set = app_state
        .study_aids
        .generate_flashcards(user_id, document_id, payload.count)
        .await
        .map_err(port_error_response)?;
    Ok((
        StatusCode::CREATED,
        Json(FlashcardSetResponse::from_domain(set)),
    ))
}

/// List flashcard sets generated from one document, newest first.
#[utoipa::path(
    get,
    path = "/documents/{document_id}/flashcards",
    responses(
        (status = 200, description = "The document's flashcard sets", body = [FlashcardSetResponse])
    ),
    params(
        ("document_id" = Uuid, Path, description = "The document's ID."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn list_flashcard_sets_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(document_id): Path<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let user_id = require_user_id(&headers)?;
    let sets = app_state
        .flashcards
        .sets_for_document(user_id, document_id)
        .await
        .map_err(port_error_response)?;
    let response: Vec<FlashcardSetResponse> = sets
        .into_iter()
        .map(FlashcardSetResponse::from_domain)
        .collect();
    Ok(Json(response))
}

/// List all of the user's flashcard sets, newest first.
#[utoipa::path(
    get,
    path = "/flashcards",
    responses(
        (status = 200, description = "All of the user's flashcard sets", body = [FlashcardSetResponse])
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn all_flashcard_sets_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HandlerError> {
    let user_id = require_user_id(&headers)?;
    let sets = app_state
        .flashcards
        .all_sets(user_id)
        .await
        .map_err(port_error_response)?;
    let response: Vec<FlashcardSetResponse> = sets
        .into_iter()
        .map(FlashcardSetResponse::from_domain)
        .collect();
    Ok(Json(response))
}

/// Record a review of a flashcard.
#[utoipa::path(
    post,
    path = "/flashcards/{card_id}/review",
    responses(
        (status = 200, description = "The updated card", body = FlashcardResponse),
        (status = 404, description = "Flashcard not found")
    ),
    params(
        ("card_id" = Uuid, Path, description = "The flashcard's ID."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn review_flashcard_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(card_id): Path<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let user_id = require_user_id(&headers)?;
    let card = app_state
        .flashcards
        .record_review(user_id, card_id)
        .await
        .map_err(port_error_response)?;
    Ok(Json(FlashcardResponse::from_domain(card)))
}

/// Toggle the starred flag on a flashcard.
#[utoipa::path(
    post,
    path = "/flashcards/{card_id}/star",
    responses(
        (status = 200, description = "The updated card", body = FlashcardResponse),
        (status = 404, description = "Flashcard not found")
    ),
    params(
        ("card_id" = Uuid, Path, description = "The flashcard's ID."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn star_flashcard_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(card_id): Path<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let user_id = require_user_id(&headers)?;
    let card = app_state
        .flashcards
        .toggle_star(user_id, card_id)
        .await
        .map_err(port_error_response)?;
    Ok(Json(FlashcardResponse::from_domain(card)))
}

/// Delete a flashcard set and every card in it.
#[utoipa::path(
    delete,
    path = "/flashcards/{set_id}",
    responses(
        (status = 204, description = "Set deleted"),
        (status = 404, description = "Flashcard set not found")
    ),
    params(
        ("set_id" = Uuid, Path, description = "The flashcard set's ID."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn delete_flashcard_set_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(set_id): Path<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let user_id = require_user_id(&headers)?;
    app_state
        .flashcards
        .delete_set(user_id, set_id)
        .await
        .map_err(port_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Quiz Handlers
//=========================================================================================

/// Generate a quiz from a ready document.
#[utoipa::path(
    post,
    path = "/documents/{document_id}/quizzes",
    request_body = GenerateQuizRequest,
    responses(
        (status = 201, description = "Quiz generated", body = QuizResponse),
        (status = 404, description = "Document not found or not ready"),
        (status = 429, description = "Generation quota exceeded")
    ),
    params(
        ("document_id" = Uuid, Path, description = "The document's ID."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn generate_quiz_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(document_id): Path<Uuid>,
    Json(payload): Json<GenerateQuizRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let user_id = require_user_id(&headers)?;
    let quiz = app_state
        .study_aids
        .generate_quiz(user_id, document_id, payload.num_questions, payload.title)
        .await
        .map_err(port_error_response)?;
    Ok((StatusCode::CREATED, Json(QuizResponse::from_domain(quiz))))
}

/// List quizzes generated from one document, newest first.
#[utoipa::path(
    get,
    path = "/documents/{document_id}/quizzes",
    responses(
        (status = 200, description = "The document's quizzes", body = [QuizResponse])
    ),
    params(
        ("document_id" = Uuid, Path, description = "The document's ID."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn list_quizzes_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(document_id): Path<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let user_id = require_user_id(&headers)?;
    let quizzes = app_state
        .storage
        .list_quizzes(user_id, document_id)
        .await
        .map_err(port_error_response)?;
    let response: Vec<QuizResponse> = quizzes.into_iter().map(QuizResponse::from_domain).collect();
    Ok(Json(response))
}

/// List all of the user's quizzes, newest first.
#[utoipa::path(
    get,
    path = "/quizzes",
    responses(
        (status = 200, description = "All of the user's quizzes", body = [QuizResponse])
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn all_quizzes_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HandlerError> {
    let user_id = require_user_id(&headers)?;
    let quizzes = app_state
        .storage
        .list_all_quizzes(user_id)
        .await
        .map_err(port_error_response)?;
    let response: Vec<QuizResponse> = quizzes.into_iter().map(QuizResponse::from_domain).collect();
    Ok(Json(response))
}

/// Fetch one quiz.
#[utoipa::path(
    get,
    path = "/quizzes/{quiz_id}",
    responses(
        (status = 200, description = "The quiz", body = QuizResponse),
        (status = 404, description = "Quiz not found")
    ),
    params(
        ("quiz_id" = Uuid, Path, description = "The quiz's ID."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn get_quiz_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(quiz_id): Path<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let user_id = require_user_id(&headers)?;
    let quiz = app_state
        .storage
        .get_quiz(user_id, quiz_id)
        .await
        .map_err(port_error_response)?;
    Ok(Json(QuizResponse::from_domain(quiz)))
}

/// Submit answers for a quiz. A quiz can only be submitted once.
#[utoipa::path(
    post,
    path = "/quizzes/{quiz_id}/submit",
    request_body = SubmitQuizRequest,
    responses(
        (status = 200, description = "The graded result", body = QuizResultResponse),
        (status = 400, description = "Quiz already submitted"),
        (status = 404, description = "Quiz not found")
    ),
    params(
        ("quiz_id" = Uuid, Path, description = "The quiz's ID."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn submit_quiz_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(quiz_id): Path<Uuid>,
    Json(payload): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let user_id = require_user_id(&headers)?;
    let answers: Vec<SubmittedAnswer> = payload
        .answers
        .into_iter()
        .map(|a| SubmittedAnswer {
            question_index: a.question_index,
            selected_answer: a.selected_answer,
        })
        .collect();
    let result = app_state
        .quizzes
        .submit(user_id, quiz_id, &answers)
        .await
        .map_err(port_error_response)?;
    Ok(Json(QuizResultResponse::from_domain(result)))
}

/// Per-question results for a completed quiz.
#[utoipa::path(
    get,
    path = "/quizzes/{quiz_id}/review",
    responses(
        (status = 200, description = "The question-by-question breakdown", body = [QuestionReviewResponse]),
        (status = 400, description = "Quiz has not been submitted yet"),
        (status = 404, description = "Quiz not found")
    ),
    params(
        ("quiz_id" = Uuid, Path, description = "The quiz's ID."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn review_quiz_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(quiz_id): Path<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let user_id = require_user_id(&headers)?;
    let reviews = app_state
        .quizzes
        .review(user_id, quiz_id)
        .await
        .map_err(port_error_response)?;
    let response: Vec<QuestionReviewResponse> = reviews
        .into_iter()
        .map(QuestionReviewResponse::from_domain)
        .collect();
    Ok(Json(response))
}

/// Delete a quiz, submitted or not.
#[utoipa::path(
    delete,
    path = "/quizzes/{quiz_id}",
    responses(
        (status = 204, description = "Quiz deleted"),
        (status = 404, description = "Quiz not found")
    ),
    params(
        ("quiz_id" = Uuid, Path, description = "The quiz's ID."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn delete_quiz_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(quiz_id): Path<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let user_id = require_user_id(&headers)?;
    app_state
        .quizzes
        .delete(user_id, quiz_id)
        .await
        .map_err(port_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Summary, Chat and Explain Handlers
//=========================================================================================

/// Generate a one-off summary of a ready document. Nothing is persisted.
#[utoipa::path(
    post,
    path = "/documents/{document_id}/summary",
    responses(
        (status = 200, description = "The generated summary", body = SummaryResponse),
        (status = 404, description = "Document not found or not ready"),
        (status = 429, description = "Generation quota exceeded")
    ),
    params(
        ("document_id" = Uuid, Path, description = "The document's ID."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn generate_summary_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(document_id): Path<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let user_id = require_user_id(&headers)?;
    let summary = app_state
        .study_aids
        .generate_summary(user_id, document_id)
        .await
        .map_err(port_error_response)?;
    Ok(Json(SummaryResponse { summary }))
}

/// Ask a question about a document. The turn is appended to the chat log.
#[utoipa::path(
    post,
    path = "/documents/{document_id}/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "The assistant's answer", body = ChatResponse),
        (status = 404, description = "Document not found or not ready"),
        (status = 429, description = "Generation quota exceeded")
    ),
    params(
        ("document_id" = Uuid, Path, description = "The document's ID."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn chat_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(document_id): Path<Uuid>,
    Json(payload): Json<ChatRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let user_id = require_user_id(&headers)?;
    if payload.question.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Question must not be empty".to_string(),
        ));
    }
    let answer = app_state
        .chat
        .chat(user_id, document_id, &payload.question)
        .await
        .map_err(port_error_response)?;
    Ok(Json(ChatResponse::from_domain(answer)))
}

/// Explain a concept using the document as context. Nothing is persisted.
#[utoipa::path(
    post,
    path = "/documents/{document_id}/explain",
    request_body = ExplainRequest,
    responses(
        (status = 200, description = "The explanation", body = ExplainResponse),
        (status = 404, description = "Document not found or not ready"),
        (status = 429, description = "Generation quota exceeded")
    ),
    params(
        ("document_id" = Uuid, Path, description = "The document's ID."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn explain_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(document_id): Path<Uuid>,
    Json(payload): Json<ExplainRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let user_id = require_user_id(&headers)?;
    if payload.concept.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Concept must not be empty".to_string(),
        ));
    }
    let explanation = app_state
        .chat
        .explain_concept(user_id, document_id, &payload.concept)
        .await
        .map_err(port_error_response)?;
    Ok(Json(ExplainResponse::from_domain(explanation)))
}

/// The full chat log for a document, in insertion order.
#[utoipa::path(
    get,
    path = "/documents/{document_id}/chat",
    responses(
        (status = 200, description = "The chat history", body = [ChatMessageResponse])
    ),
    params(
        ("document_id" = Uuid, Path, description = "The document's ID."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn chat_history_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(document_id): Path<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let user_id = require_user_id(&headers)?;
    let history = app_state
        .chat
        .history(user_id, document_id)
        .await
        .map_err(port_error_response)?;
    let response: Vec<ChatMessageResponse> = history
        .into_iter()
        .map(ChatMessageResponse::from_domain)
        .collect();
    Ok(Json(response))
}

//=========================================================================================
// Dashboard Handler
//=========================================================================================

/// The user's study activity at a glance.
#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "The dashboard overview", body = OverviewResponse)
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn dashboard_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HandlerError> {
    let user_id = require_user_id(&headers)?;
    let overview = app_state
        .dashboard
        .overview(user_id)
        .await
        .map_err(port_error_response)?;
    Ok(Json(OverviewResponse::from_domain(overview)))
}
