//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{OpenAiGenerationAdapter, PdfExtractAdapter, PgStorageAdapter},
    config::Config,
    error::ApiError,
    web::{
        rest::{
            all_flashcard_sets_handler, all_quizzes_handler, chat_handler, chat_history_handler,
            dashboard_handler, delete_flashcard_set_handler, delete_quiz_handler, explain_handler,
            generate_flashcards_handler, generate_quiz_handler, generate_summary_handler,
            get_document_handler, get_quiz_handler, list_documents_handler,
            list_flashcard_sets_handler, list_quizzes_handler, review_flashcard_handler,
            review_quiz_handler, star_flashcard_handler, submit_quiz_handler,
            upload_document_handler, ApiDoc,
        },
        state::AppState,
    },
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    routing::{delete, get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use study_assistant_core::{
    chat::ChatService, documents::DocumentService, flashcards::FlashcardService,
    ingestion::IngestionPipeline, quiz::QuizService, stats::DashboardService,
    study_aids::StudyAidService,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            config.log_level.to_string(),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let storage = Arc::new(PgStorageAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    storage.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let openai_config = OpenAIConfig::new().with_api_key(
        config
            .openai_api_key
            .as_ref()
            .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?,
    );
    let openai_client = Client::with_config(openai_config);

    let engine = Arc::new(OpenAiGenerationAdapter::new(
        openai_client,
        config.generation_model.clone(),
    ));
    let extractor = Arc::new(PdfExtractAdapter::new());

    // --- 4. Build the Core Services and Shared AppState ---
    let storage_port: Arc<dyn study_assistant_core::ports::StorageService> = storage;
    let app_state = Arc::new(AppState {
        storage: storage_port.clone(),
        config: config.clone(),
        ingestion: IngestionPipeline::new(extractor, storage_port.clone()),
        documents: DocumentService::new(storage_port.clone()),
        study_aids: StudyAidService::new(engine.clone(), storage_port.clone()),
        chat: ChatService::new(engine, storage_port.clone()),
        quizzes: QuizService::new(storage_port.clone()),
        flashcards: FlashcardService::new(storage_port.clone()),
        dashboard: DashboardService::new(storage_port),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    let api_router = Router::new()
        .route(
            "/documents",
            post(upload_document_handler).get(list_documents_handler),
        )
        .route("/documents/{document_id}", get(get_document_handler))
        .route(
            "/documents/{document_id}/flashcards",
            post(generate_flashcards_handler).get(list_flashcard_sets_handler),
        )
        .route(
            "/documents/{document_id}/quizzes",
            post(generate_quiz_handler).get(list_quizzes_handler),
        )
        .route(
            "/documents/{document_id}/summary",
            post(generate_summary_handler),
        )
        .route(
            "/documents/{document_id}/chat",
            post(chat_handler).get(chat_history_handler),
        )
        .route("/documents/{document_id}/explain", post(explain_handler))
        .route("/flashcards", get(all_flashcard_sets_handler))
        .route("/flashcards/{set_id}", delete(delete_flashcard_set_handler))
        .route("/flashcards/{card_id}/review", post(review_flashcard_handler))
        .route("/flashcards/{card_id}/star", post(star_flashcard_handler))
        .route("/quizzes", get(all_quizzes_handler))
        .route(
            "/quizzes/{quiz_id}",
            get(get_quiz_handler).delete(delete_quiz_handler),
        )
        .route("/quizzes/{quiz_id}/submit", post(submit_quiz_handler))
        .route("/quizzes/{quiz_id}/review", get(review_quiz_handler))
        .route("/dashboard", get(dashboard_handler))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
