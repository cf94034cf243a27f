pub mod db;
pub mod llm;
pub mod pdf;

pub use db::PgStorageAdapter;
pub use llm::OpenAiGenerationAdapter;
pub use pdf::PdfExtractAdapter;
