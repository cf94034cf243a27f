//! crates/study_assistant_core/src/chat.rs
//!
//! Retrieval-augmented answering over a document's chunks, with an
//! append-only chat log per (user, document) pair. Every successful chat
//! turn appends exactly one user message and one assistant message, as an
//! atomic pair; turns for the same session key are serialized so pairs from
//! concurrent turns can never interleave.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::domain::{ChatMessage, ChatRole};
use crate::ports::{GenerationEngine, PortError, PortResult, StorageService};
use crate::ranker::rank_chunks;

/// Number of chunks retrieved as context for a chat or explain turn.
pub const CONTEXT_CHUNK_COUNT: usize = 3;

/// Raw chunk context fed to an explain prompt is capped at this many chars.
const EXPLAIN_CONTEXT_LIMIT: usize = 10_000;

const CHAT_PROMPT: &str = r#"Based on the following context from a document, analyse the context and answer the user's question.

Context:
{context}

Question: {question}

Answer:
"#;

const EXPLAIN_PROMPT: &str = r#"Explain the concept of "{concept}" based on the following context.
Provide a clear, educational explanation that's easy to understand.
Include an example if relevant.

Context:
{context}"#;

/// The outcome of one chat turn.
#[derive(Debug, Clone)]
pub struct ChatAnswer {
    pub answer: String,
    pub relevant_chunks: Vec<usize>,
}

/// The outcome of one concept explanation. Unlike chat, nothing is persisted.
#[derive(Debug, Clone)]
pub struct ConceptExplanation {
    pub explanation: String,
    pub relevant_chunks: Vec<usize>,
}

/// One async lock per (user, document) chat session, created lazily on the
/// first turn for that key.
#[derive(Default)]
struct SessionLocks {
    inner: StdMutex<HashMap<(Uuid, Uuid), Arc<Mutex<()>>>>,
}

impl SessionLocks {
    fn for_key(&self, key: (Uuid, Uuid)) -> Arc<Mutex<()>> {
        self.inner
            .lock()
            .expect("session lock registry poisoned")
            .entry(key)
            .or_default()
            .clone()
    }

    /// Returns a turn's handle and evicts the registry entry when no other
    /// turn still holds one, so the map stays bounded by the number of
    /// in-flight turns rather than growing per session key ever seen.
    fn release(&self, key: (Uuid, Uuid), lock: Arc<Mutex<()>>) {
        let mut inner = self.inner.lock().expect("session lock registry poisoned");
        drop(lock);
        if inner
            .get(&key)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            inner.remove(&key);
        }
    }
}

/// Answers questions about a document by retrieving relevant chunks and
/// conditioning the generation engine on them.
#[derive(Clone)]
pub struct ChatService {
    engine: Arc<dyn GenerationEngine>,
    storage: Arc<dyn StorageService>,
    session_locks: Arc<SessionLocks>,
}

impl ChatService {
    pub fn new(engine: Arc<dyn GenerationEngine>, storage: Arc<dyn StorageService>) -> Self {
        Self {
            engine,
            storage,
            session_locks: Arc::new(SessionLocks::default()),
        }
    }

    /// One chat turn: rank the document's chunks against the question, feed
    /// the top hits to the engine and append the user/assistant pair to the
    /// session log. The pair append is atomic; the whole turn holds the
    /// session lock so logs stay FIFO per turn.
    pub async fn chat(
        &self,
        user_id: Uuid,
        document_id: Uuid,
        question: &str,
    ) -> PortResult<ChatAnswer> {
        let document = self.storage.get_document(user_id, document_id).await?;
        if document.ready_text().is_none() {
            return Err(PortError::NotFound(format!(
                "Document {} not found or not ready",
                document_id
            )));
        }

        let chunks = self.storage.get_chunks(document_id).await?;
        let ranked = rank_chunks(&chunks, question, CONTEXT_CHUNK_COUNT);
        let relevant_chunks: Vec<usize> = ranked.iter().map(|r| r.chunk.index).collect();

        let context = ranked
            .iter()
            .enumerate()
            .map(|(position, r)| format!("[Chunk {}]\n{}", position + 1, r.chunk.content))
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = CHAT_PROMPT
            .replace("{context}", &context)
            .replace("{question}", question);

        let key = (user_id, document_id);
        let lock = self.session_locks.for_key(key);
        let turn = async {
            let _turn = lock.lock().await;

            let answer = self.engine.generate(&prompt).await?;
            info!(
                "Chat turn for document {} used chunks {:?}.",
                document_id, relevant_chunks
            );

            let now = Utc::now();
            self.storage
                .append_chat_messages(
                    user_id,
                    document_id,
                    [
                        ChatMessage {
                            role: ChatRole::User,
                            content: question.to_string(),
                            timestamp: now,
                            relevant_chunks: Vec::new(),
                        },
                        ChatMessage {
                            role: ChatRole::Assistant,
                            content: answer.clone(),
                            timestamp: now,
                            relevant_chunks: relevant_chunks.clone(),
                        },
                    ],
                )
                .await?;
            Ok::<String, PortError>(answer)
        }
        .await;
        self.session_locks.release(key, lock);

        Ok(ChatAnswer {
            answer: turn?,
            relevant_chunks,
        })
    }

    /// Explains a concept from the document: same retrieval shape as `chat`
    /// but the context is the raw chunk text (unlabelled) and no chat entry
    /// is recorded.
    pub async fn explain_concept(
        &self,
        user_id: Uuid,
        document_id: Uuid,
        concept: &str,
    ) -> PortResult<ConceptExplanation> {
        let document = self.storage.get_document(user_id, document_id).await?;
        if document.ready_text().is_none() {
            return Err(PortError::NotFound(format!(
                "Document {} not found or not ready",
                document_id
            )));
        }

        let chunks = self.storage.get_chunks(document_id).await?;
        let ranked = rank_chunks(&chunks, concept, CONTEXT_CHUNK_COUNT);
        let relevant_chunks: Vec<usize> = ranked.iter().map(|r| r.chunk.index).collect();

        let context: String = ranked
            .iter()
            .map(|r| r.chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let context = truncate_chars(&context, EXPLAIN_CONTEXT_LIMIT);

        let prompt = EXPLAIN_PROMPT
            .replace("{concept}", concept)
            .replace("{context}", context);
        let explanation = self.engine.generate(&prompt).await?;

        Ok(ConceptExplanation {
            explanation,
            relevant_chunks,
        })
    }

    /// The full append-only log for a (user, document) session, in order.
    pub async fn history(&self, user_id: Uuid, document_id: Uuid) -> PortResult<Vec<ChatMessage>> {
        self.storage.get_chat_history(user_id, document_id).await
    }

    #[cfg(test)]
    fn active_session_locks(&self) -> usize {
        self.session_locks
            .inner
            .lock()
            .expect("session lock registry poisoned")
            .len()
    }
}

fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
