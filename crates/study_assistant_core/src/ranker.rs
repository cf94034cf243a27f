//! crates/study_assistant_core/src/ranker.rs
//!
//! Scores document chunks against a query string and returns the top-k.
//! The scoring measure is pluggable behind `ChunkScorer`; the ordering
//! contract (descending score, ties broken by ascending chunk index) holds
//! regardless of the scorer in use.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::domain::Chunk;

/// A chunk paired with its relevance score for one query.
#[derive(Debug, Clone)]
pub struct RankedChunk<'a> {
    pub chunk: &'a Chunk,
    pub score: f64,
}

/// A relevance measure between a tokenized query and a chunk.
///
/// Implementations must be pure: the same inputs always produce the same
/// score, and scoring one chunk never looks at another.
pub trait ChunkScorer: Send + Sync {
    fn score(&self, query_terms: &HashSet<String>, chunk: &Chunk) -> f64;
}

/// Normalized term-frequency overlap: the fraction of the chunk's terms that
/// appear in the query. Case-insensitive, no stop-word handling.
#[derive(Debug, Default, Clone, Copy)]
pub struct TermOverlapScorer;

impl ChunkScorer for TermOverlapScorer {
    fn score(&self, query_terms: &HashSet<String>, chunk: &Chunk) -> f64 {
        let chunk_terms = tokenize(&chunk.content);
        if chunk_terms.is_empty() || query_terms.is_empty() {
            return 0.0;
        }
        let matches = chunk_terms
            .iter()
            .filter(|term| query_terms.contains(term.as_str()))
            .count();
        matches as f64 / chunk_terms.len() as f64
    }
}

/// Ranks `chunks` against `query` with the default scorer and returns at
/// most `k` results, best first.
pub fn rank_chunks<'a>(chunks: &'a [Chunk], query: &str, k: usize) -> Vec<RankedChunk<'a>> {
    rank_chunks_with(&TermOverlapScorer, chunks, query, k)
}

/// Ranks `chunks` with a caller-supplied scorer.
///
/// Returns fewer than `k` items when fewer chunks exist; an empty chunk list
/// or `k == 0` yields an empty result. Never fails. Ties are broken by
/// ascending chunk index so the result is deterministic.
pub fn rank_chunks_with<'a>(
    scorer: &dyn ChunkScorer,
    chunks: &'a [Chunk],
    query: &str,
    k: usize,
) -> Vec<RankedChunk<'a>> {
    if k == 0 || chunks.is_empty() {
        return Vec::new();
    }

    let query_terms: HashSet<String> = tokenize(query).into_iter().collect();

    let mut ranked: Vec<RankedChunk<'a>> = chunks
        .iter()
        .map(|chunk| RankedChunk {
            score: scorer.score(&query_terms, chunk),
            chunk,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.chunk.index.cmp(&b.chunk.index))
    });
    ranked.truncate(k);
    ranked
}

/// Lowercased alphanumeric tokens, in occurrence order.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|term| !term.is_empty())
        .map(|term| term.to_lowercase())
        .collect()
}
