//! crates/study_assistant_core/src/chunker.rs
//!
//! Splits extracted document text into overlapping fixed-size chunks with
//! stable indices. The unit of measurement is Unicode scalar values (chars),
//! never bytes, so multi-byte text cannot split a code point.

use crate::domain::Chunk;
use crate::ports::{PortError, PortResult};

/// Chunk size used by the ingestion pipeline, in chars.
pub const DEFAULT_CHUNK_SIZE: usize = 500;
/// Overlap between consecutive ingestion chunks, in chars.
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// Splits `text` into consecutive slices of `size` chars, each subsequent
/// slice starting `size - overlap` chars after the previous slice's start.
/// The final slice may be shorter than `size` and is still emitted. Indices
/// are assigned in emission order starting at 0.
///
/// Fails with `InvalidArgument` if `size` is 0 or `overlap >= size` (the
/// window would never advance). Pure and deterministic.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> PortResult<Vec<Chunk>> {
    if size == 0 {
        return Err(PortError::InvalidArgument(
            "chunk size must be greater than 0".to_string(),
        ));
    }
    if overlap >= size {
        return Err(PortError::InvalidArgument(format!(
            "chunk overlap ({}) must be smaller than chunk size ({})",
            overlap, size
        )));
    }

    let chars: Vec<char> = text.chars().collect();
    let step = size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + size).min(chars.len());
        chunks.push(Chunk {
            index: chunks.len(),
            content: chars[start..end].iter().collect(),
            start_offset: start,
        });
        if end == chars.len() {
            break;
        }
        start += step;
    }

    Ok(chunks)
}
