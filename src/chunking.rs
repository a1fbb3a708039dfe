//! Word-bounded text chunking for size-limited consumers.
//!
//! Chunks are packed greedily from whitespace-separated words. Each word contributes its
//! character count plus one separator to the running length; once the next word would push
//! the running length past the budget, the current chunk is closed and the word opens the
//! next one. Words are never split, so a single word longer than the budget becomes a chunk
//! of its own.

use thiserror::Error;

/// Character budget used when callers do not supply one.
pub const DEFAULT_CHUNK_CHARS: usize = 4000;

/// Errors produced while chunking text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkingError {
    /// Caller asked for an impossible character budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

/// Split `text` into chunks of whole words, each within `max_chars` where possible.
///
/// Returns an empty vector for empty or whitespace-only input.
pub fn chunk_text(text: &str, max_chars: usize) -> Result<Vec<String>, ChunkingError> {
    if max_chars == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_length = 0usize;

    for word in text.split_whitespace() {
        let word_length = word.chars().count();
        current_length += word_length + 1;
        if current_length > max_chars && !current.is_empty() {
            chunks.push(current.join(" "));
            current.clear();
            current.push(word);
            current_length = word_length;
        } else {
            current.push(word);
        }
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    Ok(chunks)
}
