//! Result and error types for the chat service.

use crate::{
    chunking::ChunkingError,
    completion::CompletionError,
    config::Config,
    store::{Document, StoreError},
};
use serde::Serialize;
use thiserror::Error;

/// Errors emitted by the chat service.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Message was empty after trimming whitespace.
    #[error("Empty message")]
    EmptyMessage,
    /// No document exists with the requested id.
    #[error("Document {0} not found")]
    DocumentNotFound(i64),
    /// Record or blob storage failed.
    #[error("Storage failure: {0}")]
    Store(#[from] StoreError),
    /// The completion provider failed; the user message stays persisted.
    #[error("Completion failed: {0}")]
    Completion(#[from] CompletionError),
    /// Chunking parameters were rejected.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
}

/// Model and context limits applied to every chat turn.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    /// Provider model identifier.
    pub model: String,
    /// Upper bound on generated reply tokens.
    pub max_reply_tokens: u32,
    /// Number of recent messages replayed to the model.
    pub history_limit: usize,
    /// Characters of each document included in the system prompt.
    pub document_char_limit: usize,
}

impl From<&Config> for ChatSettings {
    fn from(config: &Config) -> Self {
        Self {
            model: config.chat_model.clone(),
            max_reply_tokens: config.max_reply_tokens,
            history_limit: config.history_limit,
            document_char_limit: config.document_char_limit,
        }
    }
}

/// Result of a document upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    /// The stored document record.
    pub document: Document,
    /// Length in characters of the stored text (0 when extraction failed).
    pub extracted_chars: usize,
    /// Extraction failure message, if no text could be recovered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_error: Option<String>,
}

/// Result of one answered chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendOutcome {
    /// The user message as persisted.
    pub user_message: String,
    /// The assistant reply as persisted.
    pub assistant_response: String,
}
