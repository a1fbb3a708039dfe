//! Chat-completion backends.
//!
//! The chat service only sees [`CompletionClient`]; the Anthropic adapter is the production
//! implementation and tests substitute scripted fakes.

mod anthropic;

pub use anthropic::AnthropicClient;

use crate::store::Role;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by completion backends.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// The provider could not be reached.
    #[error("Completion provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// The provider answered with an error status.
    #[error("Completion request failed with status {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body returned by the provider.
        message: String,
    },
    /// The provider response could not be understood.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// One turn of conversation history sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryMessage {
    /// Author of the turn.
    pub role: Role,
    /// Text of the turn.
    pub content: String,
}

/// Everything the provider needs to produce one reply.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Provider model identifier.
    pub model: String,
    /// System prompt carrying instructions and document context.
    pub system: String,
    /// Conversation history, oldest first.
    pub messages: Vec<HistoryMessage>,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

/// Interface implemented by chat-completion providers.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Produce a single reply for the request.
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError>;
}
