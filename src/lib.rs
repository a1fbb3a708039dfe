#![deny(missing_docs)]

//! Core library for the PDF chat server: upload PDFs, extract their text and ask questions
//! answered from the uploaded documents.

/// HTTP routing and REST handlers.
pub mod api;
/// Chat service orchestrating uploads and chat turns.
pub mod chat;
/// Word-bounded text chunking.
pub mod chunking;
/// Completion provider abstraction and the Anthropic adapter.
pub mod completion;
/// Environment-driven configuration management.
pub mod config;
/// Document context and history assembly for prompts.
pub mod context;
/// PDF text extraction with fallback strategies.
pub mod extraction;
/// Structured logging and tracing setup.
pub mod logging;
/// Upload and chat metrics helpers.
pub mod metrics;
/// Batch re-extraction of stored documents.
pub mod reextract;
/// SQLite record store and on-disk blob storage.
pub mod store;
