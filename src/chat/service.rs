//! Chat service coordinating storage, extraction and the completion provider.

use crate::{
    chat::{
        prompt::build_system_prompt,
        types::{ChatError, ChatSettings, SendOutcome, UploadOutcome},
    },
    chunking::chunk_text,
    completion::{AnthropicClient, CompletionClient, CompletionRequest},
    config::Config,
    context::{build_document_context, build_history},
    extraction::PdfExtractor,
    metrics::{ChatMetrics, MetricsSnapshot},
    store::{BlobStore, ChatMessage, Document, Role, Store},
};
use async_trait::async_trait;
use std::sync::Arc;

/// Owns the long-lived handles shared by every request: the record store, the blob store, the
/// PDF extractor and the completion client.
///
/// Construct once near process start and share it through an `Arc`.
pub struct ChatService {
    store: Arc<Store>,
    blobs: BlobStore,
    extractor: Arc<PdfExtractor>,
    completion: Box<dyn CompletionClient>,
    settings: ChatSettings,
    metrics: ChatMetrics,
}

/// Abstraction over the chat service used by the HTTP surface.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Store an uploaded PDF and extract its text.
    async fn upload_document(
        &self,
        title: Option<String>,
        file_name: String,
        bytes: Vec<u8>,
    ) -> Result<UploadOutcome, ChatError>;

    /// Run one chat turn and return the persisted exchange.
    async fn send_message(&self, message: String) -> Result<SendOutcome, ChatError>;

    /// Delete the whole chat log, returning the number of removed messages.
    async fn clear_history(&self) -> Result<usize, ChatError>;

    /// All uploaded documents in storage order.
    async fn list_documents(&self) -> Result<Vec<Document>, ChatError>;

    /// The full chat log in chronological order.
    async fn list_messages(&self) -> Result<Vec<ChatMessage>, ChatError>;

    /// Split a document's extracted text into word-bounded chunks.
    async fn document_chunks(&self, id: i64, max_chars: usize) -> Result<Vec<String>, ChatError>;

    /// Retrieve the current metrics snapshot.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl ChatService {
    /// Open storage and build the Anthropic client described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, ChatError> {
        let store = Arc::new(Store::open(&config.database_path)?);
        let completion = AnthropicClient::from_config(config)?;
        tracing::info!(model = %config.chat_model, "Chat service initialized");
        Ok(Self::new(
            store,
            BlobStore::new(&config.media_root),
            Arc::new(PdfExtractor::default()),
            Box::new(completion),
            ChatSettings::from(config),
        ))
    }

    /// Assemble a service from explicit parts.
    pub fn new(
        store: Arc<Store>,
        blobs: BlobStore,
        extractor: Arc<PdfExtractor>,
        completion: Box<dyn CompletionClient>,
        settings: ChatSettings,
    ) -> Self {
        Self {
            store,
            blobs,
            extractor,
            completion,
            settings,
            metrics: ChatMetrics::new(),
        }
    }

    /// Shared handle to the record store.
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Store an uploaded PDF and extract its text.
    ///
    /// The document row is created before extraction runs. When extraction fails the row keeps
    /// empty text and the failure is returned in [`UploadOutcome::extraction_error`].
    pub async fn upload_document(
        &self,
        title: Option<String>,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<UploadOutcome, ChatError> {
        let title = title
            .map(|title| title.trim().to_string())
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| file_name.to_string());

        let path = self.blobs.save(file_name, bytes).await?;
        let mut document = match self.store.create_document(&title, &path) {
            Ok(document) => document,
            Err(error) => {
                if let Err(cleanup) = self.blobs.remove(&path).await {
                    tracing::warn!(
                        path = %path.display(),
                        error = %cleanup,
                        "Failed to remove orphaned upload"
                    );
                }
                return Err(error.into());
            }
        };
        tracing::info!(document_id = document.id, title = %document.title, "Document uploaded");

        let extraction_error = match self.extractor.extract_blocking(path).await {
            Ok(text) => {
                self.store.update_extracted_text(document.id, &text)?;
                document.extracted_text = text;
                None
            }
            Err(error) => {
                tracing::warn!(
                    document_id = document.id,
                    password_protected = error.is_password_protected(),
                    error = %error,
                    "Text extraction failed; document stored without text"
                );
                Some(error.to_string())
            }
        };
        self.metrics.record_upload(extraction_error.is_none());

        Ok(UploadOutcome {
            extracted_chars: document.extracted_text.chars().count(),
            document,
            extraction_error,
        })
    }

    /// Run one chat turn.
    ///
    /// The user message is persisted before the provider is called and stays persisted if the
    /// call fails. The assistant reply is persisted only on success.
    pub async fn send_message(&self, message: &str) -> Result<SendOutcome, ChatError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let user_message = self.store.add_message(Role::User, message)?;

        let document_context =
            build_document_context(&self.store, self.settings.document_char_limit)?;
        let history = build_history(&self.store, self.settings.history_limit)?;
        let request = CompletionRequest {
            model: self.settings.model.clone(),
            system: build_system_prompt(&document_context),
            messages: history,
            max_tokens: self.settings.max_reply_tokens,
        };

        let reply = match self.completion.complete(request).await {
            Ok(reply) => reply,
            Err(error) => {
                self.metrics.record_completion_failure();
                tracing::warn!(
                    message_id = user_message.id,
                    error = %error,
                    "Completion failed; user message left unanswered"
                );
                return Err(error.into());
            }
        };

        let assistant_message = self.store.add_message(Role::Assistant, &reply)?;
        self.metrics.record_turn();
        tracing::info!(
            user_message_id = user_message.id,
            assistant_message_id = assistant_message.id,
            reply_chars = reply.len(),
            "Chat turn completed"
        );

        Ok(SendOutcome {
            user_message: user_message.content,
            assistant_response: assistant_message.content,
        })
    }

    /// Delete the whole chat log.
    pub fn clear_history(&self) -> Result<usize, ChatError> {
        let removed = self.store.clear_messages()?;
        tracing::info!(removed, "Chat history cleared");
        Ok(removed)
    }

    /// Split a document's extracted text into word-bounded chunks.
    pub fn document_chunks(&self, id: i64, max_chars: usize) -> Result<Vec<String>, ChatError> {
        let document = self
            .store
            .get_document(id)?
            .ok_or(ChatError::DocumentNotFound(id))?;
        Ok(chunk_text(&document.extracted_text, max_chars)?)
    }
}

#[async_trait]
impl ChatApi for ChatService {
    async fn upload_document(
        &self,
        title: Option<String>,
        file_name: String,
        bytes: Vec<u8>,
    ) -> Result<UploadOutcome, ChatError> {
        ChatService::upload_document(self, title, &file_name, &bytes).await
    }

    async fn send_message(&self, message: String) -> Result<SendOutcome, ChatError> {
        ChatService::send_message(self, &message).await
    }

    async fn clear_history(&self) -> Result<usize, ChatError> {
        ChatService::clear_history(self)
    }

    async fn list_documents(&self) -> Result<Vec<Document>, ChatError> {
        Ok(self.store.list_documents()?)
    }

    async fn list_messages(&self) -> Result<Vec<ChatMessage>, ChatError> {
        Ok(self.store.list_messages()?)
    }

    async fn document_chunks(&self, id: i64, max_chars: usize) -> Result<Vec<String>, ChatError> {
        ChatService::document_chunks(self, id, max_chars)
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{CompletionError, HistoryMessage};
    use crate::extraction::{EXTRACTION_ERROR_PREFIX, fixtures::pdf_with_pages};
    use tempfile::TempDir;
    use tokio::sync::Mutex;

    const QUESTION: &str = "What port does SIP use by default?";

    /// Records each request along with the chat log as it stood when the call was made.
    struct ScriptedCompletion {
        store: Arc<Store>,
        reply: Result<String, u16>,
        seen: Arc<Mutex<Vec<(CompletionRequest, Vec<ChatMessage>)>>>,
    }

    #[async_trait]
    impl CompletionClient for ScriptedCompletion {
        async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
            let log = self.store.list_messages().expect("log");
            self.seen.lock().await.push((request, log));
            match &self.reply {
                Ok(reply) => Ok(reply.clone()),
                Err(status) => Err(CompletionError::Api {
                    status: *status,
                    message: "upstream exploded".into(),
                }),
            }
        }
    }

    type Seen = Arc<Mutex<Vec<(CompletionRequest, Vec<ChatMessage>)>>>;

    fn service(reply: Result<String, u16>) -> (ChatService, Seen, TempDir) {
        let media = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(Store::open_in_memory().expect("store"));
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let completion = ScriptedCompletion {
            store: Arc::clone(&store),
            reply,
            seen: Arc::clone(&seen),
        };
        let service = ChatService::new(
            store,
            BlobStore::new(media.path()),
            Arc::new(PdfExtractor::default()),
            Box::new(completion),
            ChatSettings {
                model: "claude-test".into(),
                max_reply_tokens: 1000,
                history_limit: 20,
                document_char_limit: 8000,
            },
        );
        (service, seen, media)
    }

    #[tokio::test]
    async fn successful_turn_persists_user_then_assistant() {
        let (service, seen, _media) = service(Ok("SIP defaults to port 5060.".into()));

        let outcome = service.send_message(QUESTION).await.expect("turn");

        assert_eq!(outcome.user_message, QUESTION);
        assert_eq!(outcome.assistant_response, "SIP defaults to port 5060.");

        let log = service.store().list_messages().expect("log");
        assert_eq!(log.len(), 2);
        assert_eq!((log[0].role, log[0].content.as_str()), (Role::User, QUESTION));
        assert_eq!(
            (log[1].role, log[1].content.as_str()),
            (Role::Assistant, "SIP defaults to port 5060.")
        );

        let seen = seen.lock().await;
        let (request, log_at_call) = &seen[0];
        assert_eq!(log_at_call.len(), 1, "user message persisted before the call");
        assert_eq!(request.model, "claude-test");
        assert_eq!(request.max_tokens, 1000);
        assert!(request.system.contains("No documents uploaded yet."));
        assert_eq!(
            request.messages,
            vec![HistoryMessage {
                role: Role::User,
                content: QUESTION.into(),
            }]
        );
        assert_eq!(service.metrics_snapshot().chat_turns, 1);
    }

    #[tokio::test]
    async fn failed_turn_keeps_only_the_user_message() {
        let (service, _seen, _media) = service(Err(503));

        let error = service.send_message(QUESTION).await.expect_err("failure");
        assert!(matches!(
            error,
            ChatError::Completion(CompletionError::Api { status: 503, .. })
        ));

        let log = service.store().list_messages().expect("log");
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].role, Role::User);
        assert_eq!(log[0].content, QUESTION);
        let snapshot = service.metrics_snapshot();
        assert_eq!(snapshot.completion_failures, 1);
        assert_eq!(snapshot.chat_turns, 0);
    }

    #[tokio::test]
    async fn blank_messages_are_rejected_without_persisting() {
        let (service, seen, _media) = service(Ok("unused".into()));

        let error = service.send_message("   \n").await.expect_err("empty");
        assert!(matches!(error, ChatError::EmptyMessage));
        assert!(service.store().list_messages().expect("log").is_empty());
        assert!(seen.lock().await.is_empty());
    }

    #[tokio::test]
    async fn history_window_is_bounded_and_chronological() {
        let (service, seen, _media) = service(Ok("ok".into()));
        for index in 0..24 {
            let role = if index % 2 == 0 { Role::User } else { Role::Assistant };
            service
                .store()
                .add_message(role, &format!("earlier {index}"))
                .expect("seed");
        }

        service.send_message(QUESTION).await.expect("turn");

        let seen = seen.lock().await;
        let messages = &seen[0].0.messages;
        assert_eq!(messages.len(), 20);
        assert_eq!(messages[0].content, "earlier 5");
        assert_eq!(messages[19].content, QUESTION);
    }

    #[tokio::test]
    async fn uploaded_document_text_reaches_the_system_prompt() {
        let (service, seen, _media) = service(Ok("Use REGISTER.".into()));
        let pdf = pdf_with_pages(&["Registrar", "Proxy"]);

        let upload = service
            .upload_document(Some("  SIP primer ".into()), "primer.pdf", &pdf)
            .await
            .expect("upload");
        assert_eq!(upload.document.title, "SIP primer");
        assert!(upload.extraction_error.is_none());
        assert!(upload.extracted_chars > 0);
        assert!(upload.document.file_path.exists());

        service.send_message("How do I register?").await.expect("turn");

        let seen = seen.lock().await;
        let system = &seen[0].0.system;
        assert!(system.contains("=== SIP primer ===\n--- Page 1 ---"));
        assert!(system.contains("Registrar"));
    }

    #[tokio::test]
    async fn unreadable_upload_is_stored_without_text() {
        let (service, _seen, _media) = service(Ok("unused".into()));

        let upload = service
            .upload_document(None, "notes.pdf", b"<!DOCTYPE html>")
            .await
            .expect("upload");

        assert_eq!(upload.document.title, "notes.pdf");
        assert_eq!(upload.extracted_chars, 0);
        let error = upload.extraction_error.expect("extraction error");
        assert!(error.starts_with(EXTRACTION_ERROR_PREFIX));

        let stored = service
            .store()
            .get_document(upload.document.id)
            .expect("query")
            .expect("document");
        assert_eq!(stored.extracted_text, "");
        assert_eq!(service.metrics_snapshot().extraction_failures, 1);
    }

    #[tokio::test]
    async fn failed_document_insert_removes_the_stored_file() {
        let (service, _seen, media) = service(Ok("unused".into()));
        service
            .store()
            .execute_batch("DROP TABLE documents;")
            .expect("drop table");

        let error = service
            .upload_document(None, "primer.pdf", &pdf_with_pages(&["Registrar"]))
            .await
            .expect_err("insert fails");
        assert!(matches!(error, ChatError::Store(_)));

        let documents = media.path().join("documents");
        let mut entries = tokio::fs::read_dir(&documents).await.expect("documents dir");
        assert!(entries.next_entry().await.expect("entry").is_none());
        assert_eq!(service.metrics_snapshot().documents_uploaded, 0);
    }

    #[tokio::test]
    async fn document_chunks_reports_missing_documents() {
        let (service, _seen, _media) = service(Ok("unused".into()));
        let document = service
            .store()
            .create_document("Glossary", std::path::Path::new("g.pdf"))
            .expect("document");
        service
            .store()
            .update_extracted_text(document.id, "RTP RTCP SDP")
            .expect("update");

        assert_eq!(
            service.document_chunks(document.id, 8).expect("chunks"),
            vec!["RTP", "RTCP SDP"]
        );
        assert!(matches!(
            service.document_chunks(999, 8),
            Err(ChatError::DocumentNotFound(999))
        ));
    }

    #[tokio::test]
    async fn clear_history_removes_messages() {
        let (service, _seen, _media) = service(Ok("reply".into()));
        service.send_message(QUESTION).await.expect("turn");

        assert_eq!(service.clear_history().expect("clear"), 2);
        assert!(service.store().list_messages().expect("log").is_empty());
    }
}
