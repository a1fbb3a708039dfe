//! HTTP surface for the PDF chat server.
//!
//! - `GET /` – Uploaded documents and the full chat log.
//! - `POST /upload` – Multipart upload (`document` file part, optional `title`). Stores the file,
//!   extracts its text and returns the document plus any extraction error.
//! - `POST /send` – Run one chat turn for `{ "message": "..." }` and return
//!   `{ "user_message", "assistant_response" }`.
//! - `POST /clear` – Delete the chat log.
//! - `GET /documents` – List uploaded documents.
//! - `GET /documents/:id/chunks` – Word-bounded chunks of a document's text (`max_chars` query).
//! - `GET /metrics` – Upload and chat counters.
//! - `GET /commands` – Machine-readable command catalog.

use crate::chat::{ChatApi, ChatError, SendOutcome, UploadOutcome};
use crate::chunking::DEFAULT_CHUNK_CHARS;
use crate::metrics::MetricsSnapshot;
use crate::store::{ChatMessage, Document};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Build the HTTP router. Request bodies larger than `max_upload_bytes` are rejected.
pub fn create_router<S>(service: Arc<S>, max_upload_bytes: usize) -> Router
where
    S: ChatApi + 'static,
{
    Router::new()
        .route("/", get(index::<S>))
        .route("/upload", post(upload_document::<S>))
        .route("/send", post(send_message::<S>))
        .route("/clear", post(clear_history::<S>))
        .route("/documents", get(list_documents::<S>))
        .route("/documents/:id/chunks", get(document_chunks::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(service)
}

/// Response body for `GET /`.
#[derive(Serialize)]
struct IndexResponse {
    documents: Vec<Document>,
    messages: Vec<ChatMessage>,
}

async fn index<S>(State(service): State<Arc<S>>) -> Result<Json<IndexResponse>, AppError>
where
    S: ChatApi,
{
    Ok(Json(IndexResponse {
        documents: service.list_documents().await?,
        messages: service.list_messages().await?,
    }))
}

/// Accept a multipart upload and extract the document's text.
///
/// Extraction failures do not fail the request: the document is stored with empty text and the
/// response carries `extraction_error`.
async fn upload_document<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadOutcome>), AppError>
where
    S: ChatApi,
{
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut title: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| AppError::BadRequest(format!("Malformed upload: {error}")))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("document") => {
                let file_name = field.file_name().unwrap_or("upload.pdf").to_string();
                let bytes = field.bytes().await.map_err(|error| {
                    AppError::BadRequest(format!("Failed to read upload: {error}"))
                })?;
                file = Some((file_name, bytes.to_vec()));
            }
            Some("title") => {
                title = Some(field.text().await.map_err(|error| {
                    AppError::BadRequest(format!("Failed to read title: {error}"))
                })?);
            }
            _ => {}
        }
    }

    let Some((file_name, bytes)) = file else {
        return Err(AppError::BadRequest("No file provided".into()));
    };

    let outcome = service.upload_document(title, file_name, bytes).await?;
    tracing::info!(
        document_id = outcome.document.id,
        extracted_chars = outcome.extracted_chars,
        extraction_failed = outcome.extraction_error.is_some(),
        "Upload request completed"
    );
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Request body for `POST /send`.
#[derive(Deserialize)]
struct SendRequest {
    #[serde(default)]
    message: String,
}

async fn send_message<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<SendRequest>,
) -> Result<Json<SendOutcome>, AppError>
where
    S: ChatApi,
{
    let message = request.message.trim();
    if message.is_empty() {
        return Err(AppError::BadRequest("Empty message".into()));
    }
    Ok(Json(service.send_message(message.to_string()).await?))
}

async fn clear_history<S>(State(service): State<Arc<S>>) -> Result<StatusCode, AppError>
where
    S: ChatApi,
{
    service.clear_history().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Response body for `GET /documents`.
#[derive(Serialize)]
struct DocumentsResponse {
    documents: Vec<Document>,
}

async fn list_documents<S>(
    State(service): State<Arc<S>>,
) -> Result<Json<DocumentsResponse>, AppError>
where
    S: ChatApi,
{
    Ok(Json(DocumentsResponse {
        documents: service.list_documents().await?,
    }))
}

#[derive(Deserialize)]
struct ChunksQuery {
    #[serde(default)]
    max_chars: Option<usize>,
}

/// Response body for `GET /documents/:id/chunks`.
#[derive(Serialize)]
struct ChunksResponse {
    document_id: i64,
    max_chars: usize,
    chunks: Vec<String>,
}

async fn document_chunks<S>(
    State(service): State<Arc<S>>,
    Path(id): Path<i64>,
    Query(query): Query<ChunksQuery>,
) -> Result<Json<ChunksResponse>, AppError>
where
    S: ChatApi,
{
    let max_chars = query.max_chars.unwrap_or(DEFAULT_CHUNK_CHARS);
    let chunks = service.document_chunks(id, max_chars).await?;
    Ok(Json(ChunksResponse {
        document_id: id,
        max_chars,
        chunks,
    }))
}

async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: ChatApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "upload",
                method: "POST",
                path: "/upload",
                description: "Upload a PDF as multipart form data (`document` file, optional `title`) and extract its text.",
                request_example: None,
            },
            CommandDescriptor {
                name: "send",
                method: "POST",
                path: "/send",
                description: "Ask a question; the reply is grounded in the uploaded documents and recent chat history.",
                request_example: Some(json!({ "message": "What port does SIP use by default?" })),
            },
            CommandDescriptor {
                name: "clear",
                method: "POST",
                path: "/clear",
                description: "Delete the chat history. Uploaded documents are kept.",
                request_example: None,
            },
            CommandDescriptor {
                name: "documents",
                method: "GET",
                path: "/documents",
                description: "List uploaded documents.",
                request_example: None,
            },
            CommandDescriptor {
                name: "chunks",
                method: "GET",
                path: "/documents/:id/chunks?max_chars=4000",
                description: "Split a document's extracted text into word-bounded chunks.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return upload and chat counters.",
                request_example: None,
            },
        ],
    })
}

enum AppError {
    BadRequest(String),
    Chat(ChatError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Chat(error) => {
                let status = match &error {
                    ChatError::EmptyMessage | ChatError::Chunking(_) => StatusCode::BAD_REQUEST,
                    ChatError::DocumentNotFound(_) => StatusCode::NOT_FOUND,
                    ChatError::Completion(_) => StatusCode::BAD_GATEWAY,
                    ChatError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status.is_server_error() {
                    tracing::error!(error = %error, "Request failed");
                }
                (status, error.to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<ChatError> for AppError {
    fn from(inner: ChatError) -> Self {
        Self::Chat(inner)
    }
}
