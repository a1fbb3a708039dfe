//! SQLite record store for documents and chat messages, plus the blob store for uploads.

mod blob;
mod types;

pub use blob::{BlobStore, PDF_MAGIC, has_pdf_magic};
pub use types::{ChatMessage, Document, Role, StoreError};

use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use time::{OffsetDateTime, format_description::well_known::Iso8601};

const SCHEMA: &str = "
    PRAGMA journal_mode=WAL;

    CREATE TABLE IF NOT EXISTS documents (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        uploaded_at TEXT NOT NULL,
        file_path TEXT NOT NULL,
        extracted_text TEXT NOT NULL DEFAULT ''
    );

    CREATE TABLE IF NOT EXISTS chat_messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        role TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
        content TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS chat_messages_created_at ON chat_messages (created_at, id);
";

const DOCUMENT_COLUMNS: &str = "id, title, uploaded_at, file_path, extracted_text";
const MESSAGE_COLUMNS: &str = "id, role, content, created_at";

/// Durable store for [`Document`] and [`ChatMessage`] records.
///
/// A single connection sits behind a mutex. Every method takes the lock for the duration of
/// one statement (or one insert-and-read pair), so callers never hold it across `.await`.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the database file and apply the schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        tracing::debug!(path = %path.display(), "Opened record store");
        Self::with_connection(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    // ── Documents ──

    /// Insert a document with empty extracted text.
    pub fn create_document(&self, title: &str, file_path: &Path) -> Result<Document, StoreError> {
        let conn = self.lock()?;
        let uploaded_at = now_timestamp();
        conn.execute(
            "INSERT INTO documents (title, uploaded_at, file_path) VALUES (?1, ?2, ?3)",
            params![title, uploaded_at, file_path.to_string_lossy()],
        )?;
        let id = conn.last_insert_rowid();
        Ok(Document {
            id,
            title: title.to_string(),
            uploaded_at,
            file_path: file_path.to_path_buf(),
            extracted_text: String::new(),
        })
    }

    /// Overwrite the extracted text of a document.
    pub fn update_extracted_text(&self, id: i64, text: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE documents SET extracted_text = ?1 WHERE id = ?2",
            params![text, id],
        )?;
        Ok(())
    }

    /// Fetch one document by id.
    pub fn get_document(&self, id: i64) -> Result<Option<Document>, StoreError> {
        let conn = self.lock()?;
        let document = conn
            .query_row(
                &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?1"),
                params![id],
                document_from_row,
            )
            .optional()?;
        Ok(document)
    }

    /// All documents in storage order (ascending id).
    pub fn list_documents(&self) -> Result<Vec<Document>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map([], document_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ── Messages ──

    /// Append a message to the chat log.
    pub fn add_message(&self, role: Role, content: &str) -> Result<ChatMessage, StoreError> {
        let conn = self.lock()?;
        let created_at = now_timestamp();
        conn.execute(
            "INSERT INTO chat_messages (role, content, created_at) VALUES (?1, ?2, ?3)",
            params![role.as_str(), content, created_at],
        )?;
        Ok(ChatMessage {
            id: conn.last_insert_rowid(),
            role,
            content: content.to_string(),
            created_at,
        })
    }

    /// The `limit` most recent messages, newest first.
    pub fn recent_messages(&self, limit: usize) -> Result<Vec<ChatMessage>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages \
             ORDER BY created_at DESC, id DESC LIMIT ?1"
        ))?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![limit], raw_message_from_row)?;
        collect_messages(rows)
    }

    /// Every message in chronological order.
    pub fn list_messages(&self) -> Result<Vec<ChatMessage>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages ORDER BY created_at ASC, id ASC"
        ))?;
        let rows = stmt.query_map([], raw_message_from_row)?;
        collect_messages(rows)
    }

    /// Delete the whole chat log, returning the number of removed messages.
    pub fn clear_messages(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        Ok(conn.execute("DELETE FROM chat_messages", [])?)
    }

    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> Result<(), StoreError> {
        self.lock()?.execute_batch(sql)?;
        Ok(())
    }
}

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<Document> {
    Ok(Document {
        id: row.get(0)?,
        title: row.get(1)?,
        uploaded_at: row.get(2)?,
        file_path: PathBuf::from(row.get::<_, String>(3)?),
        extracted_text: row.get(4)?,
    })
}

type RawMessage = (i64, String, String, String);

fn raw_message_from_row(row: &Row<'_>) -> rusqlite::Result<RawMessage> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn collect_messages<I>(rows: I) -> Result<Vec<ChatMessage>, StoreError>
where
    I: Iterator<Item = rusqlite::Result<RawMessage>>,
{
    rows.map(|row| {
        let (id, role, content, created_at) = row?;
        Ok(ChatMessage {
            id,
            role: role.parse()?,
            content,
            created_at,
        })
    })
    .collect()
}

/// Fixed-width ISO 8601 timestamp so text ordering matches chronological ordering.
fn now_timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(&Iso8601::DEFAULT)
        .unwrap_or_else(|_| OffsetDateTime::now_utc().unix_timestamp().to_string())
}
