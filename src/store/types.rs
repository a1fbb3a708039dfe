//! Records persisted by the store and the errors it raises.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised by the record and blob stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite rejected a statement or could not be opened.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Filesystem operation on the media root failed.
    #[error("blob storage error: {0}")]
    Io(#[from] std::io::Error),
    /// A stored role column held a value other than `user` or `assistant`.
    #[error("unknown chat role '{0}'")]
    UnknownRole(String),
    /// The database mutex was poisoned by a panicking writer.
    #[error("database connection lock poisoned")]
    Poisoned,
}

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message typed by the person using the app.
    User,
    /// Reply produced by the language model.
    Assistant,
}

impl Role {
    /// Wire and storage representation of the role.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(StoreError::UnknownRole(other.to_string())),
        }
    }
}

/// Uploaded PDF and the text extracted from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    /// Store-assigned identifier; also the enumeration order.
    pub id: i64,
    /// Display title.
    pub title: String,
    /// RFC 3339 upload timestamp.
    pub uploaded_at: String,
    /// Location of the uploaded file in the blob store.
    pub file_path: PathBuf,
    /// Extracted text; empty until extraction succeeds.
    #[serde(skip_serializing)]
    pub extracted_text: String,
}

/// Single persisted chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    /// Store-assigned identifier; breaks ties between equal timestamps.
    pub id: i64,
    /// Author of the message.
    pub role: Role,
    /// Message body.
    pub content: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

impl fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let preview: String = self.content.chars().take(50).collect();
        write!(f, "{}: {}", self.role, preview)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_storage_text() {
        assert_eq!("user".parse::<Role>().expect("role"), Role::User);
        assert_eq!(Role::Assistant.as_str(), "assistant");
        assert!(matches!(
            "system".parse::<Role>(),
            Err(StoreError::UnknownRole(role)) if role == "system"
        ));
    }

    #[test]
    fn message_display_truncates_content() {
        let message = ChatMessage {
            id: 1,
            role: Role::User,
            content: "x".repeat(80),
            created_at: "2026-01-01T00:00:00Z".into(),
        };
        assert_eq!(message.to_string(), format!("user: {}", "x".repeat(50)));
    }
}
