//! Prompt context assembly: stored document text and the recent conversation window.

use crate::completion::HistoryMessage;
use crate::store::{Store, StoreError};

/// Context returned when no document has been uploaded.
pub const NO_DOCUMENTS_PLACEHOLDER: &str = "No documents uploaded yet.";

/// Concatenate every stored document into one context string.
///
/// Each document contributes `=== {title} ===` followed by at most `char_limit` characters of
/// its extracted text. Blocks appear in storage order, separated by a blank line.
pub fn build_document_context(store: &Store, char_limit: usize) -> Result<String, StoreError> {
    let documents = store.list_documents()?;
    if documents.is_empty() {
        return Ok(NO_DOCUMENTS_PLACEHOLDER.to_string());
    }

    let blocks: Vec<String> = documents
        .iter()
        .map(|document| {
            format!(
                "=== {} ===\n{}",
                document.title,
                truncate_chars(&document.extracted_text, char_limit)
            )
        })
        .collect();

    Ok(blocks.join("\n\n"))
}

/// Load the `limit` most recent messages, oldest first.
pub fn build_history(store: &Store, limit: usize) -> Result<Vec<HistoryMessage>, StoreError> {
    let mut recent = store.recent_messages(limit)?;
    recent.reverse();
    Ok(recent
        .into_iter()
        .map(|message| HistoryMessage {
            role: message.role,
            content: message.content,
        })
        .collect())
}

/// Borrow at most `limit` characters from the start of `text`.
pub(crate) fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Role;
    use std::path::Path;

    #[test]
    fn empty_store_yields_placeholder() {
        let store = Store::open_in_memory().expect("store");
        assert_eq!(
            build_document_context(&store, 8000).expect("context"),
            "No documents uploaded yet."
        );
    }

    #[test]
    fn long_documents_are_truncated_to_the_cap() {
        let store = Store::open_in_memory().expect("store");
        let document = store
            .create_document("SIP handbook", Path::new("a.pdf"))
            .expect("document");
        let text: String = "abcdefghij".repeat(900);
        assert_eq!(text.len(), 9000);
        store
            .update_extracted_text(document.id, &text)
            .expect("update");

        let context = build_document_context(&store, 8000).expect("context");
        assert_eq!(context, format!("=== SIP handbook ===\n{}", &text[..8000]));
    }

    #[test]
    fn documents_are_joined_with_blank_lines() {
        let store = Store::open_in_memory().expect("store");
        let first = store.create_document("RFC 3261", Path::new("a.pdf")).expect("a");
        store.create_document("Empty scan", Path::new("b.pdf")).expect("b");
        store.update_extracted_text(first.id, "INVITE").expect("update");

        let context = build_document_context(&store, 8000).expect("context");
        assert_eq!(context, "=== RFC 3261 ===\nINVITE\n\n=== Empty scan ===\n");
    }

    #[test]
    fn truncation_respects_character_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 80), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn history_returns_most_recent_window_oldest_first() {
        let store = Store::open_in_memory().expect("store");
        for index in 0..25 {
            let role = if index % 2 == 0 { Role::User } else { Role::Assistant };
            store
                .add_message(role, &format!("message {index}"))
                .expect("insert");
        }

        let history = build_history(&store, 20).expect("history");
        assert_eq!(history.len(), 20);
        assert_eq!(history.first().expect("first").content, "message 5");
        assert_eq!(history.last().expect("last").content, "message 24");
        assert_eq!(history[0].role, Role::Assistant);
        let contents: Vec<_> = history.iter().map(|m| m.content.clone()).collect();
        let expected: Vec<_> = (5..25).map(|i| format!("message {i}")).collect();
        assert_eq!(contents, expected);
    }
}
