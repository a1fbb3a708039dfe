use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing upload and chat activity.
#[derive(Default)]
pub struct ChatMetrics {
    documents_uploaded: AtomicU64,
    extraction_failures: AtomicU64,
    chat_turns: AtomicU64,
    completion_failures: AtomicU64,
}

impl ChatMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an uploaded document and whether its text could be extracted.
    pub fn record_upload(&self, extracted: bool) {
        self.documents_uploaded.fetch_add(1, Ordering::Relaxed);
        if !extracted {
            self.extraction_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a chat turn that produced an assistant reply.
    pub fn record_turn(&self) {
        self.chat_turns.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a chat turn whose completion request failed.
    pub fn record_completion_failure(&self) {
        self.completion_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_uploaded: self.documents_uploaded.load(Ordering::Relaxed),
            extraction_failures: self.extraction_failures.load(Ordering::Relaxed),
            chat_turns: self.chat_turns.load(Ordering::Relaxed),
            completion_failures: self.completion_failures.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of the counters used for reporting.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents uploaded since startup.
    pub documents_uploaded: u64,
    /// Uploads whose text could not be extracted.
    pub extraction_failures: u64,
    /// Chat turns answered by the model.
    pub chat_turns: u64,
    /// Chat turns whose completion request failed.
    pub completion_failures: u64,
}
