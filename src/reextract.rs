//! Re-run text extraction over every stored document.
//!
//! Documents whose file is missing, unreadable or not a PDF (magic-byte check) are reported and
//! skipped. A successful extraction overwrites the stored text; a failed one leaves it untouched.

use std::fmt;
use std::io::ErrorKind;
use std::sync::Arc;

use serde::Serialize;

use crate::extraction::PdfExtractor;
use crate::store::{Document, Store, StoreError, has_pdf_magic};

/// What happened to one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReextractStatus {
    /// Text was extracted (and stored unless running dry).
    Updated {
        /// Characters of extracted text.
        chars: usize,
    },
    /// The referenced file does not exist.
    MissingFile,
    /// The file does not start with `%PDF-`.
    NotPdf,
    /// The file exists but could not be read.
    Unreadable {
        /// I/O error description.
        reason: String,
    },
    /// Every extraction strategy failed; stored text left unchanged.
    Failed {
        /// Extraction error description.
        reason: String,
    },
}

/// Outcome for one document.
#[derive(Debug, Clone, Serialize)]
pub struct ReextractEntry {
    /// Document id.
    pub document_id: i64,
    /// Document title.
    pub title: String,
    /// Result of the attempt.
    #[serde(flatten)]
    pub status: ReextractStatus,
}

impl fmt::Display for ReextractEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            ReextractStatus::Updated { chars } => {
                write!(f, "Successfully extracted {chars} chars from {}", self.title)
            }
            ReextractStatus::MissingFile => write!(f, "File not found for {}", self.title),
            ReextractStatus::NotPdf => {
                write!(f, "Skipping {} - not a valid PDF file", self.title)
            }
            ReextractStatus::Unreadable { reason } => {
                write!(f, "Error reading {}: {reason}", self.title)
            }
            ReextractStatus::Failed { reason } => {
                write!(f, "Failed to extract {}: {reason}", self.title)
            }
        }
    }
}

/// Per-document outcomes of a re-extraction run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReextractReport {
    /// One entry per stored document, in storage order.
    pub entries: Vec<ReextractEntry>,
}

impl ReextractReport {
    /// Documents whose text was extracted.
    pub fn updated(&self) -> usize {
        self.count(|status| matches!(status, ReextractStatus::Updated { .. }))
    }

    /// Documents skipped before extraction (missing, unreadable or not a PDF).
    pub fn skipped(&self) -> usize {
        self.count(|status| {
            matches!(
                status,
                ReextractStatus::MissingFile
                    | ReextractStatus::NotPdf
                    | ReextractStatus::Unreadable { .. }
            )
        })
    }

    /// Documents whose extraction failed.
    pub fn failed(&self) -> usize {
        self.count(|status| matches!(status, ReextractStatus::Failed { .. }))
    }

    fn count(&self, predicate: impl Fn(&ReextractStatus) -> bool) -> usize {
        self.entries
            .iter()
            .filter(|entry| predicate(&entry.status))
            .count()
    }
}

/// Re-extract every stored document. With `dry_run` nothing is written back.
pub async fn reextract_all(
    store: &Store,
    extractor: &Arc<PdfExtractor>,
    dry_run: bool,
) -> Result<ReextractReport, StoreError> {
    let mut report = ReextractReport::default();

    for document in store.list_documents()? {
        tracing::info!(document_id = document.id, title = %document.title, "Processing document");
        let status = reextract_one(store, extractor, &document, dry_run).await?;
        report.entries.push(ReextractEntry {
            document_id: document.id,
            title: document.title,
            status,
        });
    }

    tracing::info!(
        updated = report.updated(),
        skipped = report.skipped(),
        failed = report.failed(),
        dry_run,
        "Re-extraction finished"
    );
    Ok(report)
}

async fn reextract_one(
    store: &Store,
    extractor: &Arc<PdfExtractor>,
    document: &Document,
    dry_run: bool,
) -> Result<ReextractStatus, StoreError> {
    let path = &document.file_path;

    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => {}
        Ok(_) => return Ok(ReextractStatus::MissingFile),
        Err(error) if error.kind() == ErrorKind::NotFound => {
            return Ok(ReextractStatus::MissingFile);
        }
        Err(error) => {
            return Ok(ReextractStatus::Unreadable {
                reason: error.to_string(),
            });
        }
    }

    match has_pdf_magic(path).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(document_id = document.id, path = %path.display(), "Not a PDF file");
            return Ok(ReextractStatus::NotPdf);
        }
        Err(error) => {
            return Ok(ReextractStatus::Unreadable {
                reason: error.to_string(),
            });
        }
    }

    match extractor.extract_blocking(path.clone()).await {
        Ok(text) => {
            if !dry_run {
                store.update_extracted_text(document.id, &text)?;
            }
            Ok(ReextractStatus::Updated {
                chars: text.chars().count(),
            })
        }
        Err(error) => {
            tracing::warn!(document_id = document.id, error = %error, "Re-extraction failed");
            Ok(ReextractStatus::Failed {
                reason: error.to_string(),
            })
        }
    }
}
