//! Best-effort PDF text extraction.
//!
//! [`PdfExtractor`] walks an ordered list of [`ExtractionStrategy`] implementations and returns
//! the output of the first one that yields usable text. Every strategy reports text per page;
//! the extractor applies the same page rules regardless of which library produced them:
//!
//! - pages are emitted in order as `--- Page {n} ---` blocks separated by a blank line;
//! - blank pages are skipped;
//! - pages that failed to extract are kept as [`PAGE_ERROR_PLACEHOLDER`].
//!
//! A strategy that produces no pages, or only blank and failed pages, counts as failed and the
//! next strategy is tried. When all of them fail the caller gets [`ExtractionError::Exhausted`]
//! instead of text and must not persist anything.

mod strategies;

pub use strategies::{LopdfStrategy, PdfExtractStrategy};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Inline marker substituted for pages whose extraction raised an error.
pub const PAGE_ERROR_PLACEHOLDER: &str = "[Error extracting page content]";

/// Prefix shared by every extraction failure message.
pub const EXTRACTION_ERROR_PREFIX: &str = "Error extracting PDF:";

/// Text recovered from one page, or the reason it could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// 1-based page number.
    pub number: u32,
    /// Page text, or a description of the page-level failure.
    pub text: Result<String, String>,
}

/// Failure of a single strategy over a whole document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StrategyError {
    /// Library could not parse the file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),
    /// The file is encrypted and the empty password does not open it.
    #[error("PDF is password protected")]
    PasswordProtected,
    /// The document has no pages.
    #[error("PDF has no pages")]
    NoPages,
    /// Every page was blank or failed to extract.
    #[error("no extractable text found on any of {pages} pages")]
    NoText {
        /// Number of pages inspected.
        pages: usize,
    },
    /// Library panicked while reading the file.
    #[error("extraction library panicked: {0}")]
    Panicked(String),
}

/// Strategy name paired with its failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyFailure {
    /// Name of the failed strategy.
    pub strategy: &'static str,
    /// Why it failed.
    pub error: StrategyError,
}

impl fmt::Display for StrategyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy, self.error)
    }
}

/// Document-level extraction failure. No usable text was produced.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The file could not be read from disk.
    #[error("Error extracting PDF: failed to read {path}: {source}")]
    Io {
        /// Path that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Every configured strategy failed.
    #[error("Error extracting PDF: {}", join_failures(.failures))]
    Exhausted {
        /// Failures in the order the strategies ran.
        failures: Vec<StrategyFailure>,
    },
    /// The blocking extraction task was cancelled or panicked.
    #[error("Error extracting PDF: extraction task aborted: {0}")]
    Aborted(String),
}

impl ExtractionError {
    /// Whether any strategy gave up because the file is encrypted.
    pub fn is_password_protected(&self) -> bool {
        match self {
            Self::Exhausted { failures } => failures
                .iter()
                .any(|failure| failure.error == StrategyError::PasswordProtected),
            _ => false,
        }
    }
}

fn join_failures(failures: &[StrategyFailure]) -> String {
    if failures.is_empty() {
        return "no extraction strategies configured".to_string();
    }
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A pluggable way of turning PDF bytes into per-page text.
pub trait ExtractionStrategy: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Extract the text of every page, in page order.
    fn attempt(&self, pdf: &[u8]) -> Result<Vec<PageText>, StrategyError>;
}

/// Runs extraction strategies in order until one produces text.
pub struct PdfExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl Default for PdfExtractor {
    /// `pdf-extract` first, then `lopdf` with empty-password decryption.
    fn default() -> Self {
        Self::new(vec![Box::new(PdfExtractStrategy), Box::new(LopdfStrategy)])
    }
}

impl PdfExtractor {
    /// Build an extractor over an explicit strategy list.
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Extract the text of the PDF stored at `path`.
    pub fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        let bytes = std::fs::read(path).map_err(|source| ExtractionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Extracting PDF text");
        self.extract_bytes(&bytes)
    }

    /// Extract text from PDF bytes already in memory.
    pub fn extract_bytes(&self, pdf: &[u8]) -> Result<String, ExtractionError> {
        let mut failures = Vec::new();

        for strategy in &self.strategies {
            let outcome = strategy
                .attempt(pdf)
                .and_then(|pages| render_pages(strategy.name(), pages));
            match outcome {
                Ok(text) => {
                    tracing::debug!(
                        strategy = strategy.name(),
                        chars = text.len(),
                        fallbacks = failures.len(),
                        "PDF text extracted"
                    );
                    return Ok(text);
                }
                Err(error) => {
                    tracing::warn!(
                        strategy = strategy.name(),
                        error = %error,
                        "PDF extraction strategy failed"
                    );
                    failures.push(StrategyFailure {
                        strategy: strategy.name(),
                        error,
                    });
                }
            }
        }

        Err(ExtractionError::Exhausted { failures })
    }

    /// Run [`PdfExtractor::extract`] on the blocking thread pool.
    pub async fn extract_blocking(
        self: &Arc<Self>,
        path: PathBuf,
    ) -> Result<String, ExtractionError> {
        let extractor = Arc::clone(self);
        tokio::task::spawn_blocking(move || extractor.extract(&path))
            .await
            .map_err(|error| ExtractionError::Aborted(error.to_string()))?
    }
}

fn render_pages(strategy: &'static str, pages: Vec<PageText>) -> Result<String, StrategyError> {
    if pages.is_empty() {
        return Err(StrategyError::NoPages);
    }

    let page_count = pages.len();
    let mut blocks = Vec::with_capacity(page_count);
    let mut pages_with_text = 0usize;

    for page in pages {
        match page.text {
            Ok(text) => {
                let text = text.trim();
                if text.is_empty() {
                    tracing::debug!(strategy, page = page.number, "Page has no extractable text");
                    continue;
                }
                pages_with_text += 1;
                blocks.push(format!("--- Page {} ---\n{}", page.number, text));
            }
            Err(error) => {
                tracing::warn!(strategy, page = page.number, %error, "Failed to extract page");
                blocks.push(format!(
                    "--- Page {} ---\n{}",
                    page.number, PAGE_ERROR_PLACEHOLDER
                ));
            }
        }
    }

    if pages_with_text == 0 {
        return Err(StrategyError::NoText { pages: page_count });
    }

    Ok(blocks.join("\n\n"))
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ScriptedStrategy {
        name: &'static str,
        result: Result<Vec<PageText>, StrategyError>,
        calls: Mutex<usize>,
    }

    impl ScriptedStrategy {
        fn new(name: &'static str, result: Result<Vec<PageText>, StrategyError>) -> Self {
            Self {
                name,
                result,
                calls: Mutex::new(0),
            }
        }
    }

    impl ExtractionStrategy for Arc<ScriptedStrategy> {
        fn name(&self) -> &'static str {
            self.name
        }

        fn attempt(&self, _pdf: &[u8]) -> Result<Vec<PageText>, StrategyError> {
            *self.calls.lock().expect("calls") += 1;
            self.result.clone()
        }
    }

    fn page(number: u32, text: &str) -> PageText {
        PageText {
            number,
            text: Ok(text.to_string()),
        }
    }

    #[test]
    fn pages_render_as_numbered_blocks() {
        let primary = Arc::new(ScriptedStrategy::new(
            "primary",
            Ok(vec![page(1, "INVITE"), page(2, "  \n"), page(3, "BYE\n")]),
        ));
        let extractor = PdfExtractor::new(vec![Box::new(primary)]);

        let text = extractor.extract_bytes(b"%PDF-").expect("text");
        assert_eq!(text, "--- Page 1 ---\nINVITE\n\n--- Page 3 ---\nBYE");
    }

    #[test]
    fn failed_pages_become_placeholders() {
        let primary = Arc::new(ScriptedStrategy::new(
            "primary",
            Ok(vec![
                page(1, "REGISTER"),
                PageText {
                    number: 2,
                    text: Err("bad font".into()),
                },
            ]),
        ));
        let extractor = PdfExtractor::new(vec![Box::new(primary)]);

        let text = extractor.extract_bytes(b"%PDF-").expect("text");
        assert_eq!(
            text,
            format!("--- Page 1 ---\nREGISTER\n\n--- Page 2 ---\n{PAGE_ERROR_PLACEHOLDER}")
        );
    }

    #[test]
    fn fallback_runs_only_when_primary_fails() {
        let primary = Arc::new(ScriptedStrategy::new(
            "primary",
            Ok(vec![page(1, ""), page(2, " ")]),
        ));
        let fallback = Arc::new(ScriptedStrategy::new("fallback", Ok(vec![page(1, "ACK")])));
        let extractor = PdfExtractor::new(vec![
            Box::new(Arc::clone(&primary)),
            Box::new(Arc::clone(&fallback)),
        ]);

        let text = extractor.extract_bytes(b"%PDF-").expect("text");
        assert_eq!(text, "--- Page 1 ---\nACK");
        assert_eq!(*primary.calls.lock().expect("calls"), 1);
        assert_eq!(*fallback.calls.lock().expect("calls"), 1);

        let healthy = Arc::new(ScriptedStrategy::new("healthy", Ok(vec![page(1, "OK")])));
        let unused = Arc::new(ScriptedStrategy::new("unused", Ok(vec![page(1, "never")])));
        let extractor = PdfExtractor::new(vec![
            Box::new(Arc::clone(&healthy)),
            Box::new(Arc::clone(&unused)),
        ]);
        extractor.extract_bytes(b"%PDF-").expect("text");
        assert_eq!(*unused.calls.lock().expect("calls"), 0);
    }

    #[test]
    fn only_placeholder_pages_count_as_failure() {
        let primary = Arc::new(ScriptedStrategy::new(
            "primary",
            Ok(vec![PageText {
                number: 1,
                text: Err("broken stream".into()),
            }]),
        ));
        let extractor = PdfExtractor::new(vec![Box::new(primary)]);

        let error = extractor.extract_bytes(b"%PDF-").expect_err("failure");
        match error {
            ExtractionError::Exhausted { failures } => {
                assert_eq!(failures[0].error, StrategyError::NoText { pages: 1 });
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn exhausted_error_reports_every_strategy() {
        let primary = Arc::new(ScriptedStrategy::new(
            "primary",
            Err(StrategyError::Parse("encrypted stream".into())),
        ));
        let fallback = Arc::new(ScriptedStrategy::new(
            "fallback",
            Err(StrategyError::PasswordProtected),
        ));
        let extractor = PdfExtractor::new(vec![Box::new(primary), Box::new(fallback)]);

        let error = extractor.extract_bytes(b"%PDF-").expect_err("failure");
        assert!(error.is_password_protected());
        let message = error.to_string();
        assert!(message.starts_with(EXTRACTION_ERROR_PREFIX));
        assert!(message.contains("primary: failed to parse PDF: encrypted stream"));
        assert!(message.contains("fallback: PDF is password protected"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let error = PdfExtractor::default()
            .extract(&dir.path().join("absent.pdf"))
            .expect_err("missing");
        assert!(matches!(error, ExtractionError::Io { .. }));
        assert!(!error.is_password_protected());
    }

    #[test]
    fn multi_page_pdf_yields_ordered_page_blocks() {
        let pdf = fixtures::pdf_with_pages(&["Alpha", "Bravo", "Charlie"]);
        let text = PdfExtractor::default().extract_bytes(&pdf).expect("text");

        let first = text.find("--- Page 1 ---").expect("page 1");
        let second = text.find("--- Page 2 ---").expect("page 2");
        let third = text.find("--- Page 3 ---").expect("page 3");
        assert!(first < second && second < third);
        assert!(text.contains("Alpha"));
        assert!(text.contains("Bravo"));
        assert!(text.contains("Charlie"));
        assert_eq!(text.matches("--- Page ").count(), 3);
    }

    #[test]
    fn owner_password_only_pdf_opens_with_empty_password() {
        let pdf = fixtures::encrypted_pdf_with_pages(&["Secret SIP"], "owner", "");

        let pages = LopdfStrategy.attempt(&pdf).expect("lopdf pages");
        assert_eq!(pages.len(), 1);
        assert!(pages[0].text.as_deref().expect("page text").contains("Secret SIP"));

        let text = PdfExtractor::default().extract_bytes(&pdf).expect("text");
        assert!(text.starts_with("--- Page 1 ---\n"));
        assert!(text.contains("Secret SIP"));
    }

    #[test]
    fn user_password_pdf_reports_password_protection() {
        let pdf = fixtures::encrypted_pdf_with_pages(&["Secret SIP"], "owner", "secret");

        let error = PdfExtractor::default()
            .extract_bytes(&pdf)
            .expect_err("needs a password");
        assert!(error.is_password_protected());
        assert!(error.to_string().starts_with(EXTRACTION_ERROR_PREFIX));
        assert!(error.to_string().contains("password"));
    }

    #[test]
    fn text_free_pdf_returns_failure() {
        let pdf = fixtures::pdf_with_pages(&["", ""]);
        let error = PdfExtractor::default()
            .extract_bytes(&pdf)
            .expect_err("no text");
        assert!(matches!(error, ExtractionError::Exhausted { ref failures } if failures.len() == 2));
    }

    #[test]
    fn empty_pdf_returns_failure() {
        let pdf = fixtures::pdf_with_pages(&[]);
        let error = PdfExtractor::default()
            .extract_bytes(&pdf)
            .expect_err("no pages");
        assert!(error.to_string().starts_with(EXTRACTION_ERROR_PREFIX));
    }

    #[test]
    fn garbage_bytes_return_failure() {
        let error = PdfExtractor::default()
            .extract_bytes(b"<!DOCTYPE html><html></html>")
            .expect_err("not a pdf");
        assert!(matches!(error, ExtractionError::Exhausted { ref failures } if failures.len() == 2));
    }
}
