use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use lopdf::Document;

use super::{ExtractionStrategy, PageText, StrategyError};

/// Primary strategy backed by the `pdf-extract` crate.
///
/// `pdf-extract` reports pages as a whole, so a failure anywhere fails the attempt. The
/// crate is known to panic on some malformed inputs; panics are caught and reported as
/// [`StrategyError::Panicked`].
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractStrategy;

impl ExtractionStrategy for PdfExtractStrategy {
    fn name(&self) -> &'static str {
        "pdf-extract"
    }

    fn attempt(&self, pdf: &[u8]) -> Result<Vec<PageText>, StrategyError> {
        let pages = catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(pdf)
        }))
        .map_err(|payload| StrategyError::Panicked(panic_message(payload.as_ref())))?
        .map_err(|error| classify(error.to_string()))?;

        Ok(pages
            .into_iter()
            .zip(1u32..)
            .map(|(text, number)| PageText {
                number,
                text: Ok(text),
            })
            .collect())
    }
}

/// Fallback strategy backed by `lopdf`.
///
/// Encrypted documents are decrypted with the empty password, which opens files that only
/// carry an owner password. `lopdf` already does this while loading when the empty password
/// authenticates, so decryption only runs when loading left the document encrypted. Each page is
/// extracted separately so one broken page does not sink the document.
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfStrategy;

impl ExtractionStrategy for LopdfStrategy {
    fn name(&self) -> &'static str {
        "lopdf"
    }

    fn attempt(&self, pdf: &[u8]) -> Result<Vec<PageText>, StrategyError> {
        let mut document = Document::load_mem(pdf).map_err(|error| classify(error.to_string()))?;

        if document.is_encrypted() && document.encryption_state.is_none() {
            if let Err(error) = document.decrypt("") {
                tracing::debug!(%error, "Empty-password decryption failed");
                return Err(StrategyError::PasswordProtected);
            }
            tracing::debug!("Decrypted PDF with empty password");
        }

        let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
        Ok(page_numbers
            .into_iter()
            .map(|number| PageText {
                number,
                text: document
                    .extract_text(&[number])
                    .map_err(|error| error.to_string()),
            })
            .collect())
    }
}

/// Map a library error message onto the strategy error taxonomy.
fn classify(message: String) -> StrategyError {
    let lowered = message.to_lowercase();
    if lowered.contains("password") || lowered.contains("decrypt") || lowered.contains("encrypt") {
        StrategyError::PasswordProtected
    } else {
        StrategyError::Parse(message)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
