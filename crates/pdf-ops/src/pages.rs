//! Page counting via lopdf.
//!
//! ## Why spawn_blocking?
//!
//! Parsing a PDF walks the whole cross-reference table and decompresses object
//! streams. That is CPU-bound work, so the async entry point moves it onto
//! Tokio's blocking pool instead of stalling a worker thread.

use crate::error::PdfOpsError;
use lopdf::Document;
use tracing::debug;

/// Count the pages of an in-memory PDF.
pub async fn count_pages(buffer: &[u8]) -> Result<u32, PdfOpsError> {
    let bytes = buffer.to_vec();
    tokio::task::spawn_blocking(move || count_pages_blocking(&bytes))
        .await
        .map_err(|e| PdfOpsError::Internal(format!("Page count task panicked: {}", e)))?
}

/// Blocking implementation of [`count_pages`].
pub fn count_pages_blocking(buffer: &[u8]) -> Result<u32, PdfOpsError> {
    if buffer.len() < 4 || &buffer[..4] != b"%PDF" {
        return Err(PdfOpsError::InvalidPdf("missing %PDF header".into()));
    }

    let document =
        Document::load_mem(buffer).map_err(|e| PdfOpsError::InvalidPdf(e.to_string()))?;
    let pages = document.get_pages().len() as u32;
    debug!("Counted {} pages in {} bytes", pages, buffer.len());
    Ok(pages)
}
