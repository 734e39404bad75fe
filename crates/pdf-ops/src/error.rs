//! Error type for the pdf-ops helpers.
//!
//! Each variant names the tool or path involved so a failed post-processing
//! step can be diagnosed from the log line alone.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the pdf-ops helpers.
#[derive(Debug, Error)]
pub enum PdfOpsError {
    // ── Filesystem ────────────────────────────────────────────────────────
    /// Reading, writing or removing a work-directory file failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A work-directory file name that is empty or spans more than one path
    /// component (absolute paths, `..`, separators).
    #[error("Invalid work-directory file name '{name}'")]
    InvalidFileName { name: String },

    /// A path that would be interpreted by TeX if written into LaTeX source.
    #[error("Path '{path}' contains characters that are not safe in LaTeX source")]
    UnsafeTexPath { path: PathBuf },

    /// The operation needs the PDF on disk but it was never saved.
    #[error("PDF '{id}' has no local path; save it to the work directory first")]
    MissingLocalPath { id: String },

    // ── PDF parsing ───────────────────────────────────────────────────────
    /// The buffer could not be parsed as a PDF.
    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    // ── External tools ────────────────────────────────────────────────────
    /// The tool binary could not be started at all.
    #[error("Failed to start '{tool}': {source}\nCheck that it is installed and on PATH.")]
    ToolSpawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran but exited unsuccessfully.
    #[error("{tool} returned a bad exit code ({status}): {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    /// pdftk wrote to standard error while concatenating into memory.
    #[error("pdftk concatenation failed: {stderr}")]
    ConcatFailed { stderr: String },

    // ── Download ──────────────────────────────────────────────────────────
    /// The remote PDF has no URL to download from.
    #[error("Missing PDF URL for '{filename}'")]
    MissingUrl { filename: String },

    /// The HTTP request or body stream failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// The download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Config ────────────────────────────────────────────────────────────
    #[error("Invalid pdf-ops configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error (task join failure etc.).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PdfOpsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PdfOpsError::Io {
            path: path.into(),
            source,
        }
    }
}
