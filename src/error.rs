//! Error type for the email-pdf service.
//!
//! Every failure the pipeline can hit is a variant of [`EmailPdfError`].
//! The HTTP-style entry points never surface a raw error: they turn it into a
//! JSON body via [`EmailPdfError::status_code`] and [`EmailPdfError::code`].
//!
//! | Variant group | Status |
//! |---------------|--------|
//! | `InvalidRequest` | 400 |
//! | `EmailNotFound` | 404 |
//! | `UpdateCountMismatch` | 409 |
//! | store / render / PDF / upload failures | 502 |
//! | everything else | 500 |

use crate::store::StoreError;
use pdf_ops::PdfOpsError;
use serde::Serialize;
use thiserror::Error;

/// All errors returned by the email-pdf library.
#[derive(Debug, Error)]
pub enum EmailPdfError {
    // ── Request errors ────────────────────────────────────────────────────
    /// The trigger did not carry a usable `id` path parameter.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No email record exists under the requested id.
    #[error("No email found with id '{id}'")]
    EmailNotFound { id: String },

    /// Persisting the upload result touched a number of records other than one.
    #[error("Expected to update exactly 1 email '{id}', updated {updated}")]
    UpdateCountMismatch { id: String, updated: u64 },

    // ── Document store ────────────────────────────────────────────────────
    #[error(transparent)]
    Store(#[from] StoreError),

    // ── Rendering ─────────────────────────────────────────────────────────
    /// The HTML→PDF engine could not be started or exited unsuccessfully.
    #[error("Rendering with '{engine}' failed: {reason}")]
    RenderFailed { engine: String, reason: String },

    /// The engine did not finish within the configured timeout.
    #[error("Rendering timed out after {secs}s")]
    RenderTimeout { secs: u64 },

    /// The engine exited cleanly but its output is not a PDF.
    #[error("Renderer output is not a PDF (first bytes: {magic:?})")]
    NotAPdf { magic: Vec<u8> },

    /// Page counting or another PDF helper failed.
    #[error(transparent)]
    PdfOps(#[from] PdfOpsError),

    // ── Object storage ────────────────────────────────────────────────────
    /// The PUT to object storage failed.
    #[error("Failed to upload PDF to '{path}': {source}")]
    UploadFailed {
        path: String,
        #[source]
        source: object_store::Error,
    },

    /// The object was stored but its metadata could not be read back.
    #[error("Failed to fetch metadata for '{path}': {message}")]
    MetadataFetchFailed {
        path: String,
        message: String,
        #[source]
        source: object_store::Error,
    },

    // ── Internal ──────────────────────────────────────────────────────────
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EmailPdfError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            EmailPdfError::InvalidRequest(_) => 400,
            EmailPdfError::EmailNotFound { .. } => 404,
            EmailPdfError::UpdateCountMismatch { .. } => 409,
            EmailPdfError::Store(_)
            | EmailPdfError::RenderFailed { .. }
            | EmailPdfError::RenderTimeout { .. }
            | EmailPdfError::NotAPdf { .. }
            | EmailPdfError::PdfOps(_)
            | EmailPdfError::UploadFailed { .. }
            | EmailPdfError::MetadataFetchFailed { .. } => 502,
            EmailPdfError::Serialization(_)
            | EmailPdfError::InvalidConfig(_)
            | EmailPdfError::Internal(_) => 500,
        }
    }

    /// Stable machine-readable code used in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            EmailPdfError::InvalidRequest(_) => "invalid_request",
            EmailPdfError::EmailNotFound { .. } => "email_not_found",
            EmailPdfError::UpdateCountMismatch { .. } => "update_count_mismatch",
            EmailPdfError::Store(_) => "store_error",
            EmailPdfError::RenderFailed { .. } => "render_failed",
            EmailPdfError::RenderTimeout { .. } => "render_timeout",
            EmailPdfError::NotAPdf { .. } => "render_not_pdf",
            EmailPdfError::PdfOps(_) => "pdf_processing_failed",
            EmailPdfError::UploadFailed { .. } => "upload_failed",
            EmailPdfError::MetadataFetchFailed { .. } => "metadata_fetch_failed",
            EmailPdfError::Serialization(_)
            | EmailPdfError::InvalidConfig(_)
            | EmailPdfError::Internal(_) => "internal_error",
        }
    }

    pub fn to_response_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
            code: self.code().to_string(),
        }
    }
}

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}
