//! # email-pdf
//!
//! Render stored email records to PDF, publish them to object storage and
//! record where they went.
//!
//! ## Pipeline Overview
//!
//! ```text
//! request{id}
//!  │
//!  ├─ 1. Fetch    email record from the document store (404 if absent)
//!  ├─ 2. Template substitute the body into the HTML template
//!  ├─ 3. Render   HTML → PDF with an external engine, count pages (lopdf)
//!  ├─ 4. Upload   put to object storage with CORS metadata, read back metadata
//!  ├─ 5. Persist  write the upload result onto the record (exactly one)
//!  └─ 6. Refetch  return the updated record as JSON
//! ```
//!
//! PDF post-processing (gutter margins, blank pages, concatenation, cached
//! downloads) lives in the companion `pdf-ops` crate, re-exported here as
//! [`pdf_ops`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use email_pdf::{ApiRequest, EmailPdfService, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::builder()
//!         .database_url("postgres://localhost/emails")
//!         .public_base_url("https://cdn.example.com")
//!         .build()?;
//!     let service = EmailPdfService::from_config(&config)?;
//!
//!     let response = service.handle(&ApiRequest::with_id("abc123")).await;
//!     println!("{} {}", response.status_code, response.body);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature    | Default | Description |
//! |------------|---------|-------------|
//! | `postgres` | on      | PostgreSQL email store (sqlx) |
//! | `server`   | via cli | axum HTTP trigger |
//! | `cli`      | on      | The `email-pdf` binary (clap + anyhow + tracing-subscriber) |
//!
//! Library-only users can drop the binary and database dependencies:
//! ```toml
//! email-pdf = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod handler;
pub mod model;
pub mod pipeline;
#[cfg(feature = "server")]
pub mod server;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    default_engine_path, Orientation, RenderOptions, ServiceConfig, ServiceConfigBuilder,
    StorageConfig,
};
pub use error::{EmailPdfError, ErrorBody};
pub use handler::{ApiRequest, ApiResponse, EmailPdfService};
pub use model::{EmailRecord, UploadResult};
pub use pdf_ops;
pub use pipeline::{
    build_pdf, email_html, render_template, HtmlRenderer, PdfUploader, ProcessRenderer,
};
pub use store::{Connect, Connector, EmailStore, MemoryEmailStore, StoreError};
