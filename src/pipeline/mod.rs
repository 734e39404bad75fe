//! Pipeline stages for email PDF generation.
//!
//! Each submodule implements exactly one step, so every step can be tested on
//! its own and the renderer or object store swapped without touching the
//! others.
//!
//! ## Data Flow
//!
//! ```text
//! template ──▶ render ──▶ build ──▶ upload
//! ([[BODY]])   (engine)   (pages)   (object store + head)
//! ```
//!
//! 1. [`template`] — substitute the email body into its HTML template
//! 2. [`render`]   — run the HTML→PDF engine; the only stage spawning a process
//! 3. [`build`]    — count pages and attach the source record's identity
//! 4. [`upload`]   — put the PDF with CORS metadata, then read back its
//!    metadata to assemble the [`crate::model::UploadResult`]

pub mod build;
pub mod render;
pub mod template;
pub mod upload;

pub use build::{build_pdf, PdfSource};
pub use render::{HtmlRenderer, ProcessRenderer};
pub use template::{email_html, render_template};
pub use upload::{storage_path, PdfUploader};
