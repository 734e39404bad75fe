//! # pdf-ops
//!
//! Post-processing helpers for PDFs that have already been rendered.
//!
//! Every operation here wraps an external tool or library and round-trips the
//! document through a local work directory:
//!
//! ```text
//! PdfObject ──▶ save_pdf ──▶ <work_dir>/<model>-<id>.pdf
//!                              │
//!                              ├─ add_gutter_margins   (pdfjam)
//!                              ├─ append_blank_page    (pdflatex)
//!                              └─ concat_to_file / concat_to_buffer (pdftk)
//!
//! RemotePdf ──▶ download_pdf ──▶ <work_dir>/<filename>  (skipped when the
//!                                                       local checksum matches)
//! ```
//!
//! Tools are always spawned with an explicit argument vector. Nothing is ever
//! passed through a shell, so file names and template content cannot be
//! interpreted as shell syntax.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_ops::{PdfObject, PdfOpsConfig, PdfTools};
//!
//! # async fn run(bytes: Vec<u8>) -> Result<(), pdf_ops::PdfOpsError> {
//! let tools = PdfTools::new(PdfOpsConfig::default())?;
//! let mut pdf = PdfObject::new("email", "abc123", bytes);
//! pdf.page_count = pdf_ops::count_pages(&pdf.buffer).await?;
//!
//! tools.save_pdf(&mut pdf).await?;
//! tools.add_gutter_margins(&mut pdf).await?;
//! # Ok(())
//! # }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod blank;
pub mod concat;
pub mod config;
pub mod document;
pub mod download;
pub mod error;
pub mod gutter;
pub mod pages;
pub mod process;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod workdir;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::PdfOpsConfig;
pub use document::{PdfObject, RemotePdf};
pub use download::{checksum, DownloadProgress};
pub use error::PdfOpsError;
pub use pages::{count_pages, count_pages_blocking};
pub use workdir::PdfTools;
