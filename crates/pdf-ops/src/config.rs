//! Configuration for the post-processing helpers.
//!
//! Paper dimensions and the gutter offset end up inside `pdfjam` arguments
//! and LaTeX source, so they are validated as plain TeX lengths before any
//! tool is started.

use crate::error::PdfOpsError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;

/// Settings shared by every [`crate::PdfTools`] operation.
#[derive(Debug, Clone)]
pub struct PdfOpsConfig {
    /// Directory holding intermediate PDF files. Default: `<tmp>/compilation`.
    ///
    /// Point concurrent workers that share a filesystem at distinct
    /// directories: file names derive from model and record id, so two
    /// workers processing the same record would otherwise collide.
    pub work_dir: PathBuf,

    /// Final page width as a TeX length. Default: `148mm` (A5).
    pub paper_width: String,

    /// Final page height as a TeX length. Default: `210mm` (A5).
    pub paper_height: String,

    /// Horizontal binding offset applied by `pdfjam --twoside`. Default: `10mm`.
    pub gutter_offset: String,

    /// `pdfjam` executable. Default: `pdfjam`.
    pub pdfjam_path: PathBuf,

    /// `pdflatex` executable. Default: `pdflatex`.
    pub pdflatex_path: PathBuf,

    /// `pdftk` executable. Default: `pdftk`.
    pub pdftk_path: PathBuf,

    /// LaTeX template used by `append_blank_page`. `None` uses the built-in one.
    pub blank_page_template: Option<PathBuf>,

    /// Download timeout in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl Default for PdfOpsConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("compilation"),
            paper_width: "148mm".to_string(),
            paper_height: "210mm".to_string(),
            gutter_offset: "10mm".to_string(),
            pdfjam_path: PathBuf::from("pdfjam"),
            pdflatex_path: PathBuf::from("pdflatex"),
            pdftk_path: PathBuf::from("pdftk"),
            blank_page_template: None,
            download_timeout_secs: 120,
        }
    }
}

static RE_TEX_LENGTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(\.\d+)?(mm|cm|in|pt)$").unwrap());

/// True when `value` is a plain TeX length such as `148mm` or `0.5in`.
pub fn is_tex_length(value: &str) -> bool {
    RE_TEX_LENGTH.is_match(value)
}

static RE_TEX_SAFE_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_./+-]+$").unwrap());

/// True when `path` can be pasted into LaTeX source verbatim: no spaces, no
/// braces, backslashes or other characters TeX gives a meaning to.
pub fn is_tex_safe_path(path: &str) -> bool {
    RE_TEX_SAFE_PATH.is_match(path)
}

impl PdfOpsConfig {
    /// Check the dimension fields before they reach a tool invocation.
    pub fn validate(&self) -> Result<(), PdfOpsError> {
        for (name, value) in [
            ("paper_width", &self.paper_width),
            ("paper_height", &self.paper_height),
            ("gutter_offset", &self.gutter_offset),
        ] {
            if !is_tex_length(value) {
                return Err(PdfOpsError::InvalidConfig(format!(
                    "{name} must be a length like '148mm', got '{value}'"
                )));
            }
        }
        if self.download_timeout_secs == 0 {
            return Err(PdfOpsError::InvalidConfig(
                "download_timeout_secs must be ≥ 1".into(),
            ));
        }
        Ok(())
    }
}
