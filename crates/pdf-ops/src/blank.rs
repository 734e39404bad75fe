//! Blank-page insertion through `pdflatex`.
//!
//! The PDF is saved to the work directory, a LaTeX wrapper that includes every
//! page and then emits one empty page is filled in from a template, and the
//! template is piped to `pdflatex` on stdin. The wrapper never touches a
//! shell: the generated source travels as bytes, not as a command line.

use crate::config::is_tex_safe_path;
use crate::document::PdfObject;
use crate::error::PdfOpsError;
use crate::pages::count_pages;
use crate::process::{run_tool, tool_name};
use crate::workdir::PdfTools;
use std::ffi::OsString;
use std::path::Path;
use tracing::{info, warn};

/// Built-in template. Placeholders: `PDF_PATH`, `PDF_WIDTH`, `PDF_HEIGHT`.
pub const DEFAULT_TEMPLATE: &str = include_str!("../latex/append_blank_page.tex");

const BLANKED_SUFFIX: &str = "blanked";

/// Substitute the placeholders in `template`.
///
/// `pdf_path` is inserted verbatim, so it must pass [`is_tex_safe_path`].
pub fn fill_template(
    template: &str,
    pdf_path: &Path,
    width: &str,
    height: &str,
) -> Result<String, PdfOpsError> {
    let path = pdf_path
        .to_str()
        .filter(|p| is_tex_safe_path(p))
        .ok_or_else(|| PdfOpsError::UnsafeTexPath {
            path: pdf_path.to_path_buf(),
        })?;
    Ok(template
        .replace("PDF_PATH", path)
        .replace("PDF_HEIGHT", height)
        .replace("PDF_WIDTH", width))
}

impl PdfTools {
    async fn blank_page_template(&self) -> Result<String, PdfOpsError> {
        match &self.config.blank_page_template {
            Some(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| PdfOpsError::io(path, e)),
            None => Ok(DEFAULT_TEMPLATE.to_string()),
        }
    }

    /// Append one blank page to the PDF.
    ///
    /// Replaces the buffer with the regenerated document, recounts its pages
    /// and removes the `.pdf`, `.aux` and `.log` files `pdflatex` produced.
    pub async fn append_blank_page(&self, pdf: &mut PdfObject) -> Result<(), PdfOpsError> {
        let template = self.blank_page_template().await?;
        let planned = self.work_path(&pdf.filename())?;
        let latex = fill_template(
            &template,
            &planned,
            &self.config.paper_width,
            &self.config.paper_height,
        )?;

        let source = self.save_pdf(pdf).await?;
        let dir = source
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.work_dir().to_path_buf());
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| pdf.id.clone());
        let job_name = format!("{stem}-{BLANKED_SUFFIX}");

        let program = &self.config.pdflatex_path;
        let args: Vec<OsString> = vec![
            "-interaction=nonstopmode".into(),
            "-halt-on-error".into(),
            format!("-jobname={job_name}").into(),
            {
                let mut arg = OsString::from("-output-directory=");
                arg.push(dir.as_os_str());
                arg
            },
        ];

        info!("Appending blank page to {}", source.display());
        run_tool(program, &args, Some(latex.into_bytes()))
            .await?
            .check(&tool_name(program))?;

        let output = dir.join(format!("{job_name}.pdf"));
        pdf.buffer = tokio::fs::read(&output)
            .await
            .map_err(|e| PdfOpsError::io(&output, e))?;
        pdf.page_count = count_pages(&pdf.buffer).await?;

        // Keep the saved copy in step with the buffer.
        tokio::fs::write(&source, &pdf.buffer)
            .await
            .map_err(|e| PdfOpsError::io(&source, e))?;

        for ext in ["pdf", "aux", "log"] {
            remove_intermediate(&dir.join(format!("{job_name}.{ext}"))).await;
        }

        info!("Blank page appended: {} pages", pdf.page_count);
        Ok(())
    }
}

async fn remove_intermediate(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}
