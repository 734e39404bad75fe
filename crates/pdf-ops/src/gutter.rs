//! Gutter margins: shift odd and even pages apart with `pdfjam --twoside`.
//!
//! Printed books need extra inner margin where pages meet the binding.
//! `pdfjam --twoside --offset "<x> 0mm"` moves odd pages right and even pages
//! left by `x`, on a fixed paper size, writing a new file beside the input.

use crate::document::PdfObject;
use crate::error::PdfOpsError;
use crate::process::{run_tool, tool_name};
use crate::workdir::PdfTools;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::info;

const GUTTER_SUFFIX: &str = "guttered";

/// `<dir>/<stem>-guttered.pdf` for an input at `<dir>/<stem>.pdf`.
pub fn guttered_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    input.with_file_name(format!("{stem}-{GUTTER_SUFFIX}.pdf"))
}

impl PdfTools {
    /// Argument vector for one `pdfjam` run.
    pub fn gutter_args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let c = &self.config;
        vec![
            "--twoside".into(),
            "--papersize".into(),
            format!("{{{},{}}}", c.paper_width, c.paper_height).into(),
            input.as_os_str().to_owned(),
            "--offset".into(),
            format!("{} 0mm", c.gutter_offset).into(),
            "--outfile".into(),
            output.as_os_str().to_owned(),
        ]
    }

    /// Apply the gutter offset to a saved PDF.
    ///
    /// On success the buffer is replaced with the guttered file's bytes and
    /// `local_path` points at the new file. Any non-zero exit is terminal for
    /// this call. The page count is unchanged by `pdfjam`, so it is not
    /// recomputed.
    pub async fn add_gutter_margins(&self, pdf: &mut PdfObject) -> Result<(), PdfOpsError> {
        let input = pdf
            .local_path
            .clone()
            .ok_or_else(|| PdfOpsError::MissingLocalPath { id: pdf.id.clone() })?;
        let output = guttered_path(&input);
        let program = &self.config.pdfjam_path;

        info!(
            "Adding {} gutter to {} → {}",
            self.config.gutter_offset,
            input.display(),
            output.display()
        );

        run_tool(program, &self.gutter_args(&input, &output), None)
            .await?
            .check(&tool_name(program))?;

        pdf.buffer = tokio::fs::read(&output)
            .await
            .map_err(|e| PdfOpsError::io(&output, e))?;
        pdf.local_path = Some(output);
        Ok(())
    }
}
