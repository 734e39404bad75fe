//! The work directory and the [`PdfTools`] handle that owns it.
//!
//! Every post-processing operation is a method on [`PdfTools`]; the operations
//! themselves live in their own modules ([`crate::gutter`], [`crate::blank`],
//! [`crate::concat`], [`crate::download`]).

use crate::config::PdfOpsConfig;
use crate::document::PdfObject;
use crate::error::PdfOpsError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Entry point for the post-processing helpers.
#[derive(Debug, Clone)]
pub struct PdfTools {
    pub(crate) config: PdfOpsConfig,
}

impl PdfTools {
    /// Validate `config` and wrap it.
    pub fn new(config: PdfOpsConfig) -> Result<Self, PdfOpsError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PdfOpsConfig {
        &self.config
    }

    pub fn work_dir(&self) -> &Path {
        &self.config.work_dir
    }

    /// Create the work directory if it does not exist yet.
    pub async fn ensure_work_dir(&self) -> Result<&Path, PdfOpsError> {
        let dir = self.work_dir();
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| PdfOpsError::io(dir, e))?;
        Ok(dir)
    }

    /// `<work_dir>/<name>`. `name` must be a single plain path component so
    /// the result never leaves the work directory.
    pub fn work_path(&self, name: &str) -> Result<PathBuf, PdfOpsError> {
        if Path::new(name).file_name().and_then(|n| n.to_str()) != Some(name) {
            return Err(PdfOpsError::InvalidFileName {
                name: name.to_string(),
            });
        }
        Ok(self.work_dir().join(name))
    }

    /// Write the buffer to `<work_dir>/<filename>` and record the path.
    pub async fn save_pdf(&self, pdf: &mut PdfObject) -> Result<PathBuf, PdfOpsError> {
        let filename = pdf.filename();
        let local_path = self.work_path(&filename)?;
        self.ensure_work_dir().await?;

        tokio::fs::write(&local_path, &pdf.buffer)
            .await
            .map_err(|e| PdfOpsError::io(&local_path, e))?;
        debug!(
            "Saved {} ({} bytes) to {}",
            filename,
            pdf.buffer.len(),
            local_path.display()
        );

        pdf.filename = Some(filename);
        pdf.local_path = Some(local_path.clone());
        Ok(local_path)
    }
}
