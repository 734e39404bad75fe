//! In-memory PDF carrier types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A rendered PDF plus the identity of the record it was rendered from.
///
/// Built by the PDF builder, consumed by the uploader and the post-processing
/// helpers, then dropped. Post-processors mutate `buffer`, `page_count` and
/// `local_path` in place.
#[derive(Clone, PartialEq)]
pub struct PdfObject {
    /// Logical model name, e.g. `"email"` or `"compilation"`.
    pub model: String,
    /// Identity of the source record.
    pub id: String,
    /// Parent compilation identity, when the record belongs to one.
    pub compilation: Option<String>,
    /// Version marker copied from the source record's update timestamp.
    pub model_version: Option<DateTime<Utc>>,
    pub page_count: u32,
    pub buffer: Vec<u8>,
    /// Overrides the derived `<model>-<id>.pdf` file name.
    pub filename: Option<String>,
    /// Where the buffer was last written in the work directory.
    pub local_path: Option<PathBuf>,
}

impl PdfObject {
    pub fn new(model: impl Into<String>, id: impl Into<String>, buffer: Vec<u8>) -> Self {
        Self {
            model: model.into(),
            id: id.into(),
            compilation: None,
            model_version: None,
            page_count: 0,
            buffer,
            filename: None,
            local_path: None,
        }
    }

    /// `<model>-<id>.pdf` unless an explicit file name was set.
    pub fn filename(&self) -> String {
        self.filename
            .clone()
            .unwrap_or_else(|| format!("{}-{}.pdf", self.model, self.id))
    }
}

impl fmt::Debug for PdfObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdfObject")
            .field("model", &self.model)
            .field("id", &self.id)
            .field("compilation", &self.compilation)
            .field("model_version", &self.model_version)
            .field("page_count", &self.page_count)
            .field("buffer", &format_args!("<{} bytes>", self.buffer.len()))
            .field("filename", &self.filename)
            .field("local_path", &self.local_path)
            .finish()
    }
}

/// A PDF that was uploaded earlier and can be fetched back by URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePdf {
    pub url: String,
    /// Base64 SHA-256 of the uploaded bytes.
    pub checksum: Option<String>,
    pub filename: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_filename() {
        let pdf = PdfObject::new("email", "abc123", Vec::new());
        assert_eq!(pdf.filename(), "email-abc123.pdf");
    }

    #[test]
    fn explicit_filename_wins() {
        let mut pdf = PdfObject::new("email", "abc123", Vec::new());
        pdf.filename = Some("custom.pdf".into());
        assert_eq!(pdf.filename(), "custom.pdf");
    }

    #[test]
    fn debug_hides_buffer_bytes() {
        let pdf = PdfObject::new("email", "abc123", vec![0u8; 2048]);
        let dbg = format!("{pdf:?}");
        assert!(dbg.contains("<2048 bytes>"), "got: {dbg}");
    }
}
