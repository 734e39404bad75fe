//! Render HTML and wrap the result in a [`PdfObject`].

use super::render::HtmlRenderer;
use crate::config::RenderOptions;
use crate::error::EmailPdfError;
use crate::model::EmailRecord;
use chrono::{DateTime, Utc};
use pdf_ops::{count_pages, PdfObject};
use tracing::info;

/// A stored record a PDF can be rendered from.
pub trait PdfSource: Send + Sync {
    fn source_id(&self) -> &str;
    /// Parent compilation, if the record belongs to one.
    fn compilation_id(&self) -> Option<&str>;
    /// Last modification time, copied onto the PDF as its model version.
    fn version(&self) -> Option<DateTime<Utc>>;
}

impl PdfSource for EmailRecord {
    fn source_id(&self) -> &str {
        &self.id
    }

    fn compilation_id(&self) -> Option<&str> {
        self.compilation.as_deref()
    }

    fn version(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

/// Render `html` and assemble a [`PdfObject`] identified by `model` and the
/// source record.
///
/// Render and page-count failures are returned as-is.
pub async fn build_pdf(
    renderer: &dyn HtmlRenderer,
    html: &str,
    model: &str,
    source: &dyn PdfSource,
    options: &RenderOptions,
) -> Result<PdfObject, EmailPdfError> {
    let buffer = renderer.render(html, options).await?;
    let page_count = count_pages(&buffer).await?;

    info!(
        "Built {} {} PDF: {} pages, {} bytes",
        model,
        source.source_id(),
        page_count,
        buffer.len()
    );

    let mut pdf = PdfObject::new(model, source.source_id(), buffer);
    pdf.compilation = source.compilation_id().map(str::to_string);
    pdf.model_version = source.version();
    pdf.page_count = page_count;
    Ok(pdf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdf_ops::testing::sample_pdf;
    use async_trait::async_trait;
    use chrono::TimeZone;

    /// Returns a fixed PDF whose page count is the number of `<p>` tags.
    struct ParagraphRenderer;

    #[async_trait]
    impl HtmlRenderer for ParagraphRenderer {
        async fn render(&self, html: &str, _: &RenderOptions) -> Result<Vec<u8>, EmailPdfError> {
            Ok(sample_pdf(html.matches("<p>").count().max(1)))
        }
    }

    struct BrokenRenderer;

    #[async_trait]
    impl HtmlRenderer for BrokenRenderer {
        async fn render(&self, _: &str, _: &RenderOptions) -> Result<Vec<u8>, EmailPdfError> {
            Ok(b"not a pdf".to_vec())
        }
    }

    fn email() -> EmailRecord {
        let mut email = EmailRecord::new("abc123", "[[BODY]]", "<p>a</p><p>b</p>");
        email.compilation = Some("c1".into());
        email.updated_at = Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
        email
    }

    #[tokio::test]
    async fn copies_identity_from_source() {
        let email = email();
        let pdf = build_pdf(
            &ParagraphRenderer,
            "<p>a</p><p>b</p>",
            "email",
            &email,
            &RenderOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(pdf.model, "email");
        assert_eq!(pdf.id, "abc123");
        assert_eq!(pdf.compilation.as_deref(), Some("c1"));
        assert_eq!(pdf.model_version, email.updated_at);
        assert_eq!(pdf.page_count, 2);
        assert!(pdf.buffer.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn page_count_is_deterministic() {
        let email = email();
        let options = RenderOptions::default();
        let first = build_pdf(&ParagraphRenderer, "<p>x</p>", "email", &email, &options)
            .await
            .unwrap();
        let second = build_pdf(&ParagraphRenderer, "<p>x</p>", "email", &email, &options)
            .await
            .unwrap();
        assert_eq!(first.page_count, second.page_count);
    }

    #[tokio::test]
    async fn page_count_failure_propagates() {
        let err = build_pdf(
            &BrokenRenderer,
            "<p>x</p>",
            "email",
            &email(),
            &RenderOptions::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, EmailPdfError::PdfOps(_)));
    }
}
