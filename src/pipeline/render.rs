//! HTML → PDF rendering through an external engine.
//!
//! [`ProcessRenderer`] drives a `wkhtmltopdf`-compatible executable: the HTML
//! is written to the engine's stdin and the PDF is read from its stdout, so no
//! temporary files are involved. Options become a structured argument list;
//! nothing passes through a shell.
//!
//! ```text
//! wkhtmltopdf --quiet --encoding utf-8 --page-size A4 --orientation Portrait
//!             --margin-top 10mm ... - -
//! ```

use crate::config::RenderOptions;
use crate::error::EmailPdfError;
use async_trait::async_trait;
use pdf_ops::process::run_tool;
use pdf_ops::PdfOpsError;
use std::ffi::OsString;
use std::time::Duration;
use tracing::{debug, info};

/// Turns HTML into PDF bytes.
#[async_trait]
pub trait HtmlRenderer: Send + Sync {
    async fn render(&self, html: &str, options: &RenderOptions) -> Result<Vec<u8>, EmailPdfError>;
}

/// Renderer that spawns the engine named by [`RenderOptions::engine_path`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRenderer;

impl ProcessRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Engine argument vector for `options`, reading stdin and writing stdout.
    pub fn args(options: &RenderOptions) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["--quiet".into(), "--encoding".into(), "utf-8".into()];

        match (&options.page_width, &options.page_height) {
            (Some(width), Some(height)) => {
                args.extend(["--page-width".into(), width.into()]);
                args.extend(["--page-height".into(), height.into()]);
            }
            _ => args.extend(["--page-size".into(), options.page_size.as_str().into()]),
        }
        args.extend(["--orientation".into(), options.orientation.as_str().into()]);

        for (flag, value) in [
            ("--margin-top", &options.margin_top),
            ("--margin-right", &options.margin_right),
            ("--margin-bottom", &options.margin_bottom),
            ("--margin-left", &options.margin_left),
        ] {
            args.extend([flag.into(), value.into()]);
        }

        if let Some(zoom) = options.zoom {
            args.extend(["--zoom".into(), zoom.to_string().into()]);
        }

        args.extend(["-".into(), "-".into()]);
        args
    }
}

#[async_trait]
impl HtmlRenderer for ProcessRenderer {
    async fn render(&self, html: &str, options: &RenderOptions) -> Result<Vec<u8>, EmailPdfError> {
        let engine = options.engine_path.display().to_string();
        let failed = |reason: String| EmailPdfError::RenderFailed {
            engine: engine.clone(),
            reason,
        };

        info!("Rendering {} bytes of HTML with {}", html.len(), engine);
        // Dropping the run on timeout kills the engine.
        let output = tokio::time::timeout(
            Duration::from_secs(options.timeout_secs),
            run_tool(
                &options.engine_path,
                &Self::args(options),
                Some(html.as_bytes().to_vec()),
            ),
        )
        .await
        .map_err(|_| EmailPdfError::RenderTimeout {
            secs: options.timeout_secs,
        })?
        .map_err(|e| match e {
            PdfOpsError::ToolSpawn { source, .. } => {
                failed(format!("could not start engine: {source}"))
            }
            other => failed(other.to_string()),
        })?;

        if !output.status.success() {
            return Err(failed(format!(
                "exit {}: {}",
                output.status,
                output.stderr_text()
            )));
        }
        if !output.stdout.starts_with(b"%PDF") {
            return Err(EmailPdfError::NotAPdf {
                magic: output.stdout.iter().take(8).copied().collect(),
            });
        }

        debug!("Engine produced {} bytes", output.stdout.len());
        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Orientation;

    fn args_of(options: &RenderOptions) -> Vec<String> {
        ProcessRenderer::args(options)
            .iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn default_args_use_page_size() {
        let args = args_of(&RenderOptions::default());
        assert_eq!(&args[..3], &["--quiet", "--encoding", "utf-8"]);
        assert!(args.windows(2).any(|w| w == ["--page-size", "A4"]));
        assert!(args.windows(2).any(|w| w == ["--orientation", "Portrait"]));
        assert!(args.windows(2).any(|w| w == ["--margin-left", "10mm"]));
        assert!(!args.contains(&"--zoom".to_string()));
        assert_eq!(&args[args.len() - 2..], &["-", "-"]);
    }

    #[test]
    fn explicit_dimensions_replace_page_size() {
        let options = RenderOptions {
            page_width: Some("148mm".into()),
            page_height: Some("210mm".into()),
            orientation: Orientation::Landscape,
            zoom: Some(1.5),
            ..Default::default()
        };
        let args = args_of(&options);
        assert!(!args.contains(&"--page-size".to_string()));
        assert!(args.windows(2).any(|w| w == ["--page-width", "148mm"]));
        assert!(args.windows(2).any(|w| w == ["--orientation", "Landscape"]));
        assert!(args.windows(2).any(|w| w == ["--zoom", "1.5"]));
    }

    #[cfg(unix)]
    mod engine {
        use super::*;
        use pdf_ops::testing::write_script;

        fn options_for(engine: std::path::PathBuf) -> RenderOptions {
            RenderOptions {
                engine_path: engine,
                timeout_secs: 5,
                ..Default::default()
            }
        }

        #[tokio::test]
        async fn returns_engine_stdout() {
            let tmp = tempfile::tempdir().unwrap();
            let html_copy = tmp.path().join("seen.html");
            let script = write_script(
                tmp.path(),
                "engine",
                &format!("cat > \"{}\"; printf '%%PDF-1.4 fake'", html_copy.display()),
            );

            let pdf = ProcessRenderer
                .render("Hello World", &options_for(script))
                .await
                .unwrap();

            assert_eq!(pdf, b"%PDF-1.4 fake");
            assert_eq!(std::fs::read_to_string(html_copy).unwrap(), "Hello World");
        }

        #[tokio::test]
        async fn non_pdf_output_is_rejected() {
            let tmp = tempfile::tempdir().unwrap();
            let script = write_script(
                tmp.path(),
                "engine",
                "cat > /dev/null; printf 'not a pdf'",
            );
            let err = ProcessRenderer
                .render("<html/>", &options_for(script))
                .await
                .unwrap_err();
            match err {
                EmailPdfError::NotAPdf { magic } => assert_eq!(magic, b"not a pd"),
                other => panic!("unexpected error: {other:?}"),
            }
        }

        #[tokio::test]
        async fn failing_engine_reports_stderr() {
            let tmp = tempfile::tempdir().unwrap();
            let script = write_script(
                tmp.path(),
                "engine",
                "cat > /dev/null; echo 'bad html' >&2; exit 2",
            );
            let err = ProcessRenderer
                .render("<html/>", &options_for(script))
                .await
                .unwrap_err();
            match err {
                EmailPdfError::RenderFailed { reason, .. } => assert!(reason.contains("bad html")),
                other => panic!("unexpected error: {other:?}"),
            }
        }

        #[tokio::test]
        async fn missing_engine_is_render_failure() {
            let options = options_for("/definitely/not/wkhtmltopdf".into());
            let err = ProcessRenderer.render("<html/>", &options).await.unwrap_err();
            assert!(matches!(err, EmailPdfError::RenderFailed { .. }));
        }

        #[tokio::test]
        async fn slow_engine_times_out() {
            let tmp = tempfile::tempdir().unwrap();
            let script = write_script(tmp.path(), "engine", "sleep 5");
            let options = RenderOptions {
                timeout_secs: 1,
                ..options_for(script)
            };
            let err = ProcessRenderer.render("<html/>", &options).await.unwrap_err();
            assert!(matches!(err, EmailPdfError::RenderTimeout { secs: 1 }));
        }
    }
}
