//! Concatenation through `pdftk ... cat output`.
//!
//! The two variants judge success differently and callers rely on both:
//!
//! * [`PdfTools::concat_to_file`] resolves once the tool exits, whatever the
//!   exit code. A non-zero exit is only logged.
//! * [`PdfTools::concat_to_buffer`] fails on any standard-error output and
//!   ignores the exit code.

use crate::error::PdfOpsError;
use crate::process::{run_tool, tool_name};
use crate::workdir::PdfTools;
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use tracing::{info, warn};

fn concat_args<S: AsRef<OsStr>>(inputs: &[S], output: &OsStr) -> Vec<OsString> {
    let mut args: Vec<OsString> = inputs.iter().map(|a| a.as_ref().to_owned()).collect();
    args.push("cat".into());
    args.push("output".into());
    args.push(output.to_owned());
    args
}

impl PdfTools {
    /// Concatenate `inputs` into `<work_dir>/part-<uuid>.pdf` and return its path.
    ///
    /// `inputs` are passed to `pdftk` verbatim, so they may include handle
    /// assignments such as `A=first.pdf`.
    pub async fn concat_to_file<S: AsRef<OsStr>>(
        &self,
        inputs: &[S],
    ) -> Result<PathBuf, PdfOpsError> {
        let output = self
            .ensure_work_dir()
            .await?
            .join(format!("part-{}.pdf", uuid::Uuid::new_v4().simple()));
        let program = &self.config.pdftk_path;

        info!("Concatenating {} inputs into {}", inputs.len(), output.display());
        let result = run_tool(program, &concat_args(inputs, output.as_os_str()), None).await?;

        if !result.status.success() {
            warn!(
                "{} exited with {} while writing {}: {}",
                tool_name(program),
                result.status,
                output.display(),
                result.stderr_text()
            );
        }
        Ok(output)
    }

    /// Concatenate `inputs` and return the merged PDF bytes from stdout.
    pub async fn concat_to_buffer<S: AsRef<OsStr>>(
        &self,
        inputs: &[S],
    ) -> Result<Vec<u8>, PdfOpsError> {
        let program = &self.config.pdftk_path;
        let result = run_tool(program, &concat_args(inputs, OsStr::new("-")), None).await?;

        if !result.stderr.is_empty() {
            return Err(PdfOpsError::ConcatFailed {
                stderr: result.stderr_text(),
            });
        }
        Ok(result.stdout)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::PdfOpsConfig;
    use crate::testing::write_script;
    use std::path::Path;

    fn tools_with_pdftk(dir: &Path, pdftk: PathBuf) -> PdfTools {
        PdfTools::new(PdfOpsConfig {
            work_dir: dir.join("work"),
            pdftk_path: pdftk,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn args_end_with_cat_output() {
        let args = concat_args(&["A=a.pdf", "b.pdf"], OsStr::new("-"));
        assert_eq!(args, vec!["A=a.pdf", "b.pdf", "cat", "output", "-"]);
    }

    #[tokio::test]
    async fn file_variant_resolves_despite_failure() {
        let tmp = tempfile::tempdir().unwrap();
        // `ls` on missing paths writes to stderr and exits non-zero.
        let tools = tools_with_pdftk(tmp.path(), PathBuf::from("ls"));

        let path = tools
            .concat_to_file(&["/definitely/missing.pdf"])
            .await
            .unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("part-") && name.ends_with(".pdf"), "got {name}");
        assert_eq!(path.parent(), Some(tmp.path().join("work").as_path()));
    }

    #[tokio::test]
    async fn file_variant_names_are_unique() {
        let tmp = tempfile::tempdir().unwrap();
        let script = write_script(tmp.path(), "pdftk", "exit 0");
        let tools = tools_with_pdftk(tmp.path(), script);

        let first = tools.concat_to_file(&["a.pdf"]).await.unwrap();
        let second = tools.concat_to_file(&["a.pdf"]).await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn buffer_variant_rejects_stderr() {
        let tmp = tempfile::tempdir().unwrap();
        let tools = tools_with_pdftk(tmp.path(), PathBuf::from("ls"));

        let err = tools
            .concat_to_buffer(&["/definitely/missing.pdf"])
            .await
            .unwrap_err();
        assert!(matches!(err, PdfOpsError::ConcatFailed { .. }));
    }

    #[tokio::test]
    async fn buffer_variant_ignores_exit_code() {
        let tmp = tempfile::tempdir().unwrap();
        let script = write_script(tmp.path(), "pdftk", "printf '%%PDF-merged'; exit 3");
        let tools = tools_with_pdftk(tmp.path(), script);

        let bytes = tools.concat_to_buffer(&["a.pdf", "b.pdf"]).await.unwrap();
        assert_eq!(bytes, b"%PDF-merged");
    }

    #[tokio::test]
    async fn missing_tool_is_an_error_for_both() {
        let tmp = tempfile::tempdir().unwrap();
        let tools = tools_with_pdftk(tmp.path(), PathBuf::from("/definitely/not/pdftk"));

        assert!(matches!(
            tools.concat_to_file(&["a.pdf"]).await,
            Err(PdfOpsError::ToolSpawn { .. })
        ));
        assert!(matches!(
            tools.concat_to_buffer(&["a.pdf"]).await,
            Err(PdfOpsError::ToolSpawn { .. })
        ));
    }
}
