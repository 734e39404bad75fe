//! Thin wrapper around `tokio::process::Command` shared by the tool helpers
//! and by callers that drive their own external PDF engines.

use crate::error::PdfOpsError;
use std::ffi::OsString;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Captured result of one tool invocation.
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }

    /// Map a non-zero exit into [`PdfOpsError::ToolFailed`].
    pub fn check(self, tool: &str) -> Result<Self, PdfOpsError> {
        if self.status.success() {
            Ok(self)
        } else {
            Err(PdfOpsError::ToolFailed {
                tool: tool.to_string(),
                status: self.status.to_string(),
                stderr: self.stderr_text(),
            })
        }
    }
}

/// Display name of a tool path, used in errors and logs.
pub fn tool_name(program: &Path) -> String {
    program
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| program.display().to_string())
}

/// Run `program` with `args`, optionally feeding `stdin`, and capture output.
///
/// The exit status is returned, not checked: callers decide whether a
/// non-zero exit is fatal.
pub async fn run_tool(
    program: &Path,
    args: &[OsString],
    stdin: Option<Vec<u8>>,
) -> Result<ToolOutput, PdfOpsError> {
    let tool = tool_name(program);
    debug!("Running {} {:?}", program.display(), args);

    let mut child = Command::new(program)
        .args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| PdfOpsError::ToolSpawn {
            tool: tool.clone(),
            source: e,
        })?;

    // Feed stdin from a separate task so a tool that fills its stdout pipe
    // before draining stdin cannot deadlock us.
    let writer = match (stdin, child.stdin.take()) {
        (Some(input), Some(mut pipe)) => Some(tokio::spawn(async move {
            pipe.write_all(&input).await?;
            pipe.shutdown().await
        })),
        _ => None,
    };

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| PdfOpsError::ToolSpawn {
            tool: tool.clone(),
            source: e,
        })?;

    if let Some(writer) = writer {
        // A tool that exits without reading all of stdin closes the pipe;
        // its exit status carries the real outcome.
        if let Ok(Err(e)) = writer.await {
            debug!("{}: stdin closed early: {}", tool, e);
        }
    }

    Ok(ToolOutput {
        status: output.status,
        stdout: output.stdout,
        stderr: output.stderr,
    })
}
