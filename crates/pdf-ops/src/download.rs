//! Download a previously uploaded PDF into the work directory.
//!
//! When a file with the expected name already exists and its checksum matches
//! the remote one, no request is made at all. The body is streamed into
//! `<filename>.part` and only renamed into place once it is complete, so a
//! failed download never leaves a truncated PDF under the final name.

use crate::document::RemotePdf;
use crate::error::PdfOpsError;
use crate::workdir::PdfTools;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use futures::StreamExt;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Progress callback: `(bytes_received, total_bytes_if_known)`.
pub type DownloadProgress = dyn Fn(u64, Option<u64>) + Send + Sync;

/// Base64-encoded SHA-256 digest of `bytes`.
///
/// The same encoding is stored on upload results, so a local file can be
/// compared with its remote copy without fetching it.
pub fn checksum(bytes: &[u8]) -> String {
    STANDARD.encode(Sha256::digest(bytes))
}

async fn local_checksum(path: &Path) -> Option<String> {
    let bytes = tokio::fs::read(path).await.ok()?;
    Some(checksum(&bytes))
}

impl PdfTools {
    /// Fetch `remote` to `<work_dir>/<filename>` unless an identical copy is
    /// already there.
    pub async fn download_pdf(
        &self,
        remote: &RemotePdf,
        progress: Option<&DownloadProgress>,
    ) -> Result<PathBuf, PdfOpsError> {
        if remote.url.is_empty() {
            return Err(PdfOpsError::MissingUrl {
                filename: remote.filename.clone(),
            });
        }

        let target = self.work_path(&remote.filename)?;
        self.ensure_work_dir().await?;

        if let Some(expected) = &remote.checksum {
            if local_checksum(&target).await.as_deref() == Some(expected.as_str()) {
                debug!("Checksum match for {}, skipping download", target.display());
                return Ok(target);
            }
        }

        info!("Downloading {} → {}", remote.url, target.display());
        let partial = self.work_path(&format!("{}.part", remote.filename))?;
        if let Err(e) = self.fetch_to(&remote.url, &partial, progress).await {
            if let Err(rm) = tokio::fs::remove_file(&partial).await {
                if rm.kind() != std::io::ErrorKind::NotFound {
                    warn!("Could not remove {}: {}", partial.display(), rm);
                }
            }
            return Err(e);
        }
        tokio::fs::rename(&partial, &target)
            .await
            .map_err(|e| PdfOpsError::io(&target, e))?;
        Ok(target)
    }

    async fn fetch_to(
        &self,
        url: &str,
        target: &Path,
        progress: Option<&DownloadProgress>,
    ) -> Result<(), PdfOpsError> {
        let secs = self.config.download_timeout_secs;
        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                PdfOpsError::DownloadTimeout {
                    url: url.to_string(),
                    secs,
                }
            } else {
                PdfOpsError::DownloadFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(secs))
            .build()
            .map_err(map_err)?;

        let response = client.get(url).send().await.map_err(map_err)?;
        if !response.status().is_success() {
            return Err(PdfOpsError::DownloadFailed {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let total = response.content_length();
        let mut file = tokio::fs::File::create(target)
            .await
            .map_err(|e| PdfOpsError::io(target, e))?;
        let mut received = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_err)?;
            file.write_all(&chunk)
                .await
                .map_err(|e| PdfOpsError::io(target, e))?;
            received += chunk.len() as u64;
            if let Some(report) = progress {
                report(received, total);
            }
        }
        file.flush().await.map_err(|e| PdfOpsError::io(target, e))?;

        debug!("Downloaded {} bytes to {}", received, target.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PdfOpsConfig;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    fn tools_in(dir: &Path) -> PdfTools {
        PdfTools::new(PdfOpsConfig {
            work_dir: dir.join("work"),
            download_timeout_secs: 5,
            ..Default::default()
        })
        .unwrap()
    }

    /// Serve `body` once over plain HTTP/1.1 and return the URL.
    async fn serve_once(status: &'static str, body: &'static [u8]) -> String {
        serve_declaring(status, body.len(), body).await
    }

    /// Like [`serve_once`] but announces `content_length` bytes, then closes
    /// after sending `body`.
    async fn serve_declaring(
        status: &'static str,
        content_length: usize,
        body: &'static [u8],
    ) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let head = format!(
                "HTTP/1.1 {status}\r\nContent-Length: {content_length}\r\nConnection: close\r\n\r\n"
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(body).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}/compilations/c1/email-abc123.pdf")
    }

    #[test]
    fn checksum_is_base64_sha256() {
        // sha256("") in base64
        assert_eq!(checksum(b""), "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=");
    }

    #[tokio::test]
    async fn missing_url_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let remote = RemotePdf {
            url: String::new(),
            checksum: None,
            filename: "email-abc123.pdf".into(),
        };
        let err = tools_in(tmp.path())
            .download_pdf(&remote, None)
            .await
            .unwrap_err();
        assert!(matches!(err, PdfOpsError::MissingUrl { .. }));
    }

    #[tokio::test]
    async fn matching_checksum_skips_network() {
        let tmp = tempfile::tempdir().unwrap();
        let tools = tools_in(tmp.path());
        std::fs::create_dir_all(tools.work_dir()).unwrap();
        let existing = tools.work_dir().join("email-abc123.pdf");
        std::fs::write(&existing, b"%PDF-cached").unwrap();

        // Port 9 (discard) is not listening; any request would fail.
        let remote = RemotePdf {
            url: "http://127.0.0.1:9/email-abc123.pdf".into(),
            checksum: Some(checksum(b"%PDF-cached")),
            filename: "email-abc123.pdf".into(),
        };
        let path = tools.download_pdf(&remote, None).await.unwrap();
        assert_eq!(path, existing);
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-cached");
    }

    #[tokio::test]
    async fn stale_copy_is_replaced() {
        let tmp = tempfile::tempdir().unwrap();
        let tools = tools_in(tmp.path());
        std::fs::create_dir_all(tools.work_dir()).unwrap();
        std::fs::write(tools.work_dir().join("email-abc123.pdf"), b"%PDF-stale").unwrap();

        let remote = RemotePdf {
            url: serve_once("200 OK", b"%PDF-fresh").await,
            checksum: Some(checksum(b"%PDF-fresh")),
            filename: "email-abc123.pdf".into(),
        };

        let seen = Arc::new(AtomicU64::new(0));
        let seen_cb = Arc::clone(&seen);
        let report: &DownloadProgress = &move |received: u64, _total: Option<u64>| {
            seen_cb.store(received, Ordering::SeqCst);
        };

        let path = tools.download_pdf(&remote, Some(report)).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-fresh");
        assert_eq!(seen.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn truncated_body_fails_and_keeps_previous_copy() {
        let tmp = tempfile::tempdir().unwrap();
        let tools = tools_in(tmp.path());
        std::fs::create_dir_all(tools.work_dir()).unwrap();
        let target = tools.work_dir().join("email-abc123.pdf");
        std::fs::write(&target, b"%PDF-stale").unwrap();

        let remote = RemotePdf {
            url: serve_declaring("200 OK", 100, b"%PDF-part").await,
            checksum: Some(checksum(b"%PDF-fresh")),
            filename: "email-abc123.pdf".into(),
        };
        let err = tools.download_pdf(&remote, None).await.unwrap_err();

        assert!(matches!(err, PdfOpsError::DownloadFailed { .. }), "got: {err:?}");
        assert_eq!(std::fs::read(&target).unwrap(), b"%PDF-stale");
        assert!(!tools.work_dir().join("email-abc123.pdf.part").exists());
    }

    #[tokio::test]
    async fn truncated_body_leaves_no_file_behind() {
        let tmp = tempfile::tempdir().unwrap();
        let tools = tools_in(tmp.path());
        let remote = RemotePdf {
            url: serve_declaring("200 OK", 100, b"%PDF-part").await,
            checksum: None,
            filename: "email-abc123.pdf".into(),
        };

        assert!(tools.download_pdf(&remote, None).await.is_err());
        let leftovers: Vec<_> = std::fs::read_dir(tools.work_dir()).unwrap().collect();
        assert!(leftovers.is_empty(), "left behind: {leftovers:?}");
    }

    #[tokio::test]
    async fn filename_outside_work_dir_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let tools = tools_in(tmp.path());
        let outside = tmp.path().join("outside.pdf");
        std::fs::write(&outside, b"%PDF-cached").unwrap();

        let remote = RemotePdf {
            url: "http://127.0.0.1:9/outside.pdf".into(),
            checksum: Some(checksum(b"%PDF-cached")),
            filename: outside.display().to_string(),
        };
        let err = tools.download_pdf(&remote, None).await.unwrap_err();

        assert!(matches!(err, PdfOpsError::InvalidFileName { .. }));
    }

    #[tokio::test]
    async fn http_error_status_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let remote = RemotePdf {
            url: serve_once("404 Not Found", b"").await,
            checksum: None,
            filename: "email-abc123.pdf".into(),
        };
        let err = tools_in(tmp.path())
            .download_pdf(&remote, None)
            .await
            .unwrap_err();
        match err {
            PdfOpsError::DownloadFailed { reason, .. } => assert!(reason.contains("404")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
