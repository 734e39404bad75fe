//! The email PDF orchestrator and its HTTP-style entry point.
//!
//! ```text
//! ApiRequest{pathParameters.id}
//!   │
//!   ├─ find_email      (not found → 404)
//!   ├─ email_html      (template with the body substituted)
//!   ├─ build_pdf       (model "email")
//!   ├─ upload
//!   ├─ update_pdf      (must touch exactly one record → else 409)
//!   └─ find_email      (refetch)
//!   ▼
//! ApiResponse{200, JSON of the updated record}
//! ```
//!
//! Steps run strictly one after another; a failure at any step stops the
//! chain and becomes an error response.

use crate::config::{RenderOptions, ServiceConfig};
use crate::error::EmailPdfError;
use crate::model::EmailRecord;
use crate::pipeline::{build_pdf, email_html, HtmlRenderer, PdfUploader, ProcessRenderer};
use crate::store::{EmailStore, MemoryEmailStore};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{error, info};

/// Model name recorded on email PDFs.
pub const EMAIL_MODEL: &str = "email";

/// Serverless proxy event. Only the `id` path parameter is read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRequest {
    #[serde(default)]
    pub path_parameters: Option<HashMap<String, String>>,
}

impl ApiRequest {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            path_parameters: Some(HashMap::from([("id".to_string(), id.into())])),
        }
    }

    /// The trimmed, non-empty `id` path parameter.
    pub fn id(&self) -> Result<&str, EmailPdfError> {
        self.path_parameters
            .as_ref()
            .and_then(|params| params.get("id"))
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| EmailPdfError::InvalidRequest("missing path parameter 'id'".into()))
    }
}

/// Serverless proxy response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl ApiResponse {
    fn json(status_code: u16, body: String) -> Self {
        let headers = BTreeMap::from([
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Access-Control-Allow-Origin".to_string(), "*".to_string()),
        ]);
        Self {
            status_code,
            headers,
            body,
        }
    }

    pub fn from_error(err: &EmailPdfError) -> Self {
        let body = serde_json::to_string(&err.to_response_body()).unwrap_or_else(|_| {
            format!(r#"{{"error":"internal error","code":"{}"}}"#, err.code())
        });
        Self::json(err.status_code(), body)
    }
}

/// Fetch → render → upload → persist → refetch for one email.
pub struct EmailPdfService {
    store: Arc<dyn EmailStore>,
    renderer: Arc<dyn HtmlRenderer>,
    uploader: PdfUploader,
    render_options: RenderOptions,
}

impl EmailPdfService {
    pub fn new(
        store: Arc<dyn EmailStore>,
        renderer: Arc<dyn HtmlRenderer>,
        uploader: PdfUploader,
        render_options: RenderOptions,
    ) -> Self {
        Self {
            store,
            renderer,
            uploader,
            render_options,
        }
    }

    /// Wire up the configured store, the process renderer and the uploader.
    ///
    /// With a `database_url` the PostgreSQL store is used (it connects on
    /// first use); without one an empty in-memory store.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, EmailPdfError> {
        let store: Arc<dyn EmailStore> = match &config.database_url {
            #[cfg(feature = "postgres")]
            Some(_) => Arc::new(crate::store::PgEmailStore::new(
                crate::store::PgConnect::from_config(config)?,
            )),
            #[cfg(not(feature = "postgres"))]
            Some(_) => {
                return Err(EmailPdfError::InvalidConfig(
                    "database_url is set but the `postgres` feature is disabled".into(),
                ))
            }
            None => Arc::new(MemoryEmailStore::new()),
        };

        Ok(Self::new(
            store,
            Arc::new(ProcessRenderer::new()),
            PdfUploader::from_config(config)?,
            config.render.clone(),
        ))
    }

    pub fn store(&self) -> &Arc<dyn EmailStore> {
        &self.store
    }

    pub fn uploader(&self) -> &PdfUploader {
        &self.uploader
    }

    /// Fetch an email, failing with [`EmailPdfError::EmailNotFound`] when absent.
    pub async fn get_email(&self, id: &str) -> Result<EmailRecord, EmailPdfError> {
        self.store
            .find_email(id)
            .await?
            .ok_or_else(|| EmailPdfError::EmailNotFound { id: id.to_string() })
    }

    /// Render, upload and record the PDF for email `id`; return the updated record.
    pub async fn render_email_pdf(&self, id: &str) -> Result<EmailRecord, EmailPdfError> {
        let email = self.get_email(id).await?;

        info!("Building email {} pdf", email.id);
        let html = email_html(&email);
        let pdf = build_pdf(
            self.renderer.as_ref(),
            &html,
            EMAIL_MODEL,
            &email,
            &self.render_options,
        )
        .await?;

        info!("Uploading email {} pdf", email.id);
        let result = self.uploader.upload(&pdf).await?;

        let updated = self.store.update_pdf(&email.id, &result).await?;
        if updated != 1 {
            return Err(EmailPdfError::UpdateCountMismatch {
                id: email.id,
                updated,
            });
        }

        self.get_email(id).await
    }

    /// Entry point for the serverless trigger. Never fails: errors become
    /// JSON error responses.
    pub async fn handle(&self, request: &ApiRequest) -> ApiResponse {
        let outcome = match request.id() {
            Ok(id) => self.render_email_pdf(id).await,
            Err(e) => Err(e),
        };

        match outcome.and_then(|email| serde_json::to_string(&email).map_err(Into::into)) {
            Ok(body) => ApiResponse::json(200, body),
            Err(e) => {
                error!(code = e.code(), status = e.status_code(), "Email PDF failed: {}", e);
                ApiResponse::from_error(&e)
            }
        }
    }
}
