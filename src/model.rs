//! Records stored in the document store.
//!
//! JSON field names follow the stored documents: camelCase, with the identity
//! fields keeping their leading underscore (`_id`, `_compilation`).

use chrono::{DateTime, Utc};
use pdf_ops::RemotePdf;
use serde::{Deserialize, Serialize};

/// Placeholder in [`EmailRecord::template`] that receives the email body.
pub const BODY_PLACEHOLDER: &str = "[[BODY]]";

/// One email and its rendering state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub template: String,
    pub body: String,
    #[serde(
        rename = "_compilation",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub compilation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Result of the last successful upload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf: Option<UploadResult>,
}

impl EmailRecord {
    pub fn new(id: impl Into<String>, template: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            template: template.into(),
            body: body.into(),
            compilation: None,
            updated_at: None,
            pdf: None,
        }
    }
}

/// Metadata describing an uploaded PDF, persisted on the record's `pdf` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub model: String,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub model_version: Option<DateTime<Utc>>,
    pub filename: String,
    pub page_count: u32,
    /// Public URL with a cache-busting `?<uploadedAt>` query.
    pub url: String,
    /// Full storage path, public prefix included.
    pub path: String,
    pub extension: String,
    pub last_modified: DateTime<Utc>,
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub etag: Option<String>,
    /// Base64 SHA-256 of the uploaded bytes.
    pub checksum: String,
    pub size: u64,
    pub updated_at: DateTime<Utc>,
    /// Epoch milliseconds.
    pub uploaded_at: i64,
}

impl From<&UploadResult> for RemotePdf {
    fn from(result: &UploadResult) -> Self {
        RemotePdf {
            url: result.url.clone(),
            checksum: Some(result.checksum.clone()),
            filename: result.filename.clone(),
        }
    }
}
