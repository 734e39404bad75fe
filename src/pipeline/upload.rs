//! Upload a rendered PDF to object storage and describe the stored object.
//!
//! Storage layout:
//!
//! ```text
//! <public_path>/compilations/<compilation-or-own-id>/<model>-<id>.pdf
//! ```
//!
//! A compilation PDF is stored under its own id; any other PDF under its
//! parent compilation, or under its own id when it has no parent.

use crate::config::{ServiceConfig, StorageConfig};
use crate::error::EmailPdfError;
use crate::model::UploadResult;
use chrono::Utc;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{
    Attribute, AttributeValue, Attributes, GetOptions, ObjectStore, PutOptions, PutPayload,
};
use pdf_ops::{checksum, PdfObject};
use std::sync::Arc;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Model name whose PDFs are stored under their own id.
pub const COMPILATION_MODEL: &str = "compilation";

/// Headers stored with every object so browsers can range-request it.
pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Headers", "Range"),
    (
        "Access-Control-Expose-Headers",
        "Accept-Ranges, Content-Encoding, Content-Length, Content-Range",
    ),
    ("Access-Control-Allow-Origin", "*"),
];

/// `compilations/<parent-or-self>/<model>-<id>.pdf`.
pub fn storage_path(pdf: &PdfObject) -> String {
    let folder = if pdf.model == COMPILATION_MODEL {
        pdf.id.as_str()
    } else {
        pdf.compilation.as_deref().unwrap_or(pdf.id.as_str())
    };
    format!("compilations/{}/{}-{}.pdf", folder, pdf.model, pdf.id)
}

/// Sends PDFs to an [`ObjectStore`].
#[derive(Debug, Clone)]
pub struct PdfUploader {
    store: Arc<dyn ObjectStore>,
    public_path: String,
    public_base_url: String,
    /// Whether the store accepts content type and custom metadata on put.
    attributes: bool,
}

impl PdfUploader {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        public_path: impl Into<String>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            public_path: public_path.into().trim_matches('/').to_string(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            attributes: true,
        }
    }

    /// Build the store named by `config.storage`.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, EmailPdfError> {
        let (store, attributes): (Arc<dyn ObjectStore>, bool) = match &config.storage {
            StorageConfig::Memory => (Arc::new(InMemory::new()), true),
            StorageConfig::Local { root } => {
                std::fs::create_dir_all(root).map_err(|e| {
                    EmailPdfError::InvalidConfig(format!(
                        "cannot create storage root {}: {e}",
                        root.display()
                    ))
                })?;
                let store = LocalFileSystem::new_with_prefix(root)
                    .map_err(|e| EmailPdfError::InvalidConfig(e.to_string()))?;
                // The filesystem store has nowhere to keep attributes.
                (Arc::new(store), false)
            }
            StorageConfig::S3 {
                bucket,
                region,
                endpoint,
            } => {
                let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
                if let Some(region) = region {
                    builder = builder.with_region(region);
                }
                if let Some(endpoint) = endpoint {
                    builder = builder
                        .with_endpoint(endpoint)
                        .with_allow_http(endpoint.starts_with("http://"));
                }
                let store = builder
                    .build()
                    .map_err(|e| EmailPdfError::InvalidConfig(e.to_string()))?;
                (Arc::new(store), true)
            }
        };

        let mut uploader = Self::new(store, &config.public_path, &config.public_base_url);
        uploader.attributes = attributes;
        Ok(uploader)
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Storage path with the public prefix applied.
    pub fn full_path(&self, pdf: &PdfObject) -> String {
        let path = storage_path(pdf);
        if self.public_path.is_empty() {
            path
        } else {
            format!("{}/{}", self.public_path, path)
        }
    }

    fn put_attributes(&self) -> Attributes {
        let mut attributes = Attributes::new();
        if self.attributes {
            attributes.insert(Attribute::ContentType, AttributeValue::from(PDF_CONTENT_TYPE));
            for (name, value) in CORS_HEADERS {
                attributes.insert(Attribute::Metadata(name.into()), AttributeValue::from(value));
            }
        }
        attributes
    }

    /// Public URL of a stored object. Each key segment is percent-encoded so
    /// escapes already present in the key survive the trip through HTTP.
    pub fn public_url(&self, location: &Path, uploaded_at: i64) -> String {
        let key = location
            .as_ref()
            .split('/')
            .map(urlencoding::encode)
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/{}?{}", self.public_base_url, key, uploaded_at)
    }

    /// Upload `pdf`, read back the stored object's metadata and describe it.
    ///
    /// The recorded `path` is the key actually written, which differs from
    /// [`full_path`](Self::full_path) when an id holds characters the store
    /// escapes.
    pub async fn upload(&self, pdf: &PdfObject) -> Result<UploadResult, EmailPdfError> {
        let filename = pdf.filename();
        let location = Path::from(self.full_path(pdf).as_str());
        let full_path = location.as_ref().to_string();
        let size = pdf.buffer.len();
        let start = std::time::Instant::now();

        let options = PutOptions {
            attributes: self.put_attributes(),
            ..Default::default()
        };
        self.store
            .put_opts(&location, PutPayload::from(pdf.buffer.clone()), options)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    path = %full_path,
                    size_bytes = size,
                    "PDF upload failed"
                );
                EmailPdfError::UploadFailed {
                    path: full_path.clone(),
                    source: e,
                }
            })?;

        let updated_at = Utc::now();
        let uploaded_at = updated_at.timestamp_millis();

        let head = self
            .store
            .get_opts(
                &location,
                GetOptions {
                    head: true,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| EmailPdfError::MetadataFetchFailed {
                path: full_path.clone(),
                message: e.to_string(),
                source: e,
            })?;

        let content_type = head
            .attributes
            .get(&Attribute::ContentType)
            .map(|v| {
                let value: &str = v.as_ref();
                value.to_string()
            })
            .unwrap_or_else(|| PDF_CONTENT_TYPE.to_string());

        tracing::info!(
            path = %full_path,
            size_bytes = head.meta.size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "PDF uploaded"
        );

        Ok(UploadResult {
            model: pdf.model.clone(),
            id: pdf.id.clone(),
            model_version: pdf.model_version,
            extension: filename
                .rsplit_once('.')
                .map(|(_, ext)| ext.to_string())
                .unwrap_or_default(),
            filename,
            page_count: pdf.page_count,
            url: self.public_url(&location, uploaded_at),
            path: full_path,
            last_modified: head.meta.last_modified,
            content_type,
            etag: head.meta.e_tag,
            checksum: checksum(&pdf.buffer),
            size: head.meta.size,
            updated_at,
            uploaded_at,
        })
    }
}
