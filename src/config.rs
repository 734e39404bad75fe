//! Configuration for the email PDF service.
//!
//! Everything the pipeline needs is carried in [`ServiceConfig`], built via
//! [`ServiceConfigBuilder`]. The binary maps CLI flags and environment
//! variables onto the builder; tests set only the fields they care about.
//!
//! Defaults are chosen for a local run: in-memory object storage, no database
//! URL (the in-memory email store is used), `wkhtmltopdf` from `PATH`.

use crate::error::EmailPdfError;
use pdf_ops::config::is_tex_length;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Directory the serverless runtime unpacks the function into.
pub const LAMBDA_TASK_ROOT_ENV: &str = "LAMBDA_TASK_ROOT";

/// HTML→PDF engine location.
///
/// `$LAMBDA_TASK_ROOT/bin/wkhtmltopdf` when the variable is set, otherwise
/// `wkhtmltopdf` resolved from `PATH`.
pub fn default_engine_path() -> PathBuf {
    match std::env::var_os(LAMBDA_TASK_ROOT_ENV) {
        Some(root) if !root.is_empty() => PathBuf::from(root).join("bin").join("wkhtmltopdf"),
        _ => PathBuf::from("wkhtmltopdf"),
    }
}

// ── Rendering ────────────────────────────────────────────────────────────

/// Page orientation passed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Portrait => "Portrait",
            Orientation::Landscape => "Landscape",
        }
    }
}

impl FromStr for Orientation {
    type Err = EmailPdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "portrait" => Ok(Orientation::Portrait),
            "landscape" => Ok(Orientation::Landscape),
            other => Err(EmailPdfError::InvalidConfig(format!(
                "orientation must be 'portrait' or 'landscape', got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for one HTML→PDF render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Engine executable. Default: [`default_engine_path`].
    pub engine_path: PathBuf,

    /// Named paper size, e.g. `A4`, `A5`, `Letter`. Ignored when both
    /// `page_width` and `page_height` are set. Default: `A4`.
    pub page_size: String,

    pub orientation: Orientation,

    /// Margins as lengths (`10mm`, `0.5in`). Default: `10mm` each.
    pub margin_top: String,
    pub margin_right: String,
    pub margin_bottom: String,
    pub margin_left: String,

    /// Explicit page dimensions. Both must be set to take effect.
    pub page_width: Option<String>,
    pub page_height: Option<String>,

    /// Zoom factor applied to the HTML. `None` keeps the engine default.
    pub zoom: Option<f32>,

    /// Wall-clock limit for one render. Default: 30.
    pub timeout_secs: u64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            engine_path: default_engine_path(),
            page_size: "A4".to_string(),
            orientation: Orientation::default(),
            margin_top: "10mm".to_string(),
            margin_right: "10mm".to_string(),
            margin_bottom: "10mm".to_string(),
            margin_left: "10mm".to_string(),
            page_width: None,
            page_height: None,
            zoom: None,
            timeout_secs: 30,
        }
    }
}

impl RenderOptions {
    /// Check lengths and limits before they reach the engine's argument list.
    pub fn validate(&self) -> Result<(), EmailPdfError> {
        let lengths = [
            ("margin_top", Some(&self.margin_top)),
            ("margin_right", Some(&self.margin_right)),
            ("margin_bottom", Some(&self.margin_bottom)),
            ("margin_left", Some(&self.margin_left)),
            ("page_width", self.page_width.as_ref()),
            ("page_height", self.page_height.as_ref()),
        ];
        for (name, value) in lengths {
            if let Some(value) = value {
                if !is_tex_length(value) {
                    return Err(EmailPdfError::InvalidConfig(format!(
                        "{name} must be a length like '10mm', got '{value}'"
                    )));
                }
            }
        }
        if self.page_size.trim().is_empty() {
            return Err(EmailPdfError::InvalidConfig("page_size must not be empty".into()));
        }
        if let Some(zoom) = self.zoom {
            if !(zoom > 0.0 && zoom <= 10.0) {
                return Err(EmailPdfError::InvalidConfig(format!(
                    "zoom must be in (0, 10], got {zoom}"
                )));
            }
        }
        if self.timeout_secs == 0 {
            return Err(EmailPdfError::InvalidConfig(
                "render timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(())
    }
}

// ── Object storage ───────────────────────────────────────────────────────

/// Which object store receives the uploaded PDFs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StorageConfig {
    /// Process-local store. Objects vanish when the process exits. (default)
    #[default]
    Memory,
    /// A directory on the local filesystem.
    Local { root: PathBuf },
    /// An S3 bucket. Credentials come from the standard AWS environment.
    S3 {
        bucket: String,
        region: Option<String>,
        /// Custom endpoint for S3-compatible providers.
        endpoint: Option<String>,
    },
}

// ── Service ──────────────────────────────────────────────────────────────

/// Configuration for [`crate::EmailPdfService`] and the binary.
///
/// # Example
/// ```rust
/// use email_pdf::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .public_path("public")
///     .public_base_url("https://cdn.example.com")
///     .render_timeout_secs(60)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub render: RenderOptions,

    pub storage: StorageConfig,

    /// Prefix every storage path is placed under. Default: `public`.
    pub public_path: String,

    /// Base URL objects are publicly reachable under. Default: `http://localhost`.
    pub public_base_url: String,

    /// PostgreSQL URL for the email store. `None` selects the in-memory store.
    pub database_url: Option<String>,

    /// Pool size for the PostgreSQL store. Default: 5.
    pub db_max_connections: u32,

    /// Seconds to wait for a pooled connection. Default: 10.
    pub db_timeout_secs: u64,

    /// Apply `migrations/` when the store first connects. Default: false.
    pub run_migrations: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            render: RenderOptions::default(),
            storage: StorageConfig::default(),
            public_path: "public".to_string(),
            public_base_url: "http://localhost".to_string(),
            database_url: None,
            db_max_connections: 5,
            db_timeout_secs: 10,
            run_migrations: false,
        }
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn render_options(mut self, options: RenderOptions) -> Self {
        self.config.render = options;
        self
    }

    pub fn engine_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.render.engine_path = path.into();
        self
    }

    pub fn page_size(mut self, size: impl Into<String>) -> Self {
        self.config.render.page_size = size.into();
        self
    }

    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.config.render.orientation = orientation;
        self
    }

    /// Set all four margins at once.
    pub fn margin(mut self, margin: impl Into<String>) -> Self {
        let margin = margin.into();
        let r = &mut self.config.render;
        r.margin_top = margin.clone();
        r.margin_right = margin.clone();
        r.margin_bottom = margin.clone();
        r.margin_left = margin;
        self
    }

    pub fn page_dimensions(mut self, width: impl Into<String>, height: impl Into<String>) -> Self {
        self.config.render.page_width = Some(width.into());
        self.config.render.page_height = Some(height.into());
        self
    }

    pub fn zoom(mut self, zoom: f32) -> Self {
        self.config.render.zoom = Some(zoom);
        self
    }

    pub fn render_timeout_secs(mut self, secs: u64) -> Self {
        self.config.render.timeout_secs = secs;
        self
    }

    pub fn storage(mut self, storage: StorageConfig) -> Self {
        self.config.storage = storage;
        self
    }

    pub fn public_path(mut self, path: impl Into<String>) -> Self {
        self.config.public_path = path.into();
        self
    }

    pub fn public_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.public_base_url = url.into();
        self
    }

    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.config.database_url = Some(url.into());
        self
    }

    pub fn db_max_connections(mut self, n: u32) -> Self {
        self.config.db_max_connections = n.max(1);
        self
    }

    pub fn db_timeout_secs(mut self, secs: u64) -> Self {
        self.config.db_timeout_secs = secs;
        self
    }

    pub fn run_migrations(mut self, v: bool) -> Self {
        self.config.run_migrations = v;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(mut self) -> Result<ServiceConfig, EmailPdfError> {
        self.config.render.validate()?;

        let c = &mut self.config;
        c.public_path = c.public_path.trim_matches('/').to_string();
        c.public_base_url = c.public_base_url.trim_end_matches('/').to_string();
        if c.public_base_url.is_empty() {
            return Err(EmailPdfError::InvalidConfig(
                "public_base_url must not be empty".into(),
            ));
        }
        if let StorageConfig::S3 { bucket, .. } = &c.storage {
            if bucket.is_empty() {
                return Err(EmailPdfError::InvalidConfig(
                    "S3 storage needs a bucket name".into(),
                ));
            }
        }
        if c.db_timeout_secs == 0 {
            return Err(EmailPdfError::InvalidConfig(
                "db_timeout_secs must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
