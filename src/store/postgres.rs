//! PostgreSQL-backed email store.
//!
//! Records live in the `emails` table; the last upload result is kept as
//! JSONB in the `pdf` column. See `migrations/` for the schema.

use super::{Connect, Connector, EmailStore, StoreError};
use crate::config::ServiceConfig;
use crate::error::EmailPdfError;
use crate::model::{EmailRecord, UploadResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use std::time::Duration;

/// Opens a [`PgPool`] for the [`Connector`].
#[derive(Debug, Clone)]
pub struct PgConnect {
    url: String,
    max_connections: u32,
    acquire_timeout: Duration,
    run_migrations: bool,
}

impl PgConnect {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(10),
            run_migrations: false,
        }
    }

    /// Pool settings from the service configuration. Requires `database_url`.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, EmailPdfError> {
        let url = config.database_url.clone().ok_or_else(|| {
            EmailPdfError::InvalidConfig("database_url is required for the PostgreSQL store".into())
        })?;
        Ok(Self {
            url,
            max_connections: config.db_max_connections,
            acquire_timeout: Duration::from_secs(config.db_timeout_secs),
            run_migrations: config.run_migrations,
        })
    }
}

#[async_trait]
impl Connect for PgConnect {
    type Handle = PgPool;

    async fn connect(&self) -> Result<PgPool, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(&self.url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        tracing::info!(
            max_connections = self.max_connections,
            "PostgreSQL pool connected"
        );

        if self.run_migrations {
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|e| StoreError::Query(format!("migrations failed: {e}")))?;
            tracing::info!("Database migrations applied");
        }
        Ok(pool)
    }
}

/// Sort a sqlx error into connection, decode or query failures.
pub(crate) fn classify(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StoreError::Connection(e.to_string()),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Decode(e.to_string())
        }
        other => StoreError::Query(other.to_string()),
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EmailRow {
    id: String,
    template: String,
    body: String,
    compilation: Option<String>,
    updated_at: Option<DateTime<Utc>>,
    pdf: Option<Json<UploadResult>>,
}

impl From<EmailRow> for EmailRecord {
    fn from(row: EmailRow) -> Self {
        EmailRecord {
            id: row.id,
            template: row.template,
            body: row.body,
            compilation: row.compilation,
            updated_at: row.updated_at,
            pdf: row.pdf.map(|Json(pdf)| pdf),
        }
    }
}

/// Email store backed by the `emails` table.
pub struct PgEmailStore {
    connector: Connector<PgConnect>,
}

impl PgEmailStore {
    pub fn new(connect: PgConnect) -> Self {
        Self {
            connector: Connector::new(connect),
        }
    }

    pub fn connector(&self) -> &Connector<PgConnect> {
        &self.connector
    }
}

#[async_trait]
impl EmailStore for PgEmailStore {
    async fn find_email(&self, id: &str) -> Result<Option<EmailRecord>, StoreError> {
        let row = self
            .connector
            .run(|pool| async move {
                sqlx::query_as::<_, EmailRow>(
                    "SELECT id, template, body, compilation, updated_at, pdf \
                     FROM emails WHERE id = $1",
                )
                .bind(id)
                .fetch_optional(&pool)
                .await
                .map_err(classify)
            })
            .await?;
        Ok(row.map(EmailRecord::from))
    }

    async fn update_pdf(&self, id: &str, pdf: &UploadResult) -> Result<u64, StoreError> {
        let result = self
            .connector
            .run(|pool| async move {
                sqlx::query("UPDATE emails SET pdf = $2 WHERE id = $1")
                    .bind(id)
                    .bind(Json(pdf))
                    .execute(&pool)
                    .await
                    .map_err(classify)
            })
            .await?;
        tracing::debug!(id = %id, rows = result.rows_affected(), "Updated email pdf");
        Ok(result.rows_affected())
    }
}
