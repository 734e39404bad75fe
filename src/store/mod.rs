//! Document store access for email records.
//!
//! Two layers:
//!
//! * [`Connector`] owns at most one live connection handle. It opens it on
//!   first use, hands out clones afterwards and, when an operation fails with
//!   a connection-class error, drops the handle, reconnects once and retries
//!   once.
//! * [`EmailStore`] is what the pipeline talks to: find by id, set the `pdf`
//!   field by id.
//!
//! Backends: [`MemoryEmailStore`] always, [`PgEmailStore`] with the
//! `postgres` feature.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::MemoryEmailStore;
#[cfg(feature = "postgres")]
pub use postgres::{PgConnect, PgEmailStore};

use crate::model::{EmailRecord, UploadResult};
use async_trait::async_trait;
use std::future::Future;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Errors raised by a document store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or the connection broke.
    #[error("Email store connection error: {0}")]
    Connection(String),

    /// The store answered but rejected the operation.
    #[error("Email store query failed: {0}")]
    Query(String),

    /// A stored document does not have the expected shape.
    #[error("Failed to decode stored email: {0}")]
    Decode(String),
}

impl StoreError {
    /// True for failures a fresh connection might fix.
    pub fn is_connection(&self) -> bool {
        matches!(self, StoreError::Connection(_))
    }
}

/// Read and update email records.
#[async_trait]
pub trait EmailStore: Send + Sync {
    /// Fetch one record by id. `Ok(None)` when it does not exist.
    async fn find_email(&self, id: &str) -> Result<Option<EmailRecord>, StoreError>;

    /// Set the record's `pdf` field and return how many records were updated.
    async fn update_pdf(&self, id: &str, pdf: &UploadResult) -> Result<u64, StoreError>;
}

/// Opens connections for a [`Connector`].
#[async_trait]
pub trait Connect: Send + Sync {
    /// Cheap-to-clone handle, e.g. a pool.
    type Handle: Clone + Send + Sync;

    async fn connect(&self) -> Result<Self::Handle, StoreError>;
}

/// Lazily opened, cached connection handle.
pub struct Connector<C: Connect> {
    connect: C,
    handle: Mutex<Option<C::Handle>>,
}

impl<C: Connect> Connector<C> {
    pub fn new(connect: C) -> Self {
        Self {
            connect,
            handle: Mutex::new(None),
        }
    }

    /// The cached handle, opening it first if needed.
    ///
    /// Concurrent first callers wait on the lock, so only one connection is
    /// ever opened. A failed open leaves nothing cached and is returned to
    /// the caller; the next call tries again.
    pub async fn handle(&self) -> Result<C::Handle, StoreError> {
        let mut cached = self.handle.lock().await;
        if let Some(handle) = cached.as_ref() {
            return Ok(handle.clone());
        }

        let handle = self.connect.connect().await?;
        info!("Connected to email store");
        *cached = Some(handle.clone());
        Ok(handle)
    }

    /// Drop the cached handle so the next call reconnects.
    pub async fn invalidate(&self) {
        self.handle.lock().await.take();
    }

    pub async fn is_connected(&self) -> bool {
        self.handle.lock().await.is_some()
    }

    /// Run `op` with the handle, reconnecting and retrying once if it fails
    /// with a connection error.
    pub async fn run<T, F, Fut>(&self, op: F) -> Result<T, StoreError>
    where
        F: Fn(C::Handle) -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let handle = self.handle().await?;
        match op(handle).await {
            Err(e) if e.is_connection() => {
                warn!("Email store connection lost ({}), reconnecting", e);
                self.invalidate().await;
                let handle = self.handle().await?;
                op(handle).await
            }
            other => other,
        }
    }
}
