//! Process-local email store.

use super::{EmailStore, StoreError};
use crate::model::{EmailRecord, UploadResult};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Email records held in a map. Used by tests and local runs without a
/// database.
#[derive(Debug, Default)]
pub struct MemoryEmailStore {
    records: RwLock<HashMap<String, EmailRecord>>,
}

impl MemoryEmailStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = EmailRecord>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().map(|r| (r.id.clone(), r)).collect()),
        }
    }

    /// Insert or replace a record.
    pub async fn insert(&self, record: EmailRecord) {
        self.records.write().await.insert(record.id.clone(), record);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl EmailStore for MemoryEmailStore {
    async fn find_email(&self, id: &str) -> Result<Option<EmailRecord>, StoreError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn update_pdf(&self, id: &str, pdf: &UploadResult) -> Result<u64, StoreError> {
        match self.records.write().await.get_mut(id) {
            Some(record) => {
                record.pdf = Some(pdf.clone());
                Ok(1)
            }
            None => Ok(0),
        }
    }
}
