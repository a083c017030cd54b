use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("storage call timed out after {0:?}")]
    Timeout(Duration),
    #[error("malformed record {key}: {reason}")]
    Codec { key: String, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub key: String,
    pub value: Value,
}

/// Key/value record store with prefix listing.
///
/// No transaction spans two keys. `create` is the only conditional
/// primitive: it must insert atomically and report whether it did.
#[rocket::async_trait]
pub trait BallotStore: Send + Sync {
    /// Write a record, replacing any existing value under `key`.
    async fn put(&self, key: &str, value: &Value) -> Result<(), StoreError>;

    /// Write a record only if `key` is absent. Returns `false` when the key
    /// already existed and nothing was written.
    async fn create(&self, key: &str, value: &Value) -> Result<bool, StoreError>;

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Every record whose key starts with `prefix`, in key order.
    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<StoredRecord>, StoreError>;

    /// Returns true if the record existed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;
}

#[rocket::async_trait]
impl<T: BallotStore + ?Sized> BallotStore for Arc<T> {
    async fn put(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        (**self).put(key, value).await
    }

    async fn create(&self, key: &str, value: &Value) -> Result<bool, StoreError> {
        (**self).create(key, value).await
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        (**self).get(key).await
    }

    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<StoredRecord>, StoreError> {
        (**self).list_by_prefix(prefix).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        (**self).delete(key).await
    }
}

/// Process-local store for tests and single-instance local runs. Records are
/// lost on restart and not shared between instances.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[rocket::async_trait]
impl BallotStore for MemoryStore {
    async fn put(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        self.records.write().await.insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn create(&self, key: &str, value: &Value) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(key) {
            return Ok(false);
        }
        records.insert(key.to_string(), value.clone());
        Ok(true)
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<StoredRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| StoredRecord { key: key.clone(), value: value.clone() })
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.records.write().await.remove(key).is_some())
    }
}
