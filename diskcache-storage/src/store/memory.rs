//! In-memory store.
//!
//! Records are kept as JSON documents so that type mismatches between a write
//! and a later read surface as serialization errors, the same way they would
//! on disk.

use std::collections::HashMap;

use async_trait::async_trait;
use diskcache_core::{StoreError, StoreResult};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use super::CacheStore;

/// Store backed by a `HashMap` behind an async lock.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<String, Value>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently stored.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Check if the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// All stored keys, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.records.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl CacheStore for InMemoryStore {
    async fn read<T>(&self, key: &str) -> StoreResult<T>
    where
        T: DeserializeOwned + Send,
    {
        let document = self
            .records
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::not_found(key))?;

        serde_json::from_value(document).map_err(|e| StoreError::serialization(key, e))
    }

    async fn write<T>(&self, key: &str, value: &T) -> StoreResult<()>
    where
        T: Serialize + Sync,
    {
        let document = serde_json::to_value(value).map_err(|e| StoreError::serialization(key, e))?;
        self.records.write().await.insert(key.to_string(), document);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.records.write().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.records.read().await.contains_key(key))
    }

    async fn clear(&self) -> StoreResult<u64> {
        let mut records = self.records.write().await;
        let removed = records.len() as u64;
        records.clear();
        Ok(removed)
    }

    async fn write_pair<V, P>(
        &self,
        value_key: &str,
        value: &V,
        policy_key: &str,
        policy: &P,
    ) -> StoreResult<()>
    where
        V: Serialize + Sync,
        P: Serialize + Sync,
    {
        let value_doc =
            serde_json::to_value(value).map_err(|e| StoreError::serialization(value_key, e))?;
        let policy_doc =
            serde_json::to_value(policy).map_err(|e| StoreError::serialization(policy_key, e))?;

        let mut records = self.records.write().await;
        records.insert(value_key.to_string(), value_doc);
        records.insert(policy_key.to_string(), policy_doc);
        Ok(())
    }
}
