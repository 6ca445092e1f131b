//! LMDB-backed store.
//!
//! Uses the heed crate (Rust bindings for LMDB) to persist cache records in a
//! memory-mapped key-value file. Keys are the UTF-8 store keys, values are
//! JSON documents.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. The store uses:
//! - Read transactions for `read` and `exists`
//! - Write transactions for `write`, `delete` and `clear`
//! - One write transaction for both records in `write_pair` and `delete_pair`,
//!   so a value and its policy are never committed separately

use std::path::Path;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use diskcache_core::{DiskCacheError, DiskCacheResult, StoreConfig, StoreError, StoreResult};
use heed::types::{Bytes, Str};
use heed::{Database, Env, EnvOpenOptions};
use serde::{de::DeserializeOwned, Serialize};

use super::CacheStore;
use crate::stats::CacheStats;

/// Error type for LMDB environment operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbStoreError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbStoreError> for StoreError {
    fn from(e: LmdbStoreError) -> Self {
        StoreError::Transaction {
            reason: e.to_string(),
        }
    }
}

impl From<LmdbStoreError> for DiskCacheError {
    fn from(e: LmdbStoreError) -> Self {
        DiskCacheError::Store(e.into())
    }
}

/// Store persisting records in an LMDB environment.
///
/// # Example
///
/// ```ignore
/// use diskcache_storage::{CacheStore, LmdbStore};
///
/// let store = LmdbStore::new("/tmp/cache", 16)?;
/// store.write("user42", &profile).await?;
/// let profile: Profile = store.read("user42").await?;
/// ```
pub struct LmdbStore {
    /// The LMDB environment.
    env: Env,
    /// The main database (single unnamed database).
    db: Database<Str, Bytes>,
    /// Read statistics.
    stats: Arc<RwLock<CacheStats>>,
}

impl LmdbStore {
    /// Create a new LMDB store.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - LMDB environment cannot be opened
    /// - Database cannot be created
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbStoreError> {
        Self::open_env(
            path.as_ref(),
            &StoreConfig::new(path.as_ref()).with_max_size_mb(max_size_mb),
        )
    }

    /// Open a store described by a validated [`StoreConfig`].
    pub fn open(config: &StoreConfig) -> DiskCacheResult<Self> {
        config.validate()?;
        Ok(Self::open_env(&config.path, config)?)
    }

    fn open_env(path: &Path, config: &StoreConfig) -> Result<Self, LmdbStoreError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment is opened once per store and the files are
        // not modified by anything other than LMDB itself.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(config.map_size_bytes())
                .max_readers(config.max_readers)
                .max_dbs(1)
                .open(path)
        }
        .map_err(|e| LmdbStoreError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let db: Database<Str, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        tracing::debug!(path = %path.display(), max_size_mb = config.max_size_mb, "Opened LMDB store");

        Ok(Self {
            env,
            db,
            stats: Arc::new(RwLock::new(CacheStats::default())),
        })
    }

    fn record_hit(&self) {
        if let Ok(mut stats) = self.stats.write() {
            stats.hits += 1;
        }
    }

    fn record_miss(&self) {
        if let Ok(mut stats) = self.stats.write() {
            stats.misses += 1;
        }
    }

    fn record_invalidation(&self) {
        if let Ok(mut stats) = self.stats.write() {
            stats.invalidations += 1;
        }
    }

    /// Read statistics, with the current record count.
    ///
    /// `invalidations` counts `delete_pair` calls that removed at least one
    /// record.
    pub fn stats(&self) -> StoreResult<CacheStats> {
        let rtxn = self.env.read_txn().map_err(transaction)?;
        let entry_count = self.db.len(&rtxn).map_err(transaction)?;

        let mut stats = self
            .stats
            .read()
            .map(|s| s.clone())
            .map_err(|_| StoreError::LockPoisoned)?;
        stats.entry_count = entry_count;
        Ok(stats)
    }

    fn encode<T: Serialize>(key: &str, value: &T) -> StoreResult<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| StoreError::serialization(key, e))
    }
}

fn transaction(e: heed::Error) -> StoreError {
    StoreError::Transaction {
        reason: e.to_string(),
    }
}

#[async_trait]
impl CacheStore for LmdbStore {
    async fn read<T>(&self, key: &str) -> StoreResult<T>
    where
        T: DeserializeOwned + Send,
    {
        let rtxn = self.env.read_txn().map_err(transaction)?;

        match self.db.get(&rtxn, key) {
            Ok(Some(bytes)) => {
                self.record_hit();
                serde_json::from_slice(bytes).map_err(|e| StoreError::serialization(key, e))
            }
            Ok(None) => {
                self.record_miss();
                Err(StoreError::not_found(key))
            }
            Err(e) => {
                self.record_miss();
                Err(StoreError::io(key, e))
            }
        }
    }

    async fn write<T>(&self, key: &str, value: &T) -> StoreResult<()>
    where
        T: Serialize + Sync,
    {
        let bytes = Self::encode(key, value)?;

        let mut wtxn = self.env.write_txn().map_err(transaction)?;
        self.db
            .put(&mut wtxn, key, &bytes)
            .map_err(|e| StoreError::io(key, e))?;
        wtxn.commit().map_err(transaction)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut wtxn = self.env.write_txn().map_err(transaction)?;
        self.db
            .delete(&mut wtxn, key)
            .map_err(|e| StoreError::io(key, e))?;
        wtxn.commit().map_err(transaction)
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let rtxn = self.env.read_txn().map_err(transaction)?;
        self.db
            .get(&rtxn, key)
            .map(|found| found.is_some())
            .map_err(|e| StoreError::io(key, e))
    }

    async fn clear(&self) -> StoreResult<u64> {
        let mut wtxn = self.env.write_txn().map_err(transaction)?;
        let removed = self.db.len(&wtxn).map_err(transaction)?;
        self.db.clear(&mut wtxn).map_err(transaction)?;
        wtxn.commit().map_err(transaction)?;
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
        let value_bytes = Self::encode(value_key, value)?;
        let policy_bytes = Self::encode(policy_key, policy)?;

        let mut wtxn = self.env.write_txn().map_err(transaction)?;
        self.db
            .put(&mut wtxn, value_key, &value_bytes)
            .map_err(|e| StoreError::io(value_key, e))?;
        self.db
            .put(&mut wtxn, policy_key, &policy_bytes)
            .map_err(|e| StoreError::io(policy_key, e))?;
        wtxn.commit().map_err(transaction)
    }

    async fn delete_pair(&self, first: &str, second: &str) -> StoreResult<()> {
        let mut wtxn = self.env.write_txn().map_err(transaction)?;
        let first_removed = self
            .db
            .delete(&mut wtxn, first)
            .map_err(|e| StoreError::io(first, e))?;
        let second_removed = self
            .db
            .delete(&mut wtxn, second)
            .map_err(|e| StoreError::io(second, e))?;
        wtxn.commit().map_err(transaction)?;

        if first_removed || second_removed {
            self.record_invalidation();
        }
        Ok(())
    }
}
