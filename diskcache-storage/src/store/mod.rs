//! Store adapters.
//!
//! The caching pipeline talks to persistence only through [`CacheStore`]:
//! string keys, serde-serializable values, async and independently failable
//! operations. Two adapters ship with the crate:
//!
//! - [`InMemoryStore`] for tests and ephemeral caches
//! - [`LmdbStore`] for disk persistence through LMDB

pub mod lmdb;
pub mod memory;

pub use lmdb::{LmdbStore, LmdbStoreError};
pub use memory::InMemoryStore;

use async_trait::async_trait;
use diskcache_core::StoreResult;
use futures_util::future::join;
use serde::{de::DeserializeOwned, Serialize};

/// Key-value store the caching pipeline persists into.
///
/// Implementations must be safe to share between tasks. No operation is
/// retried by the caller; deadlines, if any, are the store's business.
///
/// # Contract
///
/// - `read` of a missing key fails with `StoreError::NotFound`
/// - `delete` of a missing key succeeds
/// - `write` replaces any existing record
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read and deserialize the record stored under `key`.
    async fn read<T>(&self, key: &str) -> StoreResult<T>
    where
        T: DeserializeOwned + Send;

    /// Serialize `value` and store it under `key`.
    async fn write<T>(&self, key: &str, value: &T) -> StoreResult<()>
    where
        T: Serialize + Sync;

    /// Remove the record under `key`. Idempotent.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Check whether a record exists under `key`.
    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Remove every record, returning how many were removed.
    async fn clear(&self) -> StoreResult<u64>;

    /// Write two records that belong together.
    ///
    /// The default issues both writes concurrently and waits for both,
    /// reporting the first failure. A crash in between can leave one record
    /// without the other. Stores with transactions should override this to
    /// commit both records at once.
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
        let (value_written, policy_written) =
            join(self.write(value_key, value), self.write(policy_key, policy)).await;
        value_written.and(policy_written)
    }

    /// Delete two records that belong together.
    ///
    /// Both deletes are issued concurrently and both are awaited even if one
    /// fails; the first failure is returned.
    async fn delete_pair(&self, first: &str, second: &str) -> StoreResult<()> {
        let (first_deleted, second_deleted) = join(self.delete(first), self.delete(second)).await;
        first_deleted.and(second_deleted)
    }
}
