//! The disk-backed caching pipeline.
//!
//! Every fetch runs two stages, strictly one after the other:
//!
//! 1. **Cache read.** Read the policy record, validate it, then read the
//!    value record. A valid pair is emitted as `Cached { from_disk: true }`.
//!    Anything else (no policy, invalid policy, unreadable record) deletes
//!    both records and emits nothing. This stage never fails.
//! 2. **Fresh compute.** Run the producer, create a policy for its value,
//!    persist value and policy, then emit `Cached { from_disk: false }`.
//!    A producer failure, a panicking policy creation function or a persist
//!    failure ends the fetch with an error.
//!
//! A fetch therefore yields at most one disk result, always followed by
//! exactly one outcome of the fresh computation.
//!
//! # Example
//!
//! ```ignore
//! let cache = DiskCache::new(store, CachePolicy::version(1));
//! let mut results = cache.fetch("user42", load_profile(42));
//!
//! while let Some(result) = results.next().await {
//!     let cached = result?;
//!     render(cached.value(), cached.is_from_disk());
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use diskcache_core::{CachePolicy, Cached, FetchError, StoreResult};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use crate::key::CacheKey;
use crate::observer::{CacheObserver, NoopObserver};
use crate::store::CacheStore;

/// One item of a fetch: a tagged result or the terminal error.
pub type CachedItem<V, P, E> = Result<Cached<V, P>, FetchError<E>>;

/// Ordered stream of the results of one fetch.
pub type CachedStream<V, P, E> = ReceiverStream<CachedItem<V, P, E>>;

/// A fetch emits at most one disk result and one fresh outcome.
const RESULT_CAPACITY: usize = 2;

/// Disk cache bound to one store and one policy.
///
/// Cloning is cheap and clones share the store, policy and observer.
pub struct DiskCache<S, V, P> {
    store: Arc<S>,
    policy: CachePolicy<V, P>,
    observer: Arc<dyn CacheObserver>,
}

impl<S, V, P> DiskCache<S, V, P>
where
    S: CacheStore + 'static,
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
    P: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Create a cache over `store` using `policy`. Events go nowhere until an
    /// observer is attached.
    pub fn new(store: Arc<S>, policy: CachePolicy<V, P>) -> Self {
        Self {
            store,
            policy,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Attach an observer for hit, miss and invalidation events.
    pub fn with_observer(mut self, observer: Arc<dyn CacheObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Get a reference to the store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the policy functions.
    pub fn policy(&self) -> &CachePolicy<V, P> {
        &self.policy
    }

    /// Check whether a value record exists for `key`.
    pub async fn exists(&self, key: impl Into<CacheKey>) -> StoreResult<bool> {
        self.store.exists(key.into().value_key()).await
    }

    /// Run `producer` with caching under `key`.
    ///
    /// The pipeline runs on a spawned task, so this must be called from
    /// within a tokio runtime. Dropping the returned stream does not abort
    /// an in-flight computation or persist; it only prevents the producer
    /// from being started if the cache stage has not finished yet.
    pub fn fetch<F, E>(&self, key: impl Into<CacheKey>, producer: F) -> CachedStream<V, P, E>
    where
        F: Future<Output = Result<V, E>> + Send + 'static,
        E: Send + 'static,
    {
        let (tx, rx) = mpsc::channel(RESULT_CAPACITY);
        let cache = self.clone();
        let key = key.into();

        tokio::spawn(async move {
            cache.run(key, producer, tx).await;
        });

        ReceiverStream::new(rx)
    }

    /// Run `producer` with caching and collect every result in order.
    pub async fn fetch_all<F, E>(
        &self,
        key: impl Into<CacheKey>,
        producer: F,
    ) -> Vec<CachedItem<V, P, E>>
    where
        F: Future<Output = Result<V, E>> + Send + 'static,
        E: Send + 'static,
    {
        self.fetch(key, producer).collect().await
    }

    async fn run<F, E>(&self, key: CacheKey, producer: F, tx: mpsc::Sender<CachedItem<V, P, E>>)
    where
        F: Future<Output = Result<V, E>> + Send + 'static,
        E: Send + 'static,
    {
        if let Some(cached) = self.request_cached(&key).await {
            // A closed receiver is checked below.
            let _ = tx.send(Ok(cached)).await;
        }

        if tx.is_closed() {
            tracing::debug!(key = %key, "Receiver dropped before fresh compute, skipping producer");
            return;
        }

        let fresh = self.request_fresh(&key, producer).await;
        if tx.send(fresh).await.is_err() {
            tracing::debug!(key = %key, "Receiver dropped, fresh result discarded");
        }
    }

    /// Try to serve `key` from the store.
    ///
    /// Returns `None` on a miss, after deleting whatever was stored for the
    /// key. Store errors are reported to the observer and never returned.
    pub async fn request_cached(&self, key: &CacheKey) -> Option<Cached<V, P>> {
        let policy = match self.store.read::<P>(key.policy_key()).await {
            Ok(policy) => policy,
            Err(e) => {
                if !e.is_not_found() {
                    self.observer.on_cache_miss(key.logical(), &e);
                }
                self.invalidate(key).await;
                return None;
            }
        };

        if !self.policy.is_valid(&policy) {
            self.invalidate(key).await;
            return None;
        }

        match self.store.read::<V>(key.value_key()).await {
            Ok(value) => {
                self.observer.on_cache_hit(key.logical());
                Some(Cached::from_disk(value, policy))
            }
            Err(e) => {
                // Valid policy without a readable value: a torn or corrupt
                // pair. Dropping both records lets the next fetch start clean.
                self.observer.on_cache_miss(key.logical(), &e);
                self.invalidate(key).await;
                None
            }
        }
    }

    /// Run the producer and persist its result under `key`.
    pub async fn request_fresh<F, E>(&self, key: &CacheKey, producer: F) -> CachedItem<V, P, E>
    where
        F: Future<Output = Result<V, E>>,
    {
        let value = producer.await.map_err(FetchError::Producer)?;
        let policy = self.policy.try_create(&value).map_err(|reason| {
            tracing::warn!(key = %key, reason = %reason, "Policy creation panicked, not persisting");
            FetchError::Policy { reason }
        })?;

        self.store
            .write_pair(key.value_key(), &value, key.policy_key(), &policy)
            .await
            .map_err(FetchError::Persist)?;

        Ok(Cached::fresh(value, policy))
    }

    async fn invalidate(&self, key: &CacheKey) {
        match self
            .store
            .delete_pair(key.value_key(), key.policy_key())
            .await
        {
            Ok(()) => self.observer.on_cache_invalid(key.logical()),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to delete invalid cache entry");
            }
        }
    }
}

impl<S, V, P> Clone for DiskCache<S, V, P> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            policy: self.policy.clone(),
            observer: Arc::clone(&self.observer),
        }
    }
}

/// Run `producer` with caching under `key` in `store`.
///
/// Shorthand for building a one-off [`DiskCache`] with the given creation and
/// validation functions and calling [`DiskCache::fetch`].
pub fn run_cached<S, V, P, E, F, C, I>(
    store: Arc<S>,
    key: impl Into<CacheKey>,
    producer: F,
    create: C,
    is_valid: I,
) -> CachedStream<V, P, E>
where
    S: CacheStore + 'static,
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
    P: Serialize + DeserializeOwned + Send + Sync + 'static,
    E: Send + 'static,
    F: Future<Output = Result<V, E>> + Send + 'static,
    C: Fn(&V) -> P + Send + Sync + 'static,
    I: Fn(&P) -> bool + Send + Sync + 'static,
{
    DiskCache::new(store, CachePolicy::new(create, is_valid)).fetch(key, producer)
}
