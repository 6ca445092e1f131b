//! diskcache Storage - Stores and the Caching Pipeline
//!
//! Wraps a one-shot async producer so that a previously persisted result is
//! emitted first, when it is still valid, followed by the freshly computed
//! one, which is persisted for the next call.
//!
//! - [`CacheStore`] adapters: [`InMemoryStore`] and [`LmdbStore`]
//! - [`DiskCache`] and [`run_cached`]: the pipeline itself
//! - [`CacheObserver`]: side-channel hit/miss/invalidation events

pub mod key;
pub mod observer;
pub mod pipeline;
pub mod stats;
pub mod store;

pub use key::{CacheKey, POLICY_SUFFIX};
pub use observer::{CacheObserver, CountingObserver, NoopObserver, TracingObserver};
pub use pipeline::{run_cached, CachedItem, CachedStream, DiskCache};
pub use stats::CacheStats;
pub use store::{CacheStore, InMemoryStore, LmdbStore, LmdbStoreError};

// Re-export core types so hosts need a single dependency.
pub use diskcache_core::{
    CachePolicy, Cached, DiskCacheError, DiskCacheResult, FetchError, StoreConfig, StoreError,
    StoreResult, TimeAndVersionPolicy, TimePolicy, VersionPolicy,
};
