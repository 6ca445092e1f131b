//! diskcache Test Utilities
//!
//! Shared test infrastructure for the diskcache workspace:
//! - A fault-injecting store wrapper
//! - Proptest generators
//! - Test fixtures for common scenarios
//! - Custom assertions for pipeline results
//! - Tracing bootstrap for tests

// Re-export core types for convenience
pub use diskcache_core::{
    CachePolicy, Cached, FetchError, StoreError, StoreResult, TimeAndVersionPolicy, TimePolicy,
    VersionPolicy,
};
pub use diskcache_storage::{CacheKey, CacheStore, InMemoryStore};

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

// ============================================================================
// FAULT INJECTION
// ============================================================================

/// Store operation that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Read,
    Write,
    Delete,
    Exists,
    Clear,
}

/// Store wrapper that fails chosen operations on chosen keys.
///
/// Injected failures are `StoreError::Io`. Paired operations use the
/// concurrent defaults of [`CacheStore`], so one half of a pair can fail
/// while the other succeeds.
#[derive(Debug)]
pub struct FlakyStore<S> {
    inner: S,
    failures: Mutex<HashSet<(StoreOp, String)>>,
}

impl<S: CacheStore> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            failures: Mutex::new(HashSet::new()),
        }
    }

    /// Make `op` on `key` fail. `Clear` ignores the key.
    pub fn failing(self, op: StoreOp, key: impl Into<String>) -> Self {
        self.fail_on(op, key);
        self
    }

    /// Make `op` on `key` fail from now on.
    pub fn fail_on(&self, op: StoreOp, key: impl Into<String>) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert((op, normalize(op, key.into())));
        }
    }

    /// Stop injecting failures.
    pub fn heal(&self) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.clear();
        }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn check(&self, op: StoreOp, key: &str) -> StoreResult<()> {
        let failures = self.failures.lock().map_err(|_| StoreError::LockPoisoned)?;
        if failures.contains(&(op, normalize(op, key.to_string()))) {
            return Err(StoreError::io(key, format!("injected {:?} failure", op)));
        }
        Ok(())
    }
}

fn normalize(op: StoreOp, key: String) -> String {
    match op {
        StoreOp::Clear => String::new(),
        _ => key,
    }
}

#[async_trait]
impl<S: CacheStore> CacheStore for FlakyStore<S> {
    async fn read<T>(&self, key: &str) -> StoreResult<T>
    where
        T: DeserializeOwned + Send,
    {
        self.check(StoreOp::Read, key)?;
        self.inner.read(key).await
    }

    async fn write<T>(&self, key: &str, value: &T) -> StoreResult<()>
    where
        T: Serialize + Sync,
    {
        self.check(StoreOp::Write, key)?;
        self.inner.write(key, value).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.check(StoreOp::Delete, key)?;
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        self.check(StoreOp::Exists, key)?;
        self.inner.exists(key).await
    }

    async fn clear(&self) -> StoreResult<u64> {
        self.check(StoreOp::Clear, "")?;
        self.inner.clear().await
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

/// Small serializable value used across tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
}

pub mod fixtures {
    //! Pre-built values for common scenarios.

    use super::*;

    /// Create a profile with the given name.
    pub fn user_profile(name: impl Into<String>) -> Profile {
        Profile { name: name.into() }
    }

    /// The profile stored under `user42` in most scenarios.
    pub fn alice() -> Profile {
        user_profile("Alice")
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for keys, policies and values.

    use super::*;
    use proptest::prelude::*;

    /// Generate a logical cache key.
    pub fn arb_cache_key() -> impl Strategy<Value = CacheKey> {
        "[a-z][a-z0-9_]{0,23}".prop_map(CacheKey::new)
    }

    /// Generate a VersionPolicy.
    pub fn arb_version_policy() -> impl Strategy<Value = VersionPolicy> {
        any::<u32>().prop_map(VersionPolicy::new)
    }

    /// Generate a Profile.
    pub fn arb_profile() -> impl Strategy<Value = Profile> {
        "[A-Za-z ]{0,32}".prop_map(|name| Profile { name })
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over pipeline results.

    use super::*;
    use std::fmt::Debug;

    type Item<V, P, E> = Result<Cached<V, P>, FetchError<E>>;

    /// Assert that a result is a value served from disk.
    #[track_caller]
    pub fn assert_from_disk<V: Debug, P: Debug, E: Debug>(item: &Item<V, P, E>) {
        match item {
            Ok(cached) if cached.is_from_disk() => {}
            other => panic!("Expected disk result, got: {:?}", other),
        }
    }

    /// Assert that a result is a freshly computed value.
    #[track_caller]
    pub fn assert_fresh<V: Debug, P: Debug, E: Debug>(item: &Item<V, P, E>) {
        match item {
            Ok(cached) if cached.is_fresh() => {}
            other => panic!("Expected fresh result, got: {:?}", other),
        }
    }

    /// Assert that a result is the given producer error.
    #[track_caller]
    pub fn assert_producer_error<V: Debug, P: Debug, E: Debug + PartialEq>(
        item: &Item<V, P, E>,
        expected: &E,
    ) {
        match item {
            Err(FetchError::Producer(e)) => assert_eq!(e, expected, "Wrong producer error"),
            other => panic!("Expected producer error {:?}, got: {:?}", expected, other),
        }
    }

    /// Assert that a result is a persist failure.
    #[track_caller]
    pub fn assert_persist_error<V: Debug, P: Debug, E: Debug>(item: &Item<V, P, E>) {
        match item {
            Err(FetchError::Persist(_)) => {}
            other => panic!("Expected persist error, got: {:?}", other),
        }
    }
}

// ============================================================================
// TRACING
// ============================================================================

/// Install a test-friendly tracing subscriber.
///
/// Honors `RUST_LOG` and defaults to `warn`. Safe to call from every test.
pub fn init_test_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_flaky_store_fails_only_chosen_key() {
        let store = FlakyStore::new(InMemoryStore::new()).failing(StoreOp::Write, "k_policy");

        assert!(store.write("k", &1u32).await.is_ok());
        let err = store.write("k_policy", &1u32).await.unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));

        store.heal();
        assert!(store.write("k_policy", &1u32).await.is_ok());
    }

    #[tokio::test]
    async fn test_flaky_store_torn_write_pair() {
        let store = FlakyStore::new(InMemoryStore::new()).failing(StoreOp::Write, "k_policy");

        let result = store.write_pair("k", &1u32, "k_policy", &2u32).await;

        assert!(result.is_err());
        assert!(store.inner().exists("k").await.unwrap());
        assert!(!store.inner().exists("k_policy").await.unwrap());
    }

    #[test]
    fn test_fixtures() {
        assert_eq!(fixtures::alice().name, "Alice");
    }
}
