//! Cache validation policies.
//!
//! A policy is opaque metadata persisted next to a cached value. It is
//! produced once per fresh computation and checked once per cache read.
//! [`CachePolicy`] bundles the two functions; the stock policy types in this
//! module cover the common cases of age and schema version.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

type CreateFn<V, P> = dyn Fn(&V) -> P + Send + Sync;
type ValidateFn<P> = dyn Fn(&P) -> bool + Send + Sync;

/// Creation and validation functions for a policy type `P` over values `V`.
///
/// Cloning is cheap: both functions are reference counted.
pub struct CachePolicy<V, P> {
    create: Arc<CreateFn<V, P>>,
    validate: Arc<ValidateFn<P>>,
}

impl<V, P> CachePolicy<V, P> {
    /// Bundle a creation function and a validation predicate.
    pub fn new<C, F>(create: C, validate: F) -> Self
    where
        C: Fn(&V) -> P + Send + Sync + 'static,
        F: Fn(&P) -> bool + Send + Sync + 'static,
    {
        Self {
            create: Arc::new(create),
            validate: Arc::new(validate),
        }
    }

    /// A policy whose stored entries are always trusted.
    pub fn always_valid<C>(create: C) -> Self
    where
        C: Fn(&V) -> P + Send + Sync + 'static,
    {
        Self::new(create, |_| true)
    }

    /// A policy whose stored entries are never trusted.
    pub fn never_valid<C>(create: C) -> Self
    where
        C: Fn(&V) -> P + Send + Sync + 'static,
    {
        Self::new(create, |_| false)
    }

    /// Create the policy for a freshly computed value.
    pub fn create(&self, value: &V) -> P {
        (self.create)(value)
    }

    /// Create the policy for a freshly computed value, catching a panic in
    /// the creation function and returning its message.
    pub fn try_create(&self, value: &V) -> Result<P, String> {
        panic::catch_unwind(AssertUnwindSafe(|| (self.create)(value))).map_err(panic_message)
    }

    /// Validate a stored policy.
    ///
    /// A panicking predicate counts as a failed validation.
    pub fn is_valid(&self, policy: &P) -> bool {
        panic::catch_unwind(AssertUnwindSafe(|| (self.validate)(policy))).unwrap_or(false)
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "policy function panicked".to_string()
    }
}

impl<V: 'static> CachePolicy<V, TimePolicy> {
    /// Entries expire `max_age` after they were written.
    pub fn time(max_age: Duration) -> Self {
        Self::new(TimePolicy::create::<V>(), TimePolicy::validate(max_age))
    }
}

impl<V: 'static> CachePolicy<V, VersionPolicy> {
    /// Entries are valid only for the exact `version` they were written with.
    pub fn version(version: u32) -> Self {
        Self::new(VersionPolicy::create::<V>(version), VersionPolicy::validate(version))
    }
}

impl<V: 'static> CachePolicy<V, TimeAndVersionPolicy> {
    /// Entries expire after `max_age` or when written by a newer version.
    pub fn time_and_version(max_age: Duration, version: u32) -> Self {
        Self::new(
            TimeAndVersionPolicy::create::<V>(version),
            TimeAndVersionPolicy::validate(max_age, version),
        )
    }
}

impl<V, P> Clone for CachePolicy<V, P> {
    fn clone(&self) -> Self {
        Self {
            create: Arc::clone(&self.create),
            validate: Arc::clone(&self.validate),
        }
    }
}

impl<V, P> fmt::Debug for CachePolicy<V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachePolicy").finish_non_exhaustive()
    }
}

/// True if `timestamp` is less than `max_age` old at `now`.
///
/// Timestamps in the future count as zero age.
fn younger_than(timestamp: DateTime<Utc>, now: DateTime<Utc>, max_age: Duration) -> bool {
    let age = now
        .signed_duration_since(timestamp)
        .to_std()
        .unwrap_or(Duration::ZERO);
    age < max_age
}

// ============================================================================
// STOCK POLICIES
// ============================================================================

/// Age-based policy: stores the time the value was computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimePolicy {
    pub timestamp: DateTime<Utc>,
}

impl TimePolicy {
    /// Stamp the current time.
    pub fn now() -> Self {
        Self {
            timestamp: Utc::now(),
        }
    }

    /// Stamp a fixed time.
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self { timestamp }
    }

    /// Creation function stamping the time of each fresh computation.
    pub fn create<V: 'static>() -> impl Fn(&V) -> Self + Send + Sync + 'static {
        |_| Self::now()
    }

    /// Creation function stamping a fixed time.
    pub fn create_at<V: 'static>(
        timestamp: DateTime<Utc>,
    ) -> impl Fn(&V) -> Self + Send + Sync + 'static {
        move |_| Self::at(timestamp)
    }

    /// Predicate accepting entries younger than `max_age`.
    pub fn validate(max_age: Duration) -> impl Fn(&Self) -> bool + Send + Sync + 'static {
        move |policy| policy.is_valid_at(Utc::now(), max_age)
    }

    /// Check the policy against an explicit clock reading.
    pub fn is_valid_at(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        younger_than(self.timestamp, now, max_age)
    }
}

/// Version-based policy: stores the schema version of the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionPolicy {
    pub version: u32,
}

impl VersionPolicy {
    pub fn new(version: u32) -> Self {
        Self { version }
    }

    /// Creation function tagging each value with `version`.
    pub fn create<V: 'static>(version: u32) -> impl Fn(&V) -> Self + Send + Sync + 'static {
        move |_| Self::new(version)
    }

    /// Predicate accepting only entries written with exactly `current`.
    pub fn validate(current: u32) -> impl Fn(&Self) -> bool + Send + Sync + 'static {
        move |policy| policy.version == current
    }
}

/// Combined policy: an entry must be young enough and not from a newer version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeAndVersionPolicy {
    pub timestamp: DateTime<Utc>,
    pub version: u32,
}

impl TimeAndVersionPolicy {
    /// Stamp the current time and `version`.
    pub fn new(version: u32) -> Self {
        Self {
            timestamp: Utc::now(),
            version,
        }
    }

    /// Stamp a fixed time and `version`.
    pub fn at(timestamp: DateTime<Utc>, version: u32) -> Self {
        Self { timestamp, version }
    }

    pub fn create<V: 'static>(version: u32) -> impl Fn(&V) -> Self + Send + Sync + 'static {
        move |_| Self::new(version)
    }

    pub fn create_at<V: 'static>(
        timestamp: DateTime<Utc>,
        version: u32,
    ) -> impl Fn(&V) -> Self + Send + Sync + 'static {
        move |_| Self::at(timestamp, version)
    }

    /// Predicate accepting entries younger than `max_age` whose version is
    /// at most `current`.
    pub fn validate(
        max_age: Duration,
        current: u32,
    ) -> impl Fn(&Self) -> bool + Send + Sync + 'static {
        move |policy| policy.is_valid_at(Utc::now(), max_age, current)
    }

    /// Check the policy against an explicit clock reading.
    pub fn is_valid_at(&self, now: DateTime<Utc>, max_age: Duration, current: u32) -> bool {
        younger_than(self.timestamp, now, max_age) && self.version <= current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_try_create_catches_panic() {
        let policy: CachePolicy<String, u32> =
            CachePolicy::new(|_: &String| -> u32 { panic!("create bug") }, |_| true);

        let err = policy.try_create(&"v".to_string()).unwrap_err();
        assert!(err.contains("create bug"));
    }

    #[test]
    fn test_try_create_passes_value_through() {
        let policy: CachePolicy<String, usize> = CachePolicy::always_valid(|v: &String| v.len());
        assert_eq!(policy.try_create(&"abc".to_string()), Ok(3));
    }

    #[test]
    fn test_cache_policy_create_sees_value() {
        let policy: CachePolicy<String, usize> = CachePolicy::new(|v: &String| v.len(), |p| *p > 3);

        assert_eq!(policy.create(&"alice".to_string()), 5);
        assert!(policy.is_valid(&5));
        assert!(!policy.is_valid(&2));
    }

    #[test]
    fn test_cache_policy_panic_is_invalid() {
        let policy: CachePolicy<u8, u8> = CachePolicy::new(|v| *v, |_| panic!("bad policy"));
        assert!(!policy.is_valid(&1));
    }

    #[test]
    fn test_always_and_never_valid() {
        let always: CachePolicy<u8, ()> = CachePolicy::always_valid(|_| ());
        let never: CachePolicy<u8, ()> = CachePolicy::never_valid(|_| ());

        assert!(always.is_valid(&()));
        assert!(!never.is_valid(&()));
    }

    #[test]
    fn test_time_policy_expires() {
        let now = Utc::now();
        let policy = TimePolicy::at(now - chrono::Duration::seconds(30));

        assert!(policy.is_valid_at(now, Duration::from_secs(60)));
        assert!(!policy.is_valid_at(now, Duration::from_secs(30)));
        assert!(!policy.is_valid_at(now, Duration::from_secs(10)));
    }

    #[test]
    fn test_time_policy_future_timestamp_is_fresh() {
        let now = Utc::now();
        let policy = TimePolicy::at(now + chrono::Duration::seconds(30));
        assert!(policy.is_valid_at(now, Duration::from_secs(1)));
    }

    #[test]
    fn test_time_policy_cache_policy() {
        let policy: CachePolicy<String, TimePolicy> = CachePolicy::time(Duration::from_secs(60));
        let created = policy.create(&"value".to_string());

        assert!(policy.is_valid(&created));
        assert!(!policy.is_valid(&TimePolicy::at(Utc::now() - chrono::Duration::hours(1))));
    }

    #[test]
    fn test_version_policy() {
        let policy: CachePolicy<(), VersionPolicy> = CachePolicy::version(2);

        assert_eq!(policy.create(&()), VersionPolicy::new(2));
        assert!(policy.is_valid(&VersionPolicy::new(2)));
        assert!(!policy.is_valid(&VersionPolicy::new(1)));
        assert!(!policy.is_valid(&VersionPolicy::new(3)));
    }

    #[test]
    fn test_time_and_version_policy() {
        let now = Utc::now();
        let recent = now - chrono::Duration::seconds(5);
        let max_age = Duration::from_secs(60);

        assert!(TimeAndVersionPolicy::at(recent, 1).is_valid_at(now, max_age, 2));
        assert!(TimeAndVersionPolicy::at(recent, 2).is_valid_at(now, max_age, 2));
        assert!(!TimeAndVersionPolicy::at(recent, 3).is_valid_at(now, max_age, 2));

        let old = now - chrono::Duration::seconds(120);
        assert!(!TimeAndVersionPolicy::at(old, 1).is_valid_at(now, max_age, 2));
    }

    #[test]
    fn test_create_at_is_fixed() {
        let ts = Utc::now() - chrono::Duration::days(1);
        let create = TimeAndVersionPolicy::create_at::<u8>(ts, 7);
        assert_eq!(create(&0), TimeAndVersionPolicy::at(ts, 7));

        let create = TimePolicy::create_at::<u8>(ts);
        assert_eq!(create(&0).timestamp, ts);
    }

    proptest! {
        #[test]
        fn prop_version_policy_accepts_only_equal(stored in any::<u32>(), current in any::<u32>()) {
            let validate = VersionPolicy::validate(current);
            prop_assert_eq!(validate(&VersionPolicy::new(stored)), stored == current);
        }

        #[test]
        fn prop_time_policy_monotonic(age_secs in 0i64..10_000, max_secs in 1u64..10_000) {
            let now = Utc::now();
            let policy = TimePolicy::at(now - chrono::Duration::seconds(age_secs));
            let valid = policy.is_valid_at(now, Duration::from_secs(max_secs));
            prop_assert_eq!(valid, (age_secs as u64) < max_secs);
        }
    }
}
